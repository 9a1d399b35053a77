use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// One async mutex per persona. All work that reads, mutates and saves a
/// persona's state holds its guard for the whole sequence, so documents for
/// the same persona are processed strictly one at a time while different
/// personas proceed concurrently.
#[derive(Debug, Clone, Default)]
pub struct PersonaLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl PersonaLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, persona: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(persona.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `persona`.
    pub async fn acquire(&self, persona: &str) -> OwnedMutexGuard<()> {
        self.handle(persona).lock_owned().await
    }

    /// Non-blocking variant; `None` if the persona is busy.
    pub fn try_acquire(&self, persona: &str) -> Option<OwnedMutexGuard<()>> {
        self.handle(persona).try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_persona_is_exclusive() {
        let locks = PersonaLocks::new();
        let guard = locks.acquire("alice").await;
        assert!(locks.try_acquire("alice").is_none());
        assert!(locks.try_acquire("bob").is_some());
        drop(guard);
        assert!(locks.try_acquire("alice").is_some());
    }

    #[tokio::test]
    async fn test_clones_share_registry() {
        let locks = PersonaLocks::new();
        let other = locks.clone();
        let _guard = locks.acquire("alice").await;
        assert!(other.try_acquire("alice").is_none());
    }
}
