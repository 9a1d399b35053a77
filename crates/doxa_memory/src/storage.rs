use crate::error::{StoreError, StoreResult};
use crate::generations::GenerationStore;
use crate::locks::PersonaLocks;
use crate::plasticity_store::PlasticityConfigStore;
use crate::registry::PersonaRegistry;
use std::path::{Path, PathBuf};

/// Directory name reserved for archives; never a persona.
pub const ARCHIVE_DIR: &str = "archive";

/// Reject names that would escape or collide inside the data directory.
pub fn validate_persona_name(name: &str) -> StoreResult<()> {
    let bad = name.trim().is_empty()
        || name != name.trim()
        || name == "."
        || name == ".."
        || name == ARCHIVE_DIR
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidPersonaName(name.to_string()));
    }
    Ok(())
}

/// Root of all persisted persona data plus the shared lock registry.
/// Cheap to clone; clones share locks.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    locks: PersonaLocks,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: PersonaLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locks(&self) -> &PersonaLocks {
        &self.locks
    }

    /// `<root>/<persona>`, after name validation.
    pub fn persona_dir(&self, persona: &str) -> StoreResult<PathBuf> {
        validate_persona_name(persona)?;
        Ok(self.root.join(persona))
    }

    pub fn generations(&self, persona: &str) -> StoreResult<GenerationStore> {
        Ok(GenerationStore::new(persona, self.persona_dir(persona)?))
    }

    pub fn plasticity(&self) -> PlasticityConfigStore {
        PlasticityConfigStore::new(self.root.clone())
    }

    pub fn registry(&self) -> PersonaRegistry {
        PersonaRegistry::new(self.root.clone())
    }
}
