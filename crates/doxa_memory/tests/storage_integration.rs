//! Integration tests for the storage facade
//!
//! Uses tempfile::TempDir for isolated data directories.

use doxa_core::{PersonaState, DEFAULT_PERSONA};
use doxa_memory::{Slot, Storage, StoreError};
use std::sync::Arc;

fn state(age: u32, creed: &str) -> PersonaState {
    PersonaState {
        age_in_days: age,
        creed: creed.to_string(),
        ..PersonaState::default()
    }
}

#[test]
fn test_rotation_scenario_through_storage() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = Storage::new(dir.path());
    let store = storage.generations("alice").unwrap();

    let s: Vec<PersonaState> = (1..=4).map(|i| state(i, &format!("S{i}"))).collect();
    for snapshot in &s[..3] {
        store.save(snapshot).unwrap();
    }
    assert_eq!(store.slot(Slot::Current).unwrap().unwrap().state, s[2]);
    assert_eq!(store.slot(Slot::Previous).unwrap().unwrap().state, s[1]);
    assert_eq!(store.slot(Slot::Backup).unwrap().unwrap().state, s[0]);
    assert!(store.archive_entries().unwrap().is_empty());

    store.save(&s[3]).unwrap();
    let archive = store.archive_entries().unwrap();
    assert_eq!(archive.len(), 1);
    assert_eq!(store.read_archive(&archive[0]).unwrap().state, s[0]);
    assert_eq!(store.slot(Slot::Backup).unwrap().unwrap().state, s[1]);
    assert_eq!(store.slot(Slot::Previous).unwrap().unwrap().state, s[2]);
    assert_eq!(store.slot(Slot::Current).unwrap().unwrap().state, s[3]);

    assert!(store.rollback(1).unwrap());
    assert_eq!(store.load_current().unwrap(), Some(s[2].clone()));
    assert!(!store.rollback(3).unwrap());
    assert_eq!(store.load_current().unwrap(), Some(s[2].clone()));
}

#[test]
fn test_personas_are_isolated() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = Storage::new(dir.path());
    storage.generations("alice").unwrap().save(&state(5, "alice")).unwrap();
    storage.generations("bob").unwrap().save(&state(7, "bob")).unwrap();

    let alice = storage.generations("alice").unwrap().load_or_default().unwrap();
    let bob = storage.generations("bob").unwrap().load_or_default().unwrap();
    assert_eq!(alice.creed, "alice");
    assert_eq!(bob.creed, "bob");

    storage.registry().delete("bob").unwrap();
    assert_eq!(storage.registry().list().unwrap(), vec!["alice"]);
    assert_eq!(
        storage.generations("alice").unwrap().load_current().unwrap().map(|s| s.age_in_days),
        Some(5)
    );
}

#[test]
fn test_default_persona_cannot_be_deleted() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = Storage::new(dir.path());
    storage.registry().ensure_default().unwrap();
    storage.plasticity().ensure_default().unwrap();
    storage
        .generations(DEFAULT_PERSONA)
        .unwrap()
        .save(&PersonaState::default())
        .unwrap();

    let err = storage.registry().delete(DEFAULT_PERSONA).unwrap_err();
    assert!(matches!(err, StoreError::ProtectedPersona(_)));
    assert!(err.to_string().contains("protected"));
    assert!(storage.generations(DEFAULT_PERSONA).unwrap().exists());
    assert!(storage.plasticity().path(DEFAULT_PERSONA).unwrap().is_file());
}

#[test]
fn test_invalid_persona_names_rejected_everywhere() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = Storage::new(dir.path());
    assert!(matches!(storage.generations(".."), Err(StoreError::InvalidPersonaName(_))));
    assert!(matches!(
        storage.plasticity().load("a/b"),
        Err(StoreError::InvalidPersonaName(_))
    ));
    assert!(matches!(
        storage.registry().delete("archive"),
        Err(StoreError::InvalidPersonaName(_))
    ));
}

/// Saves from many tasks, serialized by the persona lock, never lose a
/// generation or corrupt the manifest.
#[tokio::test]
async fn test_locked_concurrent_saves() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = Arc::new(Storage::new(dir.path()));

    let mut handles = Vec::new();
    for i in 0..8u32 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let _guard = storage.locks().acquire("alice").await;
            let store = storage.generations("alice").unwrap();
            let mut current = store.load_or_default().unwrap();
            current.age_in_days += 1;
            current.hooks.add_trigger(&format!("k{i}"));
            store.save(&current).unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let store = storage.generations("alice").unwrap();
    let current = store.load_current().unwrap().unwrap();
    assert_eq!(current.age_in_days, 8);
    assert_eq!(current.hooks.triggers.len(), 3 + 8);
    assert_eq!(store.status().unwrap().revision, 8);
    assert_eq!(store.archive_entries().unwrap().len(), 5);
}
