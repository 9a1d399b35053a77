use crate::error::{StoreError, StoreResult};
use crate::generations::GenerationStore;
use crate::storage::{validate_persona_name, ARCHIVE_DIR};
use doxa_core::DEFAULT_PERSONA;
use std::fs;
use std::path::PathBuf;

/// Enumerates, creates and deletes persona namespaces under the data dir.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    root: PathBuf,
}

impl PersonaRegistry {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Persona names, sorted. The global archive directory is excluded.
    pub fn list(&self) -> StoreResult<Vec<String>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };

        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(StoreError::io(&self.root))?;
            let is_dir = entry
                .file_type()
                .map_err(StoreError::io(entry.path()))?
                .is_dir();
            if !is_dir {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name != ARCHIVE_DIR && validate_persona_name(&name).is_ok() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, persona: &str) -> bool {
        validate_persona_name(persona).is_ok() && self.root.join(persona).is_dir()
    }

    /// Remove a persona and everything it owns. The default persona is
    /// protected.
    pub fn delete(&self, persona: &str) -> StoreResult<()> {
        validate_persona_name(persona)?;
        if persona == DEFAULT_PERSONA {
            return Err(StoreError::ProtectedPersona(persona.to_string()));
        }
        let dir = self.root.join(persona);
        if !dir.is_dir() {
            return Err(StoreError::PersonaNotFound(persona.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(StoreError::io(&dir))?;
        tracing::info!("Deleted persona '{}'", persona);
        Ok(())
    }

    /// Create the default persona directory if missing.
    pub fn ensure_default(&self) -> StoreResult<()> {
        let dir = self.root.join(DEFAULT_PERSONA);
        fs::create_dir_all(&dir).map_err(StoreError::io(&dir))
    }

    /// Import pre-manifest data:
    /// - top-level `philosophy*.json` files become the default persona's
    ///   generations,
    /// - any persona directory still holding `philosophy*.json` files is
    ///   converted in place.
    ///
    /// Personas that already have a manifest are left alone. Returns the
    /// names of migrated personas.
    pub fn migrate_legacy(&self) -> StoreResult<Vec<String>> {
        let mut migrated = Vec::new();

        let default_store = GenerationStore::new(DEFAULT_PERSONA, self.root.join(DEFAULT_PERSONA));
        if default_store.import_legacy(&self.root)? {
            migrated.push(DEFAULT_PERSONA.to_string());
        }

        for name in self.list()? {
            let dir = self.root.join(&name);
            if GenerationStore::new(&name, dir.clone()).import_legacy(&dir)? {
                migrated.push(name);
            }
        }
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generations::Slot;
    use doxa_core::PersonaState;

    fn registry(dir: &tempfile::TempDir) -> PersonaRegistry {
        PersonaRegistry::new(dir.path().to_path_buf())
    }

    #[test]
    fn test_list_excludes_archive_and_files() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["zeta", "alpha", "archive", "default"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("stray.json"), "{}").unwrap();
        assert_eq!(registry(&dir).list().unwrap(), vec!["alpha", "default", "zeta"]);
    }

    #[test]
    fn test_list_missing_root_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let reg = PersonaRegistry::new(dir.path().join("nothing-here"));
        assert!(reg.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_default_is_refused() {
        let dir = tempfile::TempDir::new().unwrap();
        let reg = registry(&dir);
        reg.ensure_default().unwrap();
        assert!(matches!(
            reg.delete(DEFAULT_PERSONA),
            Err(StoreError::ProtectedPersona(_))
        ));
        assert!(reg.exists(DEFAULT_PERSONA));
    }

    #[test]
    fn test_delete_missing_and_existing() {
        let dir = tempfile::TempDir::new().unwrap();
        let reg = registry(&dir);
        assert!(matches!(reg.delete("ghost"), Err(StoreError::PersonaNotFound(_))));

        fs::create_dir_all(dir.path().join("alice").join("archive")).unwrap();
        fs::write(dir.path().join("alice").join("generations.json"), "{}").unwrap();
        reg.delete("alice").unwrap();
        assert!(!reg.exists("alice"));
        assert!(matches!(reg.delete("../x"), Err(StoreError::InvalidPersonaName(_))));
    }

    #[test]
    fn test_migrate_top_level_legacy_into_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut state = PersonaState::default();
        state.age_in_days = 12;
        fs::write(
            dir.path().join("philosophy.json"),
            serde_json::to_string(&state).unwrap(),
        )
        .unwrap();

        let reg = registry(&dir);
        assert_eq!(reg.migrate_legacy().unwrap(), vec![DEFAULT_PERSONA.to_string()]);
        assert!(!dir.path().join("philosophy.json").exists());

        let store = GenerationStore::new(DEFAULT_PERSONA, dir.path().join(DEFAULT_PERSONA));
        let current = store.slot(Slot::Current).unwrap().unwrap();
        assert_eq!(current.state.age_in_days, 12);

        // Idempotent
        assert!(reg.migrate_legacy().unwrap().is_empty());
    }

    #[test]
    fn test_migrate_skips_when_default_has_manifest() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = GenerationStore::new(DEFAULT_PERSONA, dir.path().join(DEFAULT_PERSONA));
        store.save(&PersonaState::default()).unwrap();
        fs::write(
            dir.path().join("philosophy.json"),
            serde_json::to_string(&PersonaState::default()).unwrap(),
        )
        .unwrap();

        assert!(registry(&dir).migrate_legacy().unwrap().is_empty());
        assert!(dir.path().join("philosophy.json").exists());
    }
}
