//! Per-persona plasticity configuration with fallback to the default persona.

use crate::error::{StoreError, StoreResult};
use crate::fsio::{read_json, write_json_atomic};
use crate::storage::validate_persona_name;
use doxa_core::{PlasticityConfig, PlasticityDocument, DEFAULT_PERSONA};
use std::path::{Path, PathBuf};

pub const PLASTICITY_FILE: &str = "plasticity_config.json";

#[derive(Debug, Clone)]
pub struct PlasticityConfigStore {
    root: PathBuf,
}

impl PlasticityConfigStore {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self, persona: &str) -> StoreResult<PathBuf> {
        validate_persona_name(persona)?;
        Ok(self.root.join(persona).join(PLASTICITY_FILE))
    }

    fn read(path: &Path) -> StoreResult<Option<PlasticityDocument>> {
        let Some(document) = read_json::<PlasticityDocument>(path)? else {
            return Ok(None);
        };
        document
            .config()
            .validate()
            .map_err(|source| StoreError::InvalidState {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Some(document))
    }

    /// Load the persona's document. A persona without its own file gets a
    /// copy of the default persona's document, which is persisted for it.
    /// If the default document cannot be read this fails with
    /// [`StoreError::MissingDefaultConfig`].
    pub fn load(&self, persona: &str) -> StoreResult<PlasticityDocument> {
        let path = self.path(persona)?;
        if let Some(document) = Self::read(&path)? {
            return Ok(document);
        }

        let default_path = self.path(DEFAULT_PERSONA)?;
        let fallback = match Self::read(&default_path) {
            Ok(Some(document)) => document,
            Ok(None) => {
                return Err(StoreError::MissingDefaultConfig {
                    path: default_path,
                    reason: "file not found".to_string(),
                })
            }
            Err(e) => {
                return Err(StoreError::MissingDefaultConfig {
                    path: default_path,
                    reason: e.to_string(),
                })
            }
        };

        if persona != DEFAULT_PERSONA {
            tracing::warn!(
                "No plasticity config for '{}', copying the default persona's config",
                persona
            );
            write_json_atomic(&path, &fallback)?;
        }
        Ok(fallback)
    }

    pub fn load_config(&self, persona: &str) -> StoreResult<PlasticityConfig> {
        Ok(self.load(persona)?.config())
    }

    pub fn save(&self, persona: &str, document: &PlasticityDocument) -> StoreResult<()> {
        let path = self.path(persona)?;
        document
            .config()
            .validate()
            .map_err(|source| StoreError::InvalidState {
                path: path.clone(),
                source,
            })?;
        write_json_atomic(&path, document)?;
        tracing::info!("Saved plasticity config for '{}'", persona);
        Ok(())
    }

    /// Write the built-in document for the default persona if it has none.
    /// Returns true if a file was created.
    pub fn ensure_default(&self) -> StoreResult<bool> {
        let path = self.path(DEFAULT_PERSONA)?;
        if path.is_file() {
            return Ok(false);
        }
        write_json_atomic(&path, &PlasticityDocument::default())?;
        tracing::info!("Created default plasticity config at {}", path.display());
        Ok(true)
    }

    /// Overwrite youth, maturity and decay with the named preset and persist.
    pub fn apply_preset(&self, persona: &str, preset: &str) -> StoreResult<PlasticityConfig> {
        let mut document = self.load(persona)?;
        if !document.apply_preset(preset) {
            return Err(StoreError::UnknownPreset(preset.to_string()));
        }
        self.save(persona, &document)?;
        tracing::info!("Applied plasticity preset '{}' to '{}'", preset, persona);
        Ok(document.config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> PlasticityConfigStore {
        PlasticityConfigStore::new(dir.path().to_path_buf())
    }

    #[test]
    fn test_missing_default_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        assert!(matches!(
            store.load("alice"),
            Err(StoreError::MissingDefaultConfig { .. })
        ));
        assert!(matches!(
            store.load(DEFAULT_PERSONA),
            Err(StoreError::MissingDefaultConfig { .. })
        ));
        assert!(!store.path("alice").unwrap().exists());
    }

    #[test]
    fn test_fallback_copies_default_for_persona() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.ensure_default().unwrap());
        assert!(!store.ensure_default().unwrap());

        let mut custom = PlasticityDocument::default();
        custom.plasticity_model.parameters.decay_rate.value = 0.02;
        store.save(DEFAULT_PERSONA, &custom).unwrap();

        let loaded = store.load("alice").unwrap();
        assert_eq!(loaded.config().decay_rate, 0.02);
        assert!(store.path("alice").unwrap().is_file());

        // Later changes to the default no longer affect alice
        store.save(DEFAULT_PERSONA, &PlasticityDocument::default()).unwrap();
        assert_eq!(store.load_config("alice").unwrap().decay_rate, 0.02);
    }

    #[test]
    fn test_malformed_default_is_reported_as_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.path(DEFAULT_PERSONA).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            store.load("alice"),
            Err(StoreError::MissingDefaultConfig { .. })
        ));
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        let mut doc = PlasticityDocument::default();
        doc.plasticity_model.parameters.decay_rate.value = -1.0;
        assert!(matches!(
            store.save("alice", &doc),
            Err(StoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_apply_preset() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store(&dir);
        store.ensure_default().unwrap();

        let cfg = store.apply_preset("alice", "flexible").unwrap();
        assert_eq!(cfg.youth_period_days, 90);
        assert_eq!(cfg.maturity_point_days, 730);
        assert_eq!(store.load_config("alice").unwrap(), cfg);
        // Default persona untouched
        assert_eq!(store.load_config(DEFAULT_PERSONA).unwrap(), PlasticityConfig::default());

        assert!(matches!(
            store.apply_preset("alice", "nope"),
            Err(StoreError::UnknownPreset(_))
        ));
    }
}
