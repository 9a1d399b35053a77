use doxa_core::StateError;
use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid persisted data in {}: {source}", path.display())]
    InvalidState {
        path: PathBuf,
        #[source]
        source: StateError,
    },

    #[error("invalid persona name {0:?}")]
    InvalidPersonaName(String),

    #[error("persona {0:?} is protected and cannot be deleted")]
    ProtectedPersona(String),

    #[error("persona {0:?} does not exist")]
    PersonaNotFound(String),

    #[error("default plasticity config unavailable at {}: {reason}", path.display())]
    MissingDefaultConfig { path: PathBuf, reason: String },

    #[error("unknown plasticity preset {0:?}")]
    UnknownPreset(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
