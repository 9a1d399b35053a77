pub mod bias;
pub mod config;
pub mod creed;
pub mod diff;
pub mod error;
pub mod experience;
pub mod plasticity;
pub mod stance;
pub mod state;

pub use config::DoxaConfig;
pub use creed::{CreedProposal, CreedRejection, CreedTransition};
pub use diff::StateDiff;
pub use error::StateError;
pub use experience::{HookDetection, HookHits};
pub use plasticity::{PlasticityConfig, PlasticityDocument, PlasticityReading};
pub use stance::StanceDelta;
pub use state::{Bias, Hooks, PersonaState, Stance};

/// Name of the persona every other persona falls back to.
pub const DEFAULT_PERSONA: &str = "default";
