pub mod error;
mod fsio;
pub mod generations;
pub mod locks;
pub mod plasticity_store;
pub mod registry;
pub mod storage;

pub use error::{StoreError, StoreResult};
pub use generations::{ArchiveEntry, Generation, GenerationStatus, GenerationStore, Slot, SlotInfo};
pub use locks::PersonaLocks;
pub use plasticity_store::PlasticityConfigStore;
pub use registry::PersonaRegistry;
pub use storage::{validate_persona_name, Storage};
