pub mod api_types;
pub mod engine;
pub mod llm;
pub mod llm_oracle;
pub mod oracle;
pub mod parsing;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use engine::{Answer, DocumentOutcome, PersonaEngine};
pub use llm::{CompletionParams, LlmClient};
pub use llm_oracle::LlmOracle;
pub use oracle::{CreedContext, CreedSummary, EmotionalTone, Impression, Oracle, OracleAnswer, WorldExperience};
