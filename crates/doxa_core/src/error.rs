use thiserror::Error;

/// Errors raised by the pure state components.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid plasticity config: {0}")]
    InvalidConfig(String),
}
