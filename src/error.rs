use thiserror::Error;

/// Errors raised while constructing or wiring up a sensor entity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SensorError {
    #[error("Invalid hour: {0} (must be between 0 and 23)")]
    InvalidHour(u32),
    #[error("Entity already attached: {0}")]
    AlreadyAttached(String),
}

/// Errors raised while coercing a source entity state
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Empty value")]
    Empty,
    #[error("Not a number: {0:?}")]
    NotANumber(String),
    #[error("Not a finite number: {0:?}")]
    NotFinite(String),
}
