//! Error types for Ember

use thiserror::Error;

/// The main error type for Ember operations
#[derive(Debug, Error)]
pub enum EmberError {
    #[error("Invalid range for {attribute}: min {min} is greater than max {max}")]
    InvalidRange {
        attribute: String,
        min: f32,
        max: f32,
    },

    #[error("Non-finite value for {field}: {value}")]
    NonFiniteValue { field: String, value: f32 },

    #[error("Invalid capacity: max_particles must not be negative, got {0}")]
    InvalidCapacity(i64),

    #[error("Invalid emission interval: minimum must be greater than zero, got {0}")]
    InvalidInterval(f32),

    #[error("Invalid delta: delta must be >= 0, got {0}")]
    InvalidDelta(f32),

    #[error("Invalid field type for {field}: expected {expected}")]
    InvalidFieldType { field: String, expected: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Draw error: {0}")]
    DrawError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for Ember operations
pub type Result<T> = std::result::Result<T, EmberError>;

impl EmberError {
    /// True for errors raised while validating emitter configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EmberError::InvalidRange { .. }
                | EmberError::NonFiniteValue { .. }
                | EmberError::InvalidCapacity(_)
                | EmberError::InvalidInterval(_)
                | EmberError::InvalidFieldType { .. }
        )
    }
}

impl From<toml::de::Error> for EmberError {
    fn from(err: toml::de::Error) -> Self {
        EmberError::TomlParseError(err.to_string())
    }
}
