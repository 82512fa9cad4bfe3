//! Error types for Glowtown

use thiserror::Error;

/// The main error type for Glowtown operations
#[derive(Debug, Error)]
pub enum GlowError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Unsupported state file version: expected {expected}, got {got}")]
    UnsupportedVersion { expected: u32, got: u32 },

    #[error("Value out of range: {field} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("Asset error: {0}")]
    AssetError(String),

    #[error("Import error: {0}")]
    ImportError(String),
}

/// Result type alias for Glowtown operations
pub type Result<T> = std::result::Result<T, GlowError>;

impl From<toml::de::Error> for GlowError {
    fn from(err: toml::de::Error) -> Self {
        GlowError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for GlowError {
    fn from(err: toml::ser::Error) -> Self {
        GlowError::TomlSerError(err.to_string())
    }
}
