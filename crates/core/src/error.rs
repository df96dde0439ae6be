//! Core error types

use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML for the schema
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration parsed but is semantically invalid
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
