//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Failed to read the configuration file.
    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The merged configuration did not deserialize.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A key in the `guilds` table is not a decimal snowflake.
    #[error("guild table key '{0}' is not a snowflake")]
    InvalidGuildKey(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
