//! Runtime error types.

use thiserror::Error;

/// Errors that can occur during runtime orchestration.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A platform capability call failed during startup or teardown.
    #[error("platform error: {0}")]
    Api(#[from] ember_core::ApiError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
