//! Error types for platform capability calls.

use thiserror::Error;

/// Errors that can occur when calling into the chat platform.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The connection to the platform is not established.
    #[error("not connected to the chat platform")]
    NotConnected,

    /// The platform rejected the call.
    #[error("platform rejected the call: {reason}")]
    Rejected {
        /// Reason reported by the platform.
        reason: String,
    },

    /// The platform rate-limited the call.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested backoff in milliseconds.
        retry_after_ms: u64,
    },

    /// The requested entity does not exist on the platform.
    #[error("platform entity not found: {0}")]
    NotFound(String),

    /// Transport-level failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Result type for platform capability calls.
pub type ApiResult<T> = Result<T, ApiError>;
