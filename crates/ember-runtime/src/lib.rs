//! Ember Runtime - Orchestration layer for the Ember chat agent.
//!
//! This crate provides:
//! - Runtime orchestration (`EmberRuntime`): the event loop, ordered
//!   shutdown, and storage flushing
//! - Configuration loading (`ConfigLoader`, `EmberConfig`)
//! - Logging configuration
//! - The built-in `admin` operator module
//!
//! ```ignore
//! use ember_runtime::EmberRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The client is the platform transport, constructed elsewhere.
//!     let runtime = EmberRuntime::new(client)?;
//!
//!     runtime.register_module(my_module);
//!
//!     // Run until Ctrl+C, SIGTERM, or the shutdown command
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use admin::{ADMIN_MODULE, AdminModule};
pub use config::{ConfigError, ConfigLoader, ConfigResult, EmberConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{EmberRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
