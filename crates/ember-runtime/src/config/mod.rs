//! Configuration module for the Ember runtime.
//!
//! Provides TOML and environment-variable based configuration for logging,
//! storage, and per-guild settings.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{EmberConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, StorageConfig};
