//! # Ember Framework
//!
//! The agent's runtime core: modules, commands, and per-guild state.
//!
//! This layer provides:
//! - Module registry with transactional per-module hot-reload
//! - Pattern-matched command handlers with role-based authorization
//! - Per-guild contexts: config, roles, channel index, cache
//! - Durable per-guild storage with versioned JSON envelopes
//! - The router dispatching gateway events to handler tasks
//!
//! The framework layer is built on the core types but is platform-agnostic:
//! everything platform-specific arrives through the [`ChatClient`] trait.
//!
//! [`ChatClient`]: ember_core::ChatClient

pub mod context;
pub mod directory;
pub mod error;
pub mod handler;
pub mod module;
pub mod pattern;
pub mod registry;
pub mod router;
pub mod storage;

pub use context::{Channel, ChannelRef, GuildContext};
pub use directory::GuildDirectory;
pub use error::{
    ConfigError, ContextError, HandlerError, HandlerResult, LoadError, PatternError, StorageError,
};
pub use handler::{Handler, HandlerAction, HandlerDecl, Invocation, action};
pub use module::{Module, ModuleSource, StaticModule};
pub use pattern::{CommandMatch, CommandPattern};
pub use registry::ModuleRegistry;
pub use router::Router;
pub use storage::{GuildStorage, STORAGE_FORMAT_VERSION};
