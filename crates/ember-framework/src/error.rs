//! Error types for the Ember framework.
//!
//! The taxonomy mirrors the propagation policy: errors local to one
//! module, handler, or guild are typed and contained; nothing here escapes
//! to abort dispatch for unrelated modules or guilds.

use std::path::PathBuf;

use thiserror::Error;

use ember_core::{ApiError, UnknownRole};

/// A handler pattern specification failed to compile.
#[derive(Debug, Clone, Error)]
#[error("invalid pattern '{pattern}': {source}")]
pub struct PatternError {
    /// The pattern as written in the handler declaration.
    pub pattern: String,
    /// The underlying regex error.
    #[source]
    pub source: regex::Error,
}

/// A module failed to load or reload.
///
/// When a load fails, the previously installed version of the module (if
/// any) remains active — reload is all-or-nothing per module.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// A handler's pattern did not compile.
    #[error("handler '{handler}' failed to compile: {source}")]
    Pattern {
        /// The handler whose pattern was rejected.
        handler: String,
        /// The compilation failure.
        #[source]
        source: PatternError,
    },

    /// Two handlers in one module share a name.
    #[error("duplicate handler name '{handler}' in module '{module}'")]
    DuplicateHandler {
        /// The module being loaded.
        module: String,
        /// The colliding handler name.
        handler: String,
    },

    /// No source is registered under the requested module name.
    #[error("no module source registered under '{0}'")]
    UnknownModule(String),

    /// The module source failed to produce its handler declarations.
    #[error("module source failed: {0}")]
    Source(String),
}

/// A guild configuration section was malformed.
///
/// The guild context is left in its last-good state when this is returned.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The required `name` key is absent or not a string.
    #[error("guild config is missing a 'name' entry")]
    MissingName,

    /// A role name in the `roles` table is not defined.
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    /// An identity entry under `roles` is not a snowflake or list of them.
    #[error("role '{role}' has a malformed identity entry")]
    MalformedRoleEntry {
        /// The role whose entry was rejected.
        role: String,
    },

    /// A channel binding under `channels` is not a snowflake.
    #[error("channel '{name}' is bound to a malformed snowflake")]
    MalformedChannelEntry {
        /// The friendly name whose binding was rejected.
        name: String,
    },
}

/// A lookup in a guild context failed.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// No channel exists under the given reference.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
}

/// A storage operation failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A save was attempted before a durable directory was bound.
    #[error("no storage directory is bound for this guild")]
    NotConfigured,

    /// The named storage entry does not exist in memory.
    #[error("no storage entry named '{0}'")]
    NotFound(String),

    /// The value could not be serialized to the storage envelope.
    #[error("failed to serialize storage entry '{name}': {source}")]
    Serialize {
        /// The entry being saved.
        name: String,
        /// The serializer failure.
        #[source]
        source: serde_json::Error,
    },

    /// A storage file could not be decoded.
    #[error("failed to decode storage file {path}: {reason}")]
    Decode {
        /// The offending file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The file carries a format version newer than this build understands.
    #[error("storage file {path} uses unsupported format version {version}")]
    UnsupportedVersion {
        /// The offending file.
        path: PathBuf,
        /// The version found in the envelope.
        version: u32,
    },

    /// Filesystem failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An individual handler's action failed during execution.
///
/// Isolated to that handler: the router logs it and sibling handlers
/// matched from the same event are unaffected.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A platform capability call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A guild context lookup failed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Any other handler-specific failure.
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    /// Creates a handler-specific failure from a message.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for handler actions.
pub type HandlerResult = Result<(), HandlerError>;
