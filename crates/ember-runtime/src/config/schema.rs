//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ember_core::GuildId;

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmberConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Durable storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-guild configuration sections, keyed by guild snowflake.
    ///
    /// Each section is the guild's `name`, `roles`, and `channels` tables,
    /// passed through to the guild context as-is.
    #[serde(default)]
    pub guilds: HashMap<String, Value>,
}

impl EmberConfig {
    /// Parses the guild table keys into snowflakes.
    ///
    /// Fails on the first key that is not a decimal snowflake, so a typo'd
    /// guild id is caught at startup rather than silently never matching.
    pub fn guild_sections(&self) -> ConfigResult<HashMap<GuildId, Value>> {
        let mut sections = HashMap::with_capacity(self.guilds.len());
        for (key, section) in &self.guilds {
            let id: GuildId = key
                .parse()
                .map_err(|_| ConfigError::InvalidGuildKey(key.clone()))?;
            sections.insert(id, section.clone());
        }
        Ok(sections)
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which each guild gets its storage directory.
    ///
    /// When unset, guild state is in-memory only and lost on restart.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Whether contexts are created for guilds with no config section.
    #[serde(default = "default_create_unknown")]
    pub create_unknown_guilds: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            create_unknown_guilds: default_create_unknown(),
        }
    }
}

fn default_create_unknown() -> bool {
    true
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, required when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides, e.g. `ember_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The level as a lowercase filter directive fragment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}
