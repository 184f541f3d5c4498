//! The guild directory: ownership and lifecycle of guild contexts.
//!
//! [`GuildDirectory`] maps guild snowflakes to their [`GuildContext`]s. It
//! holds the per-guild config sections, the durable storage root, and the
//! policy for guilds that appear without configuration. The router asks it
//! to resolve the originating context for every inbound event.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use ember_core::GuildId;

use crate::context::GuildContext;
use crate::error::ConfigError;

/// Owner of all live guild contexts.
pub struct GuildDirectory {
    guilds: RwLock<HashMap<GuildId, Arc<GuildContext>>>,
    configs: RwLock<HashMap<GuildId, Value>>,
    storage_root: Option<PathBuf>,
    create_unknown: bool,
}

impl Default for GuildDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl GuildDirectory {
    /// Creates a directory with no storage root that accepts unknown guilds.
    pub fn new() -> Self {
        Self {
            guilds: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
            storage_root: None,
            create_unknown: true,
        }
    }

    /// Sets the root directory under which each guild gets its storage
    /// directory (`<root>/<guild_id>/`).
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    /// Sets whether contexts are created for guilds with no config section.
    ///
    /// When `false`, events from unconfigured guilds are dropped by the
    /// router.
    pub fn create_unknown(mut self, create: bool) -> Self {
        self.create_unknown = create;
        self
    }

    /// Installs or replaces the config sections for all guilds.
    ///
    /// Live contexts are reloaded immediately; a section that fails to
    /// parse leaves its context in the last-good state and is reported in
    /// the returned list.
    pub fn apply_configs(&self, sections: HashMap<GuildId, Value>) -> Vec<(GuildId, ConfigError)> {
        let mut failures = Vec::new();

        for (guild_id, section) in &sections {
            if let Some(ctx) = self.get(*guild_id)
                && let Err(e) = ctx.load_config(section)
            {
                warn!(guild = %guild_id, error = %e, "Guild config rejected, keeping last-good");
                failures.push((*guild_id, e));
            }
        }

        *self.configs.write() = sections;
        failures
    }

    /// Returns the live context for `guild_id`, if one exists.
    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildContext>> {
        self.guilds.read().get(&guild_id).cloned()
    }

    /// Returns the context for `guild_id`, creating it on first sight.
    ///
    /// Creation loads the guild's config section (when present), binds the
    /// storage directory, and loads prior storage. Returns `None` when the
    /// guild has no config section and unknown guilds are not accepted.
    pub async fn resolve(&self, guild_id: GuildId) -> Option<Arc<GuildContext>> {
        if let Some(ctx) = self.get(guild_id) {
            return Some(ctx);
        }

        let section = self.configs.read().get(&guild_id).cloned();
        if section.is_none() && !self.create_unknown {
            debug!(guild = %guild_id, "Dropping event from unconfigured guild");
            return None;
        }

        let ctx = Arc::new(GuildContext::new(guild_id));

        if let Some(section) = section
            && let Err(e) = ctx.load_config(&section)
        {
            warn!(guild = %guild_id, error = %e, "Guild config rejected at creation");
        }

        if let Some(root) = &self.storage_root {
            let dir = root.join(guild_id.to_string());
            match ctx.storage().bind_dir(&dir).await {
                Ok(()) => {
                    if let Err(e) = ctx.storage().load_all().await {
                        warn!(guild = %guild_id, error = %e, "Failed to load guild storage");
                    }
                }
                Err(e) => {
                    warn!(guild = %guild_id, error = %e, "Failed to bind guild storage directory");
                }
            }
        }

        // Another task may have created the context while we were doing
        // I/O; the first insertion wins.
        let mut guilds = self.guilds.write();
        let installed = guilds.entry(guild_id).or_insert_with(|| {
            info!(guild = %guild_id, "Guild context created");
            ctx
        });
        Some(Arc::clone(installed))
    }

    /// Drops the context for a guild the agent has left.
    ///
    /// In-memory state is discarded; durable storage stays on disk.
    pub fn remove(&self, guild_id: GuildId) -> bool {
        self.guilds.write().remove(&guild_id).is_some()
    }

    /// All live contexts.
    pub fn guilds(&self) -> Vec<Arc<GuildContext>> {
        self.guilds.read().values().cloned().collect()
    }

    /// Flushes every guild's storage concurrently.
    ///
    /// Per-entry failures are logged by the storage layer; a guild without
    /// a bound storage directory is skipped.
    pub async fn save_all(&self) {
        let contexts: Vec<_> = self
            .guilds()
            .into_iter()
            .filter(|ctx| ctx.storage().dir().is_some())
            .collect();

        debug!(guilds = contexts.len(), "Saving storage for all guilds");
        future::join_all(contexts.iter().map(|ctx| ctx.storage().save_all())).await;
    }
}

impl std::fmt::Debug for GuildDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildDirectory")
            .field("guilds", &self.guilds.read().len())
            .field("configured", &self.configs.read().len())
            .field("storage_root", &self.storage_root)
            .field("create_unknown", &self.create_unknown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Role;
    use ember_core::Snowflake;
    use serde_json::json;

    #[tokio::test]
    async fn resolve_creates_a_context_with_its_config() {
        let directory = GuildDirectory::new();
        directory.apply_configs(HashMap::from([(
            Snowflake::new(1),
            json!({"name": "test", "roles": {"OWNER": [111]}}),
        )]));

        let ctx = directory.resolve(Snowflake::new(1)).await.unwrap();
        assert_eq!(ctx.name(), "test");
        assert!(ctx.has_role(Snowflake::new(111), Role::Owner));

        // Resolving again returns the same context.
        let again = directory.resolve(Snowflake::new(1)).await.unwrap();
        assert!(Arc::ptr_eq(&ctx, &again));
    }

    #[tokio::test]
    async fn unconfigured_guilds_are_dropped_when_policy_says_so() {
        let directory = GuildDirectory::new().create_unknown(false);
        assert!(directory.resolve(Snowflake::new(9)).await.is_none());

        let open = GuildDirectory::new();
        assert!(open.resolve(Snowflake::new(9)).await.is_some());
    }

    #[tokio::test]
    async fn apply_configs_reloads_live_contexts() {
        let directory = GuildDirectory::new();
        directory.apply_configs(HashMap::from([(
            Snowflake::new(1),
            json!({"name": "v1", "roles": {"OWNER": 111}}),
        )]));
        let ctx = directory.resolve(Snowflake::new(1)).await.unwrap();

        let failures = directory.apply_configs(HashMap::from([(
            Snowflake::new(1),
            json!({"name": "v2", "roles": {"ADMIN": 222}}),
        )]));

        assert!(failures.is_empty());
        assert_eq!(ctx.name(), "v2");
        assert!(!ctx.has_role(Snowflake::new(111), Role::Owner));
    }

    #[tokio::test]
    async fn rejected_reload_keeps_last_good_config() {
        let directory = GuildDirectory::new();
        directory.apply_configs(HashMap::from([(
            Snowflake::new(1),
            json!({"name": "good", "roles": {"OWNER": 111}}),
        )]));
        let ctx = directory.resolve(Snowflake::new(1)).await.unwrap();

        let failures = directory.apply_configs(HashMap::from([(
            Snowflake::new(1),
            json!({"name": "bad", "roles": {"WIZARD": 1}}),
        )]));

        assert_eq!(failures.len(), 1);
        assert_eq!(ctx.name(), "good");
        assert!(ctx.has_role(Snowflake::new(111), Role::Owner));
    }

    #[tokio::test]
    async fn storage_is_bound_and_loaded_per_guild() {
        let root = tempfile::tempdir().unwrap();
        let directory = GuildDirectory::new().storage_root(root.path());

        let ctx = directory.resolve(Snowflake::new(7)).await.unwrap();
        ctx.storage()
            .set_and_save("notes", json!(["a", "b"]))
            .await
            .unwrap();
        directory.save_all().await;

        // A fresh directory over the same root sees the persisted state.
        let fresh = GuildDirectory::new().storage_root(root.path());
        let ctx = fresh.resolve(Snowflake::new(7)).await.unwrap();
        assert_eq!(ctx.storage().get("notes"), Some(json!(["a", "b"])));
    }
}
