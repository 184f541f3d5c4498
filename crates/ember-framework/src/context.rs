//! Per-guild state: config, roles, channels, storage, and cache.
//!
//! A [`GuildContext`] is the unit of state isolation. One exists per guild
//! the agent observes; it is created by the
//! [`GuildDirectory`](crate::directory::GuildDirectory) and lives for the
//! life of the process (storage persists separately, the rest is
//! in-memory).
//!
//! All mutable maps are owned by the context and mutated only through its
//! methods — external callers never write them directly. Locks are held
//! only for the duration of a map operation, never across an await point.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use ember_core::{ChannelId, ChannelInfo, GuildId, Role, Snowflake, UserId};

use crate::error::{ConfigError, ContextError};
use crate::storage::GuildStorage;

/// A channel known to a guild context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// The channel snowflake.
    pub id: ChannelId,
    /// The guild this channel belongs to.
    pub guild_id: GuildId,
    /// The friendly name bound in guild config, if any.
    pub name: Option<String>,
    /// The name the platform displays, if known.
    pub platform_name: Option<String>,
}

/// A channel reference: either a snowflake or a config-bound friendly name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Look up by snowflake ID.
    ById(ChannelId),
    /// Look up by the friendly name bound in guild config.
    ByName(String),
}

impl From<ChannelId> for ChannelRef {
    fn from(id: ChannelId) -> Self {
        ChannelRef::ById(id)
    }
}

impl From<&str> for ChannelRef {
    fn from(name: &str) -> Self {
        ChannelRef::ByName(name.to_string())
    }
}

impl From<String> for ChannelRef {
    fn from(name: String) -> Self {
        ChannelRef::ByName(name)
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelRef::ById(id) => write!(f, "#{id}"),
            ChannelRef::ByName(name) => write!(f, "'{name}'"),
        }
    }
}

/// Both channel lookup structures plus the config-declared name bindings.
///
/// Kept in one struct behind one lock so add/remove always update the
/// id index and the name index together.
#[derive(Default)]
struct ChannelIndex {
    by_id: HashMap<ChannelId, Channel>,
    by_name: HashMap<String, ChannelId>,
    /// friendly name → snowflake, as declared in guild config.
    bindings: HashMap<String, ChannelId>,
}

impl ChannelIndex {
    fn insert(&mut self, guild_id: GuildId, info: ChannelInfo) {
        let friendly = self
            .bindings
            .iter()
            .find(|&(_, &id)| id == info.id)
            .map(|(name, _)| name.clone());

        if let Some(name) = &friendly {
            self.by_name.insert(name.clone(), info.id);
        }
        self.by_id.insert(
            info.id,
            Channel {
                id: info.id,
                guild_id,
                name: friendly,
                platform_name: info.platform_name,
            },
        );
    }

    fn remove(&mut self, id: ChannelId) -> Option<Channel> {
        let channel = self.by_id.remove(&id)?;
        if let Some(name) = &channel.name {
            self.by_name.remove(name);
        }
        Some(channel)
    }

    /// Re-derives friendly names for already-known channels after the
    /// bindings changed. Stale bindings are dropped, never merged.
    fn rebind(&mut self, bindings: HashMap<String, ChannelId>) {
        self.bindings = bindings;
        self.by_name.clear();
        for channel in self.by_id.values_mut() {
            channel.name = None;
        }
        for (name, id) in self.bindings.clone() {
            if let Some(channel) = self.by_id.get_mut(&id) {
                channel.name = Some(name.clone());
                self.by_name.insert(name, id);
            }
        }
    }
}

/// Per-guild context: config, role sets, channel index, storage, cache.
pub struct GuildContext {
    id: GuildId,
    name: RwLock<String>,
    config: RwLock<Value>,
    roles: RwLock<HashMap<Role, HashSet<UserId>>>,
    channels: RwLock<ChannelIndex>,
    storage: GuildStorage,
    cache: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl GuildContext {
    /// Creates an empty context for the given guild.
    pub fn new(id: GuildId) -> Self {
        Self {
            id,
            name: RwLock::new(String::new()),
            config: RwLock::new(Value::Null),
            roles: RwLock::new(HashMap::new()),
            channels: RwLock::new(ChannelIndex::default()),
            storage: GuildStorage::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The guild snowflake. Never changes for the life of the context.
    pub fn id(&self) -> GuildId {
        self.id
    }

    /// The name from guild config (not the platform-visible guild name).
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// The raw config section this context was last loaded from.
    pub fn config(&self) -> Value {
        self.config.read().clone()
    }

    // ─── Configuration ────────────────────────────────────────────────────

    /// Loads (or reloads) this guild's config section.
    ///
    /// Expects `name` (required), optional `roles` (role name → identity
    /// snowflake or list of them), and optional `channels` (friendly name
    /// → channel snowflake).
    ///
    /// Idempotent: role sets and friendly-name bindings are fully rebuilt
    /// from the new section, never merged with stale entries. On error
    /// nothing is committed and the context keeps its last-good state.
    pub fn load_config(&self, raw: &Value) -> Result<(), ConfigError> {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ConfigError::MissingName)?
            .to_string();

        // Parse everything before touching any state.
        let mut roles: HashMap<Role, HashSet<UserId>> = HashMap::new();
        if let Some(section) = raw.get("roles").and_then(Value::as_object) {
            for (role_name, entry) in section {
                let role: Role = role_name.parse().map_err(ConfigError::from)?;
                roles.insert(role, parse_identity_set(role_name, entry)?);
            }
        }

        let mut bindings: HashMap<String, ChannelId> = HashMap::new();
        if let Some(section) = raw.get("channels").and_then(Value::as_object) {
            for (friendly, entry) in section {
                let id = entry
                    .as_u64()
                    .ok_or_else(|| ConfigError::MalformedChannelEntry {
                        name: friendly.clone(),
                    })?;
                bindings.insert(friendly.clone(), Snowflake::new(id));
            }
        }

        *self.name.write() = name;
        *self.config.write() = raw.clone();
        *self.roles.write() = roles;
        self.channels.write().rebind(bindings);

        debug!(guild = %self.id, "Guild config loaded");
        Ok(())
    }

    // ─── Roles ────────────────────────────────────────────────────────────

    /// Whether `user` is enrolled in exactly `role`.
    ///
    /// Roles are independent sets — holding one role implies nothing about
    /// any other.
    pub fn has_role(&self, user: UserId, role: Role) -> bool {
        self.roles
            .read()
            .get(&role)
            .is_some_and(|members| members.contains(&user))
    }

    /// Whether `user` satisfies an optional role requirement.
    ///
    /// A `None` requirement is a public command and always passes.
    pub fn authorize(&self, user: UserId, required: Option<Role>) -> bool {
        match required {
            None => true,
            Some(role) => self.has_role(user, role),
        }
    }

    /// The identity set enrolled in `role`.
    pub fn role_members(&self, role: Role) -> HashSet<UserId> {
        self.roles.read().get(&role).cloned().unwrap_or_default()
    }

    // ─── Channels ─────────────────────────────────────────────────────────

    /// Adds a channel to both lookup indices.
    ///
    /// The friendly name, if the guild config binds one to this snowflake,
    /// is attached here.
    pub fn add_channel(&self, info: ChannelInfo) {
        self.channels.write().insert(self.id, info);
    }

    /// Removes a channel from both lookup indices.
    ///
    /// Removing a channel that is not present is a logged no-op, never an
    /// error — delete events can race the initial channel seed.
    pub fn remove_channel(&self, id: ChannelId) {
        if self.channels.write().remove(id).is_none() {
            debug!(guild = %self.id, channel = %id, "Ignored removal of unknown channel");
        }
    }

    /// Replaces the whole channel set, as delivered on guild availability.
    pub fn seed_channels(&self, infos: Vec<ChannelInfo>) {
        let mut index = self.channels.write();
        index.by_id.clear();
        index.by_name.clear();
        for info in infos {
            index.insert(self.id, info);
        }
    }

    /// Looks up a channel by snowflake or friendly name.
    pub fn channel(&self, channel_ref: impl Into<ChannelRef>) -> Result<Channel, ContextError> {
        let channel_ref = channel_ref.into();
        let index = self.channels.read();
        let found = match &channel_ref {
            ChannelRef::ById(id) => index.by_id.get(id),
            ChannelRef::ByName(name) => index
                .by_name
                .get(name)
                .and_then(|id| index.by_id.get(id)),
        };
        found
            .cloned()
            .ok_or_else(|| ContextError::ChannelNotFound(channel_ref.to_string()))
    }

    /// The number of known channels.
    pub fn channel_count(&self) -> usize {
        self.channels.read().by_id.len()
    }

    // ─── Storage and cache ────────────────────────────────────────────────

    /// This guild's durable storage.
    pub fn storage(&self) -> &GuildStorage {
        &self.storage
    }

    /// Stores a transient value in the cache.
    ///
    /// The cache survives module reloads but not process restarts; it is
    /// never persisted.
    pub fn cache_set<T: Send + Sync + 'static>(&self, name: &str, value: T) {
        self.cache
            .write()
            .insert(name.to_string(), Arc::new(value));
    }

    /// Fetches a cached value, if present and of type `T`.
    pub fn cache_get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.cache
            .read()
            .get(name)
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }

    /// Whether a cache entry exists under `name`.
    pub fn cache_has(&self, name: &str) -> bool {
        self.cache.read().contains_key(name)
    }

    /// Removes and returns a cached value.
    pub fn cache_take<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.cache
            .write()
            .remove(name)
            .and_then(|v| v.downcast::<T>().ok())
    }
}

impl std::fmt::Debug for GuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildContext")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("channels", &self.channel_count())
            .finish_non_exhaustive()
    }
}

fn parse_identity_set(role_name: &str, entry: &Value) -> Result<HashSet<UserId>, ConfigError> {
    let malformed = || ConfigError::MalformedRoleEntry {
        role: role_name.to_string(),
    };

    match entry {
        Value::Number(_) => {
            let id = entry.as_u64().ok_or_else(malformed)?;
            Ok(HashSet::from([Snowflake::new(id)]))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().map(Snowflake::new).ok_or_else(malformed))
            .collect(),
        _ => Err(malformed()),
    }
}
