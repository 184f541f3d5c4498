//! Handlers: the (pattern, required role, action) triples a module registers.
//!
//! A handler exists in two forms:
//!
//! - [`HandlerDecl`] — the uncompiled declaration a [`ModuleSource`] hands
//!   to the registry. Cheap to construct, carries the raw pattern string.
//! - [`Handler`] — the compiled, immutable value installed into a loaded
//!   [`Module`]. Created once per module load, never mutated.
//!
//! Actions are async and receive an [`Invocation`] scoped to the
//! originating guild.
//!
//! [`ModuleSource`]: crate::module::ModuleSource
//! [`Module`]: crate::module::Module

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ember_core::{ApiResult, BoxedClient, MessageEvent, MessageId, Role};

use crate::context::GuildContext;
use crate::error::{HandlerResult, LoadError};
use crate::pattern::{CommandMatch, CommandPattern};
use crate::registry::ModuleRegistry;

/// The asynchronous body of a handler.
#[async_trait]
pub trait HandlerAction: Send + Sync {
    /// Executes the handler for one matched event.
    async fn run(&self, invocation: Invocation) -> HandlerResult;
}

struct FnAction<F>(F);

#[async_trait]
impl<F, Fut> HandlerAction for FnAction<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn run(&self, invocation: Invocation) -> HandlerResult {
        (self.0)(invocation).await
    }
}

/// Wraps an async function or closure as a shareable [`HandlerAction`].
pub fn action<F, Fut>(f: F) -> Arc<dyn HandlerAction>
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnAction(f))
}

/// An uncompiled handler declaration.
///
/// Produced by module sources; compiled into a [`Handler`] by the registry
/// at load time. A compilation failure fails the whole module load.
#[derive(Clone)]
pub struct HandlerDecl {
    name: String,
    pattern: String,
    case_sensitive: bool,
    required_role: Option<Role>,
    action: Arc<dyn HandlerAction>,
}

impl HandlerDecl {
    /// Declares a handler with the given name, pattern, and action.
    ///
    /// Public (no required role) and case-sensitive by default.
    pub fn new<F, Fut>(name: impl Into<String>, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            case_sensitive: true,
            required_role: None,
            action: action(f),
        }
    }

    /// Declares a handler from a pre-built action.
    pub fn from_action(
        name: impl Into<String>,
        pattern: impl Into<String>,
        action: Arc<dyn HandlerAction>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            case_sensitive: true,
            required_role: None,
            action,
        }
    }

    /// Requires callers to hold `role`.
    pub fn role(mut self, role: Role) -> Self {
        self.required_role = Some(role);
        self
    }

    /// Opts out of case-sensitive matching.
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// The handler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiles the declaration into an immutable [`Handler`].
    pub(crate) fn compile(&self) -> Result<Handler, LoadError> {
        let pattern =
            CommandPattern::compile(&self.pattern, self.case_sensitive).map_err(|source| {
                LoadError::Pattern {
                    handler: self.name.clone(),
                    source,
                }
            })?;

        Ok(Handler {
            name: self.name.clone(),
            pattern,
            required_role: self.required_role,
            action: Arc::clone(&self.action),
        })
    }
}

impl std::fmt::Debug for HandlerDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDecl")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("required_role", &self.required_role)
            .finish_non_exhaustive()
    }
}

/// A compiled handler installed in a loaded module.
///
/// Immutable after module load; reload replaces the whole module rather
/// than mutating handlers in place.
#[derive(Clone)]
pub struct Handler {
    name: String,
    pattern: CommandPattern,
    required_role: Option<Role>,
    action: Arc<dyn HandlerAction>,
}

impl Handler {
    /// The handler name, unique within its module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &CommandPattern {
        &self.pattern
    }

    /// The role a caller must hold, or `None` for a public handler.
    pub fn required_role(&self) -> Option<Role> {
        self.required_role
    }

    /// The shared action body.
    pub fn action(&self) -> Arc<dyn HandlerAction> {
        Arc::clone(&self.action)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("required_role", &self.required_role)
            .finish_non_exhaustive()
    }
}

/// Everything a handler action receives for one matched event.
///
/// Cloneable; every matched handler gets its own invocation scoped to the
/// originating guild.
#[derive(Clone)]
pub struct Invocation {
    /// The inbound message that matched.
    pub event: MessageEvent,
    /// The positional capture result of the pattern match.
    pub args: CommandMatch,
    /// The originating guild's context.
    pub guild: Arc<GuildContext>,
    /// The platform capability interface.
    pub client: BoxedClient,
    /// The registry, for operator commands that manage modules.
    pub registry: Arc<ModuleRegistry>,
    /// Cancelled to request an orderly process shutdown.
    pub shutdown: CancellationToken,
}

impl Invocation {
    /// Sends `text` to the channel the event originated from.
    pub async fn reply(&self, text: &str) -> ApiResult<MessageId> {
        self.client.send(self.event.channel_id, text).await
    }

    /// Reacts to the originating message with `emoji`.
    pub async fn react(&self, emoji: &str) -> ApiResult<()> {
        self.client
            .react(self.event.channel_id, self.event.message_id, emoji)
            .await
    }
}
