//! Event routing: from inbound gateway events to handler tasks.
//!
//! The [`Router`] is the dispatch entry point. For every inbound message it
//! resolves the originating guild context, walks a snapshot of all loaded
//! modules, tests each handler's pattern against the trimmed text, checks
//! authorization, and spawns every matched-and-authorized handler as an
//! independent task. Handler failures are isolated: one erroring handler
//! never prevents its siblings from running, and never poisons future
//! dispatch.
//!
//! Authorization failures are **silent** by policy: an unauthorized caller
//! gets no response at all, so the existence of privileged commands is not
//! leaked.
//!
//! Shutdown is cooperative: cancelling the token stops new events from
//! being dispatched, and [`drain`](Router::drain) waits for in-flight
//! handler tasks (including their storage writes) to finish.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Level, debug, span, trace, warn};

use ember_core::{BoxedClient, GatewayEvent, MessageEvent};

use crate::directory::GuildDirectory;
use crate::handler::Invocation;
use crate::registry::ModuleRegistry;

/// The dispatch entry point tying registry, guilds, and client together.
pub struct Router {
    registry: Arc<ModuleRegistry>,
    guilds: Arc<GuildDirectory>,
    client: BoxedClient,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl Router {
    /// Creates a router over the given registry, directory, and client.
    pub fn new(
        registry: Arc<ModuleRegistry>,
        guilds: Arc<GuildDirectory>,
        client: BoxedClient,
    ) -> Self {
        Self {
            registry,
            guilds,
            client,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// The registry this router dispatches from.
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// The guild directory this router resolves contexts from.
    pub fn guilds(&self) -> &Arc<GuildDirectory> {
        &self.guilds
    }

    /// The token cancelled to request an orderly shutdown.
    ///
    /// Handlers receive a clone in their invocation; the runtime loop
    /// watches it to stop consuming events.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Dispatches one inbound gateway event.
    ///
    /// Channel lifecycle events maintain the guild's channel index; guild
    /// availability seeds the context; messages run command dispatch.
    pub async fn dispatch(&self, event: GatewayEvent) {
        let span = span!(Level::DEBUG, "dispatch", event = event.event_name(), guild = %event.guild_id());
        let _enter = span.enter();

        match event {
            GatewayEvent::Message(msg) => self.dispatch_message(msg).await,
            GatewayEvent::GuildAvailable { guild_id, channels } => {
                if let Some(ctx) = self.guilds.resolve(guild_id).await {
                    debug!(channels = channels.len(), "Guild available, seeding channels");
                    ctx.seed_channels(channels);
                }
            }
            GatewayEvent::ChannelCreate { guild_id, channel } => {
                if let Some(ctx) = self.guilds.get(guild_id) {
                    ctx.add_channel(channel);
                }
            }
            GatewayEvent::ChannelDelete {
                guild_id,
                channel_id,
            } => {
                if let Some(ctx) = self.guilds.get(guild_id) {
                    ctx.remove_channel(channel_id);
                }
            }
        }
    }

    async fn dispatch_message(&self, event: MessageEvent) {
        if self.shutdown.is_cancelled() {
            trace!("Shutting down, not accepting new events");
            return;
        }

        let Some(guild) = self.guilds.resolve(event.guild_id).await else {
            return;
        };

        let text = event.content.trim().to_string();
        let mut matched_count = 0usize;

        for module in self.registry.modules() {
            for handler in module.handlers() {
                let Some(args) = handler.pattern().find(&text) else {
                    continue;
                };

                if !guild.authorize(event.author_id, handler.required_role()) {
                    // Silent by policy: no reply, no reaction, so gated
                    // commands stay invisible to unauthorized callers.
                    trace!(
                        module = module.name(),
                        handler = handler.name(),
                        caller = %event.author_id,
                        "Unauthorized caller, ignoring match"
                    );
                    continue;
                }

                matched_count += 1;
                let invocation = Invocation {
                    event: event.clone(),
                    args,
                    guild: Arc::clone(&guild),
                    client: Arc::clone(&self.client),
                    registry: Arc::clone(&self.registry),
                    shutdown: self.shutdown.clone(),
                };

                let module_name = module.name().to_string();
                let handler_name = handler.name().to_string();
                let action = handler.action();

                self.tracker.spawn(async move {
                    if let Err(e) = action.run(invocation).await {
                        warn!(
                            module = %module_name,
                            handler = %handler_name,
                            error = %e,
                            "Handler failed"
                        );
                    }
                });
            }
        }

        if matched_count > 0 {
            debug!(matched = matched_count, "Dispatched message to handlers");
        }
    }

    /// Requests an orderly shutdown: no new events are dispatched.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Waits for all in-flight handler tasks to finish.
    ///
    /// Never aborts a task: a handler mid-way through a durable storage
    /// write always completes it.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("modules", &self.registry.module_count())
            .field("in_flight", &self.tracker.len())
            .finish_non_exhaustive()
    }
}
