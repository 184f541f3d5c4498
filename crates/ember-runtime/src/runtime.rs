//! Main runtime orchestration.
//!
//! [`EmberRuntime`] owns the module registry, the guild directory, and the
//! router, and drives them from the platform client's event stream.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ember_runtime::EmberRuntime;
//!
//! // Auto-loads config from ember.toml in the current directory
//! let runtime = EmberRuntime::new(client)?;
//!
//! // Custom configuration path
//! let runtime = EmberRuntime::builder()
//!     .config_file("config/ember.toml")
//!     .build(client)?;
//!
//! runtime.register_module(my_module);
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use futures::StreamExt;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ember_core::BoxedClient;
use ember_framework::{GuildDirectory, ModuleRegistry, ModuleSource, Router};

use crate::admin::AdminModule;
use crate::config::{ConfigLoader, EmberConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// The main runtime: orchestrates modules, guilds, and event dispatch.
pub struct EmberRuntime {
    registry: Arc<ModuleRegistry>,
    guilds: Arc<GuildDirectory>,
    router: Arc<Router>,
    client: BoxedClient,
}

impl EmberRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Searches for `ember.toml` in the current directory and the user
    /// config directory; missing files fall back to defaults.
    pub fn new(client: BoxedClient) -> RuntimeResult<Self> {
        let config = ConfigLoader::new().load()?;
        Self::from_config(&config, client)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration.
    ///
    /// Initializes logging, builds the guild directory from the per-guild
    /// config sections, and registers the built-in admin module. Modules
    /// are registered but not loaded until [`run`](Self::run).
    pub fn from_config(config: &EmberConfig, client: BoxedClient) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);

        let mut directory = GuildDirectory::new().create_unknown(config.storage.create_unknown_guilds);
        if let Some(root) = &config.storage.root {
            directory = directory.storage_root(root);
        }
        let guilds = Arc::new(directory);

        let failures = guilds.apply_configs(config.guild_sections()?);
        for (guild_id, error) in &failures {
            warn!(guild = %guild_id, error = %error, "Guild config section rejected");
        }

        let registry = Arc::new(ModuleRegistry::new());
        registry.register_source(Arc::new(AdminModule::new(Arc::clone(&guilds))));

        let router = Arc::new(Router::new(
            Arc::clone(&registry),
            Arc::clone(&guilds),
            Arc::clone(&client),
        ));

        info!(
            log_level = %config.logging.level,
            configured_guilds = config.guilds.len(),
            "Runtime initialized from configuration"
        );

        Ok(Self {
            registry,
            guilds,
            router,
            client,
        })
    }

    /// Registers a module source. Loaded when the runtime starts.
    pub fn register_module(&self, source: Arc<dyn ModuleSource>) {
        self.registry.register_source(source);
    }

    /// The module registry.
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// The guild directory.
    pub fn guilds(&self) -> &Arc<GuildDirectory> {
        &self.guilds
    }

    /// The token cancelled to request an orderly shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.router.shutdown_token()
    }

    /// Runs until the event stream ends or a shutdown is requested.
    ///
    /// Shutdown can come from Ctrl+C, SIGTERM, or the `shutdown` operator
    /// command. Teardown is ordered: stop consuming events, wait for
    /// in-flight handlers, then flush every guild's storage.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start();

        let shutdown = self.router.shutdown_token();
        spawn_signal_listener(shutdown.clone());

        info!("Ember is now running. Press Ctrl+C to stop.");

        let mut events = self.client.receive();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.next() => match event {
                    Some(event) => self.router.dispatch(event).await,
                    None => {
                        warn!("Event stream ended, shutting down");
                        break;
                    }
                },
            }
        }

        self.stop().await;
        Ok(())
    }

    /// Runs until a custom shutdown future resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let token = self.router.shutdown_token();
        tokio::pin!(shutdown);

        tokio::select! {
            result = self.run() => result,
            _ = &mut shutdown => {
                token.cancel();
                self.stop().await;
                Ok(())
            }
        }
    }

    /// Loads all registered modules.
    fn start(&self) {
        let failures = self.registry.load_all();
        for (name, error) in &failures {
            warn!(module = %name, error = %error, "Module failed to load at startup");
        }
        info!(modules = self.registry.module_count(), "Modules loaded");
    }

    /// Ordered teardown: drain handlers, then flush storage.
    async fn stop(&self) {
        self.router.shutdown();
        self.router.drain().await;
        self.guilds.save_all().await;
        info!("Runtime stopped");
    }
}

/// Cancels the token on Ctrl+C or SIGTERM.
fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let Ok(mut sigterm) = signal::unix::signal(signal::unix::SignalKind::terminate())
            else {
                warn!("Failed to register SIGTERM handler");
                return;
            };

            tokio::select! {
                _ = signal::ctrl_c() => info!("Received Ctrl+C"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            if signal::ctrl_c().await.is_err() {
                warn!("Failed to listen for Ctrl+C");
                return;
            }
            info!("Received Ctrl+C");
        }

        token.cancel();
    });
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating an [`EmberRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Merges configuration programmatically on top of file and env sources.
    pub fn merge(mut self, config: EmberConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self, client: BoxedClient) -> RuntimeResult<EmberRuntime> {
        let config = self.config_loader.load()?;
        EmberRuntime::from_config(&config, client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use serde_json::json;

    use ember_core::{
        ApiError, ApiResult, ChannelId, ChannelInfo, ChatClient, GatewayEvent, GuildId, Member,
        MessageEvent, MessageId, ProfileEdit, Snowflake, UserId,
    };
    use ember_framework::{HandlerDecl, StaticModule};

    /// A client that yields a scripted set of events, then hangs.
    struct ScriptedClient {
        events: Mutex<Option<Vec<GatewayEvent>>>,
        sends: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(events: Vec<GatewayEvent>) -> Self {
            Self {
                events: Mutex::new(Some(events)),
                sends: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedClient {
        fn receive(&self) -> BoxStream<'static, GatewayEvent> {
            let events = self.events.lock().unwrap().take().unwrap_or_default();
            futures::stream::iter(events)
                .chain(futures::stream::pending())
                .boxed()
        }

        async fn send(&self, _channel: ChannelId, text: &str) -> ApiResult<MessageId> {
            self.sends.lock().unwrap().push(text.to_string());
            Ok(Snowflake::new(1))
        }

        async fn react(
            &self,
            _channel: ChannelId,
            _message: MessageId,
            _emoji: &str,
        ) -> ApiResult<()> {
            Ok(())
        }

        async fn edit_profile(&self, _edit: ProfileEdit) -> ApiResult<()> {
            Ok(())
        }

        async fn edit_member_nick(&self, _guild: GuildId, _nick: &str) -> ApiResult<()> {
            Ok(())
        }

        async fn fetch_guild_member(&self, _guild: GuildId, user: UserId) -> ApiResult<Member> {
            Err(ApiError::NotFound(user.to_string()))
        }

        async fn list_guild_channels(&self, _guild: GuildId) -> ApiResult<Vec<ChannelInfo>> {
            Ok(Vec::new())
        }
    }

    fn test_config() -> EmberConfig {
        EmberConfig {
            guilds: HashMap::from([(
                "1".to_string(),
                json!({"name": "test", "roles": {"OWNER": [111]}}),
            )]),
            ..Default::default()
        }
    }

    fn owner_message(text: &str) -> GatewayEvent {
        GatewayEvent::Message(MessageEvent {
            guild_id: Snowflake::new(1),
            channel_id: Snowflake::new(10),
            message_id: Snowflake::new(5000),
            author_id: Snowflake::new(111),
            content: text.to_string(),
            attachments: Vec::new(),
        })
    }

    #[tokio::test]
    async fn admin_module_is_always_registered() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let runtime = EmberRuntime::from_config(&test_config(), client).unwrap();

        assert!(runtime.registry().load_all().is_empty());
        assert!(runtime.registry().is_loaded("admin"));
    }

    #[tokio::test]
    async fn shutdown_command_stops_the_run_loop() {
        let client = Arc::new(ScriptedClient::new(vec![owner_message("shutdown")]));
        let runtime = EmberRuntime::from_config(&test_config(), client.clone()).unwrap();

        // Completes only if the shutdown command cancels the loop.
        tokio::time::timeout(std::time::Duration::from_secs(5), runtime.run())
            .await
            .expect("run loop should stop on the shutdown command")
            .unwrap();

        assert_eq!(*client.sends.lock().unwrap(), ["Shutting down!"]);
    }

    #[tokio::test]
    async fn registered_modules_dispatch_during_run() {
        let client = Arc::new(ScriptedClient::new(vec![
            owner_message("ping"),
            owner_message("shutdown"),
        ]));
        let runtime = EmberRuntime::from_config(&test_config(), client.clone()).unwrap();

        runtime.register_module(Arc::new(StaticModule::new("chat").handler(
            HandlerDecl::new("ping", "^ping$", |inv| async move {
                inv.reply("pong").await?;
                Ok(())
            }),
        )));

        tokio::time::timeout(std::time::Duration::from_secs(5), runtime.run())
            .await
            .expect("run loop should stop on the shutdown command")
            .unwrap();

        let sends = client.sends.lock().unwrap();
        assert!(sends.contains(&"pong".to_string()));
    }

    #[tokio::test]
    async fn run_until_stops_on_the_custom_future() {
        let client = Arc::new(ScriptedClient::new(Vec::new()));
        let runtime = EmberRuntime::from_config(&test_config(), client).unwrap();

        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            runtime.run_until(async {}),
        )
        .await
        .expect("run_until should stop immediately")
        .unwrap();
    }
}
