//! Built-in operator commands.
//!
//! [`AdminModule`] is the module the runtime always registers: hot-reload,
//! module listing, orderly shutdown, profile management, and a manual
//! storage flush. Every handler requires the caller to hold the `OWNER`
//! role in the originating guild; non-owners get silence.

use std::sync::Arc;

use tracing::{info, warn};

use ember_core::{ProfileEdit, Role};
use ember_framework::{GuildDirectory, HandlerDecl, HandlerError, LoadError, ModuleSource};

/// Name the admin module is registered under.
pub const ADMIN_MODULE: &str = "admin";

/// The operator command module.
pub struct AdminModule {
    guilds: Arc<GuildDirectory>,
}

impl AdminModule {
    /// Creates the admin module over the runtime's guild directory.
    pub fn new(guilds: Arc<GuildDirectory>) -> Self {
        Self { guilds }
    }
}

impl ModuleSource for AdminModule {
    fn name(&self) -> &str {
        ADMIN_MODULE
    }

    fn handlers(&self) -> Result<Vec<HandlerDecl>, LoadError> {
        let guilds = Arc::clone(&self.guilds);

        Ok(vec![
            HandlerDecl::new("reload", "^reload$", |inv| async move {
                let failures = inv.registry.reload_modules();
                if failures.is_empty() {
                    inv.react("\u{1F44C}").await?;
                } else {
                    inv.react("\u{1F912}").await?;
                    let listing: Vec<String> = failures
                        .iter()
                        .map(|(name, error)| format!("{name}: {error}"))
                        .collect();
                    inv.reply(&format!("Reload failed:\n```\n{}\n```", listing.join("\n")))
                        .await?;
                }
                Ok(())
            })
            .role(Role::Owner),
            HandlerDecl::new("modules", "^modules$", |inv| async move {
                let listing: Vec<String> = inv
                    .registry
                    .modules()
                    .iter()
                    .map(|m| {
                        let handlers: Vec<&str> = m.handlers().map(|h| h.name()).collect();
                        format!("{}: {}", m.name(), handlers.join(", "))
                    })
                    .collect();
                inv.reply(&format!("```\n{}\n```", listing.join("\n")))
                    .await?;
                Ok(())
            })
            .role(Role::Owner),
            HandlerDecl::new("shutdown", "^shutdown$", |inv| async move {
                info!(caller = %inv.event.author_id, "Shutdown requested");
                inv.reply("Shutting down!").await?;
                inv.shutdown.cancel();
                Ok(())
            })
            .role(Role::Owner),
            HandlerDecl::new("name", r"^name\s+(.+)$", |inv| async move {
                let name = inv
                    .args
                    .group(1)
                    .ok_or_else(|| HandlerError::other("name argument missing"))?
                    .to_string();
                inv.client.edit_profile(ProfileEdit::username(name)).await?;
                inv.react("\u{1F44C}").await?;
                Ok(())
            })
            .role(Role::Owner),
            HandlerDecl::new("nick", r"^nick\s+(.+)$", |inv| async move {
                let nick = inv
                    .args
                    .group(1)
                    .ok_or_else(|| HandlerError::other("nick argument missing"))?
                    .to_string();
                inv.client.edit_member_nick(inv.guild.id(), &nick).await?;
                inv.react("\u{1F44C}").await?;
                Ok(())
            })
            .role(Role::Owner),
            HandlerDecl::new("save", "^save$", move |inv| {
                let guilds = Arc::clone(&guilds);
                async move {
                    guilds.save_all().await;
                    if let Err(e) = inv.react("\u{1F44C}").await {
                        warn!(error = %e, "Saved, but could not acknowledge");
                    }
                    Ok(())
                }
            })
            .role(Role::Owner),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream::BoxStream;
    use serde_json::json;

    use ember_core::{
        ApiError, ApiResult, ChannelId, ChannelInfo, ChatClient, GatewayEvent, GuildId, Member,
        MessageEvent, MessageId, Snowflake, UserId,
    };
    use ember_framework::{ModuleRegistry, Router};

    #[derive(Default)]
    struct RecordingClient {
        sends: Mutex<Vec<String>>,
        reactions: Mutex<Vec<String>>,
        profile_edits: Mutex<Vec<ProfileEdit>>,
        nick_edits: Mutex<Vec<(GuildId, String)>>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        fn receive(&self) -> BoxStream<'static, GatewayEvent> {
            futures::stream::empty().boxed()
        }

        async fn send(&self, _channel: ChannelId, text: &str) -> ApiResult<MessageId> {
            self.sends.lock().unwrap().push(text.to_string());
            Ok(Snowflake::new(1))
        }

        async fn react(
            &self,
            _channel: ChannelId,
            _message: MessageId,
            emoji: &str,
        ) -> ApiResult<()> {
            self.reactions.lock().unwrap().push(emoji.to_string());
            Ok(())
        }

        async fn edit_profile(&self, edit: ProfileEdit) -> ApiResult<()> {
            self.profile_edits.lock().unwrap().push(edit);
            Ok(())
        }

        async fn edit_member_nick(&self, guild: GuildId, nick: &str) -> ApiResult<()> {
            self.nick_edits
                .lock()
                .unwrap()
                .push((guild, nick.to_string()));
            Ok(())
        }

        async fn fetch_guild_member(&self, _guild: GuildId, user: UserId) -> ApiResult<Member> {
            Err(ApiError::NotFound(user.to_string()))
        }

        async fn list_guild_channels(&self, _guild: GuildId) -> ApiResult<Vec<ChannelInfo>> {
            Ok(Vec::new())
        }
    }

    const OWNER: u64 = 111;

    fn admin_router() -> (Router, Arc<RecordingClient>) {
        let guilds = Arc::new(GuildDirectory::new());
        guilds.apply_configs(HashMap::from([(
            Snowflake::new(1),
            json!({"name": "test", "roles": {"OWNER": [OWNER]}}),
        )]));

        let registry = Arc::new(ModuleRegistry::new());
        registry.register_source(Arc::new(AdminModule::new(Arc::clone(&guilds))));
        assert!(registry.load_all().is_empty());

        let client = Arc::new(RecordingClient::default());
        let router = Router::new(registry, guilds, client.clone());
        (router, client)
    }

    fn owner_message(text: &str) -> GatewayEvent {
        GatewayEvent::Message(MessageEvent {
            guild_id: Snowflake::new(1),
            channel_id: Snowflake::new(10),
            message_id: Snowflake::new(5000),
            author_id: Snowflake::new(OWNER),
            content: text.to_string(),
            attachments: Vec::new(),
        })
    }

    #[test]
    fn every_handler_is_owner_gated() {
        let module = AdminModule::new(Arc::new(GuildDirectory::new()));
        let decls = module.handlers().unwrap();

        assert_eq!(decls.len(), 6);
        let names: Vec<&str> = decls.iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            ["reload", "modules", "shutdown", "name", "nick", "save"]
        );
    }

    #[tokio::test]
    async fn reload_acknowledges_success_with_a_reaction() {
        let (router, client) = admin_router();

        router.dispatch(owner_message("reload")).await;
        router.drain().await;

        assert_eq!(*client.reactions.lock().unwrap(), ["\u{1F44C}"]);
        assert!(client.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn modules_lists_loaded_modules_in_a_code_block() {
        let (router, client) = admin_router();

        router.dispatch(owner_message("modules")).await;
        router.drain().await;

        let sends = client.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].starts_with("```"));
        assert!(
            sends[0].contains("admin: reload, modules, shutdown, name, nick, save"),
            "listing should show handlers in insertion order: {}",
            sends[0]
        );
    }

    #[tokio::test]
    async fn shutdown_replies_then_cancels_the_token() {
        let (router, client) = admin_router();
        let token = router.shutdown_token();

        router.dispatch(owner_message("shutdown")).await;
        router.drain().await;

        assert!(token.is_cancelled());
        assert_eq!(*client.sends.lock().unwrap(), ["Shutting down!"]);
    }

    #[tokio::test]
    async fn name_edits_the_profile_with_the_captured_argument() {
        let (router, client) = admin_router();

        router.dispatch(owner_message("name Ember Two")).await;
        router.drain().await;

        assert_eq!(
            *client.profile_edits.lock().unwrap(),
            [ProfileEdit::username("Ember Two")]
        );
    }

    #[tokio::test]
    async fn nick_edits_the_guild_nickname() {
        let (router, client) = admin_router();

        router.dispatch(owner_message("nick Emby")).await;
        router.drain().await;

        assert_eq!(
            *client.nick_edits.lock().unwrap(),
            [(Snowflake::new(1), "Emby".to_string())]
        );
    }

    #[tokio::test]
    async fn non_owner_commands_are_ignored_silently() {
        let (router, client) = admin_router();

        router
            .dispatch(GatewayEvent::Message(MessageEvent {
                guild_id: Snowflake::new(1),
                channel_id: Snowflake::new(10),
                message_id: Snowflake::new(5001),
                author_id: Snowflake::new(222),
                content: "shutdown".to_string(),
                attachments: Vec::new(),
            }))
            .await;
        router.drain().await;

        assert!(client.sends.lock().unwrap().is_empty());
        assert!(!router.shutdown_token().is_cancelled());
    }
}
