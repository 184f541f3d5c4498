//! The abstract platform capability interface.
//!
//! [`ChatClient`] is the seam between the runtime core and the chat
//! platform's transport: the core consumes events from [`receive`] and
//! performs all side effects through the other methods. The real transport
//! (connection management, event decoding, rate limiting) lives outside
//! this workspace; tests supply mock implementations.
//!
//! [`receive`]: ChatClient::receive

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ApiResult;
use crate::event::{ChannelInfo, GatewayEvent, Member};
use crate::types::{ChannelId, GuildId, MessageId, UserId};

/// Fields of the bot's own profile that can be edited.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    /// New global display name.
    pub username: Option<String>,
    /// New avatar image bytes.
    pub avatar: Option<Vec<u8>>,
}

impl ProfileEdit {
    /// An edit that only changes the display name.
    pub fn username(name: impl Into<String>) -> Self {
        Self {
            username: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Capability interface to the chat platform.
///
/// Implementations must be cheap to share; the core holds one
/// [`BoxedClient`] and clones the `Arc` into every handler invocation.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the inbound event stream.
    ///
    /// The stream is lazy and effectively infinite; it is not restartable —
    /// an event, once consumed, is gone. The stream ending means the
    /// connection is irrecoverably lost.
    fn receive(&self) -> BoxStream<'static, GatewayEvent>;

    /// Sends a text message to a channel.
    async fn send(&self, channel: ChannelId, text: &str) -> ApiResult<MessageId>;

    /// Adds an emoji reaction to a message.
    async fn react(&self, channel: ChannelId, message: MessageId, emoji: &str) -> ApiResult<()>;

    /// Edits the bot's own profile.
    async fn edit_profile(&self, edit: ProfileEdit) -> ApiResult<()>;

    /// Sets the bot's nickname within one guild.
    async fn edit_member_nick(&self, guild: GuildId, nick: &str) -> ApiResult<()>;

    /// Looks up a guild member.
    async fn fetch_guild_member(&self, guild: GuildId, user: UserId) -> ApiResult<Member>;

    /// Lists all channels of a guild.
    async fn list_guild_channels(&self, guild: GuildId) -> ApiResult<Vec<ChannelInfo>>;
}

/// A shared, type-erased chat client.
pub type BoxedClient = Arc<dyn ChatClient>;
