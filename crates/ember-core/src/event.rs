//! Inbound gateway events.
//!
//! The transport collaborator decodes the platform's wire protocol into
//! these events and feeds them to the router in delivery order. The core
//! never sees the wire format itself.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, GuildId, MessageId, UserId};

/// A channel as reported by the platform.
///
/// `platform_name` is the name shown in the platform UI; it is unrelated to
/// the friendly names bound in guild configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// The channel snowflake.
    pub id: ChannelId,
    /// The name the platform displays for this channel, if any.
    pub platform_name: Option<String>,
}

/// A guild member as returned by member lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member's identity snowflake.
    pub user_id: UserId,
    /// The name displayed for this member in the guild.
    pub display_name: String,
}

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// The guild the message originated from.
    pub guild_id: GuildId,
    /// The channel the message was posted in.
    pub channel_id: ChannelId,
    /// The message snowflake, used for reactions.
    pub message_id: MessageId,
    /// The identity of the sender.
    pub author_id: UserId,
    /// Raw message text.
    pub content: String,
    /// URLs of any attachments on the message.
    pub attachments: Vec<String>,
}

/// Events delivered by the platform connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A chat message was posted.
    Message(MessageEvent),
    /// The agent joined or observed a guild; carries the full channel set.
    GuildAvailable {
        /// The guild that became available.
        guild_id: GuildId,
        /// All channels currently in the guild.
        channels: Vec<ChannelInfo>,
    },
    /// A channel was created in a known guild.
    ChannelCreate {
        /// The owning guild.
        guild_id: GuildId,
        /// The new channel.
        channel: ChannelInfo,
    },
    /// A channel was deleted from a known guild.
    ChannelDelete {
        /// The owning guild.
        guild_id: GuildId,
        /// The removed channel's snowflake.
        channel_id: ChannelId,
    },
}

impl GatewayEvent {
    /// A short name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            GatewayEvent::Message(_) => "message",
            GatewayEvent::GuildAvailable { .. } => "guild_available",
            GatewayEvent::ChannelCreate { .. } => "channel_create",
            GatewayEvent::ChannelDelete { .. } => "channel_delete",
        }
    }

    /// The guild this event belongs to.
    pub fn guild_id(&self) -> GuildId {
        match self {
            GatewayEvent::Message(msg) => msg.guild_id,
            GatewayEvent::GuildAvailable { guild_id, .. }
            | GatewayEvent::ChannelCreate { guild_id, .. }
            | GatewayEvent::ChannelDelete { guild_id, .. } => *guild_id,
        }
    }
}
