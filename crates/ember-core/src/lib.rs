//! # ember-core
//!
//! Platform-facing leaf types for the Ember chat agent: snowflake
//! identifiers, permission roles, inbound gateway events, and the
//! [`ChatClient`] capability trait through which all platform side effects
//! flow.
//!
//! This crate contains no dispatch or persistence logic; that lives in
//! `ember-framework`.

pub mod client;
pub mod error;
pub mod event;
pub mod types;

pub use client::{BoxedClient, ChatClient, ProfileEdit};
pub use error::{ApiError, ApiResult};
pub use event::{ChannelInfo, GatewayEvent, Member, MessageEvent};
pub use types::{ChannelId, GuildId, MessageId, Role, Snowflake, UnknownRole, UserId};
