//! # Ember
//!
//! A modular, hot-reloadable chat automation agent for Rust.
//!
//! ## Overview
//!
//! Ember routes chat platform events through a registry of pattern-matched
//! command handlers, with per-guild configuration, role-based
//! authorization, and durable per-guild storage.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────┐     ┌───────────────────────────────────┐
//! │ ChatClient │────▶│ Router │────▶│ Module "admin"  (handler tasks)   │
//! │ (platform) │     │        │────▶│ Module "chat"   (handler tasks)   │
//! └────────────┘     └────────┘────▶│ Module ...      (handler tasks)   │
//!                        │          └───────────────────────────────────┘
//!                        ▼
//!                 ┌──────────────┐
//!                 │ GuildContext │  config · roles · channels · storage
//!                 └──────────────┘
//! ```
//!
//! - **ChatClient**: the platform capability seam; transports implement it
//! - **Router**: matches commands and spawns every authorized handler
//! - **Modules**: hot-reloadable groups of handlers, loaded transactionally
//! - **GuildContext**: isolated per-guild state with durable storage
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = EmberRuntime::new(client)?;
//!
//!     runtime.register_module(Arc::new(
//!         StaticModule::new("chat").handler(HandlerDecl::new(
//!             "ping",
//!             "^ping$",
//!             |inv| async move {
//!                 inv.reply("pong").await?;
//!                 Ok(())
//!             },
//!         )),
//!     ));
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub use ember_core as core;
pub use ember_framework as framework;
pub use ember_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use ember::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use ember_runtime::{EmberConfig, EmberRuntime};

    // Module system - primary unit of command handling
    pub use ember_framework::{
        HandlerDecl, HandlerError, HandlerResult, Invocation, ModuleSource, StaticModule, action,
    };

    // Guild state - for use inside handlers
    pub use ember_framework::{ChannelRef, GuildContext};

    // Platform types
    pub use ember_core::{
        ChannelId, ChatClient, GatewayEvent, GuildId, MessageEvent, MessageId, ProfileEdit, Role,
        Snowflake, UserId,
    };
}
