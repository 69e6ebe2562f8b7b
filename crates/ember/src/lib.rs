//! # Ember
//!
//! A command framework for chat bots: a tree of routes with middleware, a
//! dispatcher with user-facing error reporting, event waiters and
//! reaction-driven interactive embeds.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  MessageCreate   ┌────────────┐  find_full   ┌────────────┐
//! │ Gateway  │─────────────────▶│ Dispatcher │─────────────▶│ Route tree │──▶ middleware ──▶ handler
//! │          │  ReactionAdd     ├────────────┤              └────────────┘
//! │          │─────────────────▶│ Embeds     │──▶ option handlers
//! │          │  any             ├────────────┤
//! │          │─────────────────▶│ Waiters    │──▶ suspended handlers
//! └──────────┘                  └────────────┘
//! ```
//!
//! - **Core** (`ember-core`): platform model, the `Gateway` trait and the event hub
//! - **Framework** (`ember-framework`): routing, dispatch, errors, waiters, embeds
//! - **Runtime** (`ember-runtime`): configuration, logging and the `Bot` wiring
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember::prelude::*;
//!
//! async fn ping(ctx: Arc<Context>) -> CommandResult {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let bot = Bot::builder(gateway).config(&config).build()?;
//!     bot.router().on("ping", ping).desc("Replies with pong");
//!
//!     tokio::signal::ctrl_c().await?;
//!     bot.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `testing`: the recording `MockGateway`

pub use ember_core as core;
pub use ember_framework as framework;
pub use ember_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use ember::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime - main entry point
    pub use ember_runtime::config::{EmberConfig, load_config};
    pub use ember_runtime::{Bot, logging};

    // Routing and handlers
    pub use ember_framework::{
        Args, CommandError, CommandResult, Context, Matcher, Middleware, Next, Route, from_fn,
    };

    // Interaction
    pub use ember_framework::{
        EmbedSession, PagingContext, PagingField, PagingPage, StatefulEmbed, option_handler,
        wait_for,
    };
    pub use ember_framework::{PolicyEnforcer, RoleResolver, policy_middleware};

    // Platform model
    pub use ember_core::{
        ChannelId, Embed, Emoji, Gateway, GuildId, HistoryAnchor, Message, MessageId, ReactionAdd,
        RoleId, UserId,
    };
}
