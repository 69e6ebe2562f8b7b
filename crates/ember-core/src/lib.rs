//! # Ember Core
//!
//! The platform model and collaborator interfaces shared by every Ember crate.
//!
//! The command framework does not speak any wire protocol itself. It consumes
//! a [`Gateway`], which delivers typed [`GatewayEvent`]s through an
//! [`EventHub`] and performs message, embed and reaction operations on the
//! bot's behalf.
//!
//! ```text
//! ┌──────────┐  GatewayEvent   ┌──────────┐  callbacks   ┌────────────┐
//! │ Gateway  │────────────────▶│ EventHub │─────────────▶│ Dispatcher │
//! │ (client) │◀────────────────┤          │─────────────▶│ Embeds     │
//! └──────────┘  send / edit /  └──────────┘─────────────▶│ Waiters    │
//!               react                                    └────────────┘
//! ```

pub mod embed;
pub mod error;
pub mod event;
pub mod gateway;
pub mod id;
pub mod model;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use embed::{Embed, EmbedField, color};
pub use error::{ApiError, ApiResult, RestError, UNKNOWN_EMOJI_CODE};
pub use event::{EventCallback, EventHub, EventKind, GatewayEvent, Subscription, TypedEvent};
pub use gateway::{
    BoxedGateway, Gateway, HISTORY_LIMIT_MAX, HistoryAnchor, HistoryQuery, MessageEdit, MessageSend,
};
pub use id::{ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};
pub use model::{Channel, Emoji, Guild, Member, Message, MessageDelete, ReactionAdd, Ready, User};
