//! The gateway collaborator.
//!
//! A [`Gateway`] is whatever connects the framework to the chat platform: it
//! delivers events through its [`EventHub`], performs REST calls, and keeps a
//! state cache. The framework never talks to the network directly.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embed::Embed;
use crate::error::ApiResult;
use crate::event::EventHub;
use crate::id::{ChannelId, GuildId, MessageId, UserId};
use crate::model::{Channel, Emoji, Guild, Member, Message, User};

/// Payload for creating a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageSend {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl MessageSend {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embed: None,
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: String::new(),
            embed: Some(embed),
        }
    }
}

/// Payload for editing a message. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl MessageEdit {
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
        }
    }
}

/// Most messages one history request returns.
pub const HISTORY_LIMIT_MAX: usize = 100;

/// Where a history request starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryAnchor {
    /// The newest messages of the channel.
    #[default]
    Latest,
    /// Messages older than the given one.
    Before(MessageId),
    /// Messages newer than the given one.
    After(MessageId),
    /// Messages on both sides of the given one.
    Around(MessageId),
}

/// A request for part of a channel's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: usize,
    pub anchor: HistoryAnchor,
}

impl HistoryQuery {
    /// Up to `limit` of the newest messages, clamped to `1..=HISTORY_LIMIT_MAX`.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, HISTORY_LIMIT_MAX),
            anchor: HistoryAnchor::Latest,
        }
    }

    pub fn anchor(mut self, anchor: HistoryAnchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Event delivery, REST operations and state cache of a connected bot.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// The bot's own user.
    fn current_user(&self) -> User;

    /// The hub this gateway publishes its events to.
    fn events(&self) -> &EventHub;

    async fn send_message(&self, channel: ChannelId, message: MessageSend) -> ApiResult<Message>;

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        edit: MessageEdit,
    ) -> ApiResult<Message>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> ApiResult<()>;

    async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> ApiResult<Message>;

    /// Messages of `channel` selected by `query`, newest first.
    async fn fetch_messages(
        &self,
        channel: ChannelId,
        query: HistoryQuery,
    ) -> ApiResult<Vec<Message>>;

    /// Adds a reaction as the bot.
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &Emoji,
    ) -> ApiResult<()>;

    /// Removes `user`'s reaction.
    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &Emoji,
        user: UserId,
    ) -> ApiResult<()>;

    async fn remove_all_reactions(&self, channel: ChannelId, message: MessageId) -> ApiResult<()>;

    // State cache lookups. These never hit the network.

    fn cached_guild(&self, guild: GuildId) -> Option<Guild>;

    fn cached_channel(&self, channel: ChannelId) -> Option<Channel>;

    fn cached_member(&self, guild: GuildId, user: UserId) -> Option<Member>;

    // REST lookups, used when the cache misses.

    async fn fetch_guild(&self, guild: GuildId) -> ApiResult<Guild>;

    async fn fetch_channel(&self, channel: ChannelId) -> ApiResult<Channel>;

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> ApiResult<Member>;
}

/// A shared gateway handle.
pub type BoxedGateway = Arc<dyn Gateway>;
