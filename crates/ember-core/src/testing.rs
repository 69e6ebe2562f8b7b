//! An in-memory [`Gateway`] that records every call.
//!
//! Enabled with the `testing` feature. Sent messages get sequential ids
//! starting at 1000; deleting a message publishes the matching
//! `MessageDelete` event the way a live gateway would echo it back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ApiError, ApiResult, RestError};
use crate::event::{EventHub, GatewayEvent};
use crate::gateway::{Gateway, HistoryAnchor, HistoryQuery, MessageEdit, MessageSend};
use crate::id::{ChannelId, GuildId, MessageId, UserId};
use crate::model::{Channel, Emoji, Guild, Member, Message, MessageDelete, User};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        channel: ChannelId,
        message: MessageSend,
    },
    Edit {
        channel: ChannelId,
        message: MessageId,
        edit: MessageEdit,
    },
    Delete {
        channel: ChannelId,
        message: MessageId,
    },
    AddReaction {
        channel: ChannelId,
        message: MessageId,
        emoji: Emoji,
    },
    RemoveReaction {
        channel: ChannelId,
        message: MessageId,
        emoji: Emoji,
        user: UserId,
    },
    RemoveAllReactions {
        channel: ChannelId,
        message: MessageId,
    },
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    messages: HashMap<MessageId, Message>,
    live_reactions: HashMap<MessageId, Vec<Emoji>>,
    reaction_delay: Option<Duration>,
    send_failure: Option<ApiError>,
    reaction_failures: HashMap<String, ApiError>,
    cached_guilds: HashMap<GuildId, Guild>,
    remote_guilds: HashMap<GuildId, Guild>,
    cached_channels: HashMap<ChannelId, Channel>,
    cached_members: HashMap<(GuildId, UserId), Member>,
    remote_members: HashMap<(GuildId, UserId), Member>,
}

/// Recording gateway for tests.
pub struct MockGateway {
    user: User,
    hub: EventHub,
    next_message: AtomicU64,
    state: Mutex<State>,
}

impl MockGateway {
    /// Creates a gateway whose own user has id `bot_id`.
    pub fn new(bot_id: u64) -> Self {
        let mut user = User::new(bot_id, "ember");
        user.bot = true;
        Self {
            user,
            hub: EventHub::new(),
            next_message: AtomicU64::new(1000),
            state: Mutex::new(State::default()),
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Payloads of every `send_message` call, in order.
    pub fn sent(&self) -> Vec<MessageSend> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Send { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Emojis the bot reacted with on `message`, in order.
    pub fn reactions_on(&self, message: MessageId) -> Vec<Emoji> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::AddReaction {
                    message: m, emoji, ..
                } if *m == message => Some(emoji.clone()),
                _ => None,
            })
            .collect()
    }

    /// The bot's reactions currently on `message`, after removals.
    pub fn live_reactions(&self, message: MessageId) -> Vec<Emoji> {
        self.state
            .lock()
            .live_reactions
            .get(&message)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every `add_reaction` call take `delay` before it lands.
    pub fn delay_reactions(&self, delay: Duration) {
        self.state.lock().reaction_delay = Some(delay);
    }

    /// Current stored state of a message the bot sent.
    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.state.lock().messages.get(&id).cloned()
    }

    /// Stores a message as if it had been posted, for history lookups.
    pub fn insert_message(&self, message: Message) {
        self.state.lock().messages.insert(message.id, message);
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Makes every subsequent `send_message` fail with `error`.
    pub fn fail_sends(&self, error: ApiError) {
        self.state.lock().send_failure = Some(error);
    }

    /// Makes `add_reaction` fail with `error` for this emoji.
    pub fn fail_reaction(&self, emoji: &Emoji, error: ApiError) {
        self.state
            .lock()
            .reaction_failures
            .insert(emoji.api_name(), error);
    }

    pub fn cache_guild(&self, guild: Guild) {
        self.state.lock().cached_guilds.insert(guild.id, guild);
    }

    /// Makes `guild` reachable through REST only.
    pub fn remote_guild(&self, guild: Guild) {
        self.state.lock().remote_guilds.insert(guild.id, guild);
    }

    pub fn cache_channel(&self, channel: Channel) {
        self.state.lock().cached_channels.insert(channel.id, channel);
    }

    pub fn cache_member(&self, member: Member) {
        self.state
            .lock()
            .cached_members
            .insert((member.guild_id, member.user.id), member);
    }

    pub fn remote_member(&self, member: Member) {
        self.state
            .lock()
            .remote_members
            .insert((member.guild_id, member.user.id), member);
    }

    /// Publishes `event` on the gateway's hub.
    pub fn emit(&self, event: GatewayEvent) -> usize {
        self.hub.publish(&event)
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }

    fn not_found(method: &str, path: String) -> ApiError {
        RestError::new(404, method, path)
            .with_code(10003, "Unknown")
            .into()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn current_user(&self) -> User {
        self.user.clone()
    }

    fn events(&self) -> &EventHub {
        &self.hub
    }

    async fn send_message(&self, channel: ChannelId, message: MessageSend) -> ApiResult<Message> {
        let mut state = self.state.lock();
        state.calls.push(Call::Send {
            channel,
            message: message.clone(),
        });
        if let Some(err) = &state.send_failure {
            return Err(err.clone());
        }
        let id = MessageId(self.next_message.fetch_add(1, Ordering::Relaxed));
        let sent = Message {
            id,
            channel_id: channel,
            guild_id: None,
            author: self.user.clone(),
            content: message.content,
            embeds: message.embed.into_iter().collect(),
        };
        state.messages.insert(id, sent.clone());
        Ok(sent)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        edit: MessageEdit,
    ) -> ApiResult<Message> {
        let mut state = self.state.lock();
        state.calls.push(Call::Edit {
            channel,
            message,
            edit: edit.clone(),
        });
        let Some(stored) = state.messages.get_mut(&message) else {
            return Err(Self::not_found(
                "PATCH",
                format!("/api/v10/channels/{channel}/messages/{message}"),
            ));
        };
        if let Some(content) = edit.content {
            stored.content = content;
        }
        if let Some(embed) = edit.embed {
            stored.embeds = vec![embed];
        }
        Ok(stored.clone())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> ApiResult<()> {
        {
            let mut state = self.state.lock();
            state.calls.push(Call::Delete { channel, message });
            state.messages.remove(&message);
        }
        self.hub.publish(&GatewayEvent::MessageDelete(MessageDelete {
            id: message,
            channel_id: channel,
            guild_id: None,
        }));
        Ok(())
    }

    async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> ApiResult<Message> {
        self.state.lock().messages.get(&message).cloned().ok_or_else(|| {
            Self::not_found("GET", format!("/api/v10/channels/{channel}/messages/{message}"))
        })
    }

    async fn fetch_messages(
        &self,
        channel: ChannelId,
        query: HistoryQuery,
    ) -> ApiResult<Vec<Message>> {
        let state = self.state.lock();
        let mut history: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.channel_id == channel)
            .cloned()
            .collect();

        match query.anchor {
            HistoryAnchor::Latest => history.sort_by(|a, b| b.id.cmp(&a.id)),
            HistoryAnchor::Before(anchor) => {
                history.retain(|m| m.id < anchor);
                history.sort_by(|a, b| b.id.cmp(&a.id));
            }
            HistoryAnchor::After(anchor) => {
                history.retain(|m| m.id > anchor);
                history.sort_by_key(|m| m.id);
            }
            HistoryAnchor::Around(anchor) => {
                history.sort_by_key(|m| m.id.0.abs_diff(anchor.0));
            }
        }
        history.truncate(query.limit);
        history.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(history)
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &Emoji,
    ) -> ApiResult<()> {
        let delay = self.state.lock().reaction_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some(err) = state.reaction_failures.get(&emoji.api_name()) {
            return Err(err.clone());
        }
        state.calls.push(Call::AddReaction {
            channel,
            message,
            emoji: emoji.clone(),
        });
        state
            .live_reactions
            .entry(message)
            .or_default()
            .push(emoji.clone());
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &Emoji,
        user: UserId,
    ) -> ApiResult<()> {
        self.record(Call::RemoveReaction {
            channel,
            message,
            emoji: emoji.clone(),
            user,
        });
        Ok(())
    }

    async fn remove_all_reactions(&self, channel: ChannelId, message: MessageId) -> ApiResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::RemoveAllReactions { channel, message });
        state.live_reactions.remove(&message);
        Ok(())
    }

    fn cached_guild(&self, guild: GuildId) -> Option<Guild> {
        self.state.lock().cached_guilds.get(&guild).cloned()
    }

    fn cached_channel(&self, channel: ChannelId) -> Option<Channel> {
        self.state.lock().cached_channels.get(&channel).cloned()
    }

    fn cached_member(&self, guild: GuildId, user: UserId) -> Option<Member> {
        self.state.lock().cached_members.get(&(guild, user)).cloned()
    }

    async fn fetch_guild(&self, guild: GuildId) -> ApiResult<Guild> {
        self.state
            .lock()
            .remote_guilds
            .get(&guild)
            .cloned()
            .ok_or_else(|| Self::not_found("GET", format!("/api/v10/guilds/{guild}")))
    }

    async fn fetch_channel(&self, channel: ChannelId) -> ApiResult<Channel> {
        Err(Self::not_found("GET", format!("/api/v10/channels/{channel}")))
    }

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> ApiResult<Member> {
        self.state
            .lock()
            .remote_members
            .get(&(guild, user))
            .cloned()
            .ok_or_else(|| {
                Self::not_found("GET", format!("/api/v10/guilds/{guild}/members/{user}"))
            })
    }
}
