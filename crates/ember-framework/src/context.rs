//! The per-invocation command context.
//!
//! One [`Context`] is built for every matched command and dropped once the
//! handler returns. It carries the resolved route, the triggering message,
//! the parsed arguments and a keyed variable map that middleware can use to
//! hand data to the handlers it wraps.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use parking_lot::RwLock;

use ember_core::{
    ApiResult, BoxedGateway, Channel, ChannelId, Embed, Guild, GuildId, HistoryAnchor,
    HistoryQuery, Member, Message, MessageEdit, MessageId, MessageSend, TypedEvent, User, UserId,
};

use crate::error::CommandError;
use crate::route::Route;
use crate::waiter::{Waiter, wait_for};

// ============================================================================
// Args
// ============================================================================

/// Command arguments.
///
/// The first element is the matched command path joined with
/// [`PATH_SEPARATOR`](crate::dispatcher::PATH_SEPARATOR); the rest are the free
/// arguments that followed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args(Vec<String>);

impl Args {
    pub fn new(args: Vec<String>) -> Self {
        Self(args)
    }

    /// The command path as typed, or `""` for a bare mention.
    pub fn command(&self) -> &str {
        self.0.first().map_or("", String::as_str)
    }

    /// Arguments after the command path.
    pub fn rest(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    /// The `index`-th free argument (0-based, after the command path).
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.rest().get(index).map(String::as_str)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for Args {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<String>> for Args {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Everything a handler needs to know about one command invocation.
pub struct Context {
    route: Route,
    message: Message,
    gateway: BoxedGateway,
    args: Args,
    vars: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
}

impl Context {
    pub fn new(gateway: BoxedGateway, message: Message, args: Args, route: Route) -> Self {
        Self {
            route,
            message,
            gateway,
            args,
            vars: RwLock::new(HashMap::new()),
        }
    }

    /// The route that matched.
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// The message that triggered the command.
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn gateway(&self) -> &BoxedGateway {
        &self.gateway
    }

    /// The user that sent the message.
    pub fn author(&self) -> &User {
        &self.message.author
    }

    pub fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }

    /// The guild the message came from, if any.
    pub fn guild_id(&self) -> Option<GuildId> {
        self.message.guild_id
    }

    // ─── Variables ────────────────────────────────────────────────────────────

    /// Stores a variable, replacing any previous value under `key`.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.vars.write().insert(key.into(), Box::new(value));
    }

    /// Returns a clone of the variable under `key` if it has type `T`.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.vars
            .read()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.vars.read().contains_key(key)
    }

    /// Removes and returns the variable under `key` if it has type `T`.
    pub fn take<T: 'static>(&self, key: &str) -> Option<T> {
        let mut vars = self.vars.write();
        if !vars.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        vars.remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    // ─── Messaging ────────────────────────────────────────────────────────────

    /// Sends a plain text message to the invoking channel.
    pub async fn reply(&self, content: impl Into<String>) -> ApiResult<Message> {
        self.send_message(MessageSend::text(content)).await
    }

    /// Sends an embed to the invoking channel.
    pub async fn reply_embed(&self, embed: Embed) -> ApiResult<Message> {
        self.send_message(MessageSend::embed(embed)).await
    }

    pub async fn send_message(&self, message: MessageSend) -> ApiResult<Message> {
        self.gateway.send_message(self.channel_id(), message).await
    }

    /// Edits a message in the invoking channel.
    pub async fn edit_message(&self, message: MessageId, edit: MessageEdit) -> ApiResult<Message> {
        self.gateway
            .edit_message(self.channel_id(), message, edit)
            .await
    }

    /// Fetches a message from the invoking channel.
    pub async fn fetch_message(&self, message: MessageId) -> ApiResult<Message> {
        self.gateway.fetch_message(self.channel_id(), message).await
    }

    /// Fetches up to `limit` messages of the invoking channel, newest first.
    ///
    /// `limit` is clamped to [`HISTORY_LIMIT_MAX`](ember_core::HISTORY_LIMIT_MAX).
    pub async fn get_history(&self, limit: usize, anchor: HistoryAnchor) -> ApiResult<Vec<Message>> {
        let query = HistoryQuery::new(limit).anchor(anchor);
        self.gateway.fetch_messages(self.channel_id(), query).await
    }

    /// Waits for a later event matching `predicate` on this context's gateway.
    pub fn wait_for<E, P>(&self, predicate: P) -> Waiter<E>
    where
        E: TypedEvent,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        wait_for(self.gateway.events(), predicate)
    }

    // ─── Lookups ──────────────────────────────────────────────────────────────

    /// The guild the command ran in; fails with [`CommandError::NotAGuild`] in DMs.
    pub async fn guild(&self) -> Result<Guild, CommandError> {
        let id = self.guild_id().ok_or(CommandError::NotAGuild)?;
        Ok(self.get_guild(id).await?)
    }

    /// The invoking channel, from the state cache or REST.
    pub async fn channel(&self) -> ApiResult<Channel> {
        self.get_channel(self.channel_id()).await
    }

    /// Looks up a guild in the state cache, falling back to REST.
    pub async fn get_guild(&self, guild: GuildId) -> ApiResult<Guild> {
        match self.gateway.cached_guild(guild) {
            Some(g) => Ok(g),
            None => self.gateway.fetch_guild(guild).await,
        }
    }

    /// Looks up a channel in the state cache, falling back to REST.
    pub async fn get_channel(&self, channel: ChannelId) -> ApiResult<Channel> {
        match self.gateway.cached_channel(channel) {
            Some(c) => Ok(c),
            None => self.gateway.fetch_channel(channel).await,
        }
    }

    /// Looks up a guild member in the state cache, falling back to REST.
    pub async fn get_member(&self, guild: GuildId, user: UserId) -> ApiResult<Member> {
        match self.gateway.cached_member(guild, user) {
            Some(m) => Ok(m),
            None => self.gateway.fetch_member(guild, user).await,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("route", &self.route.name())
            .field("message", &self.message.id)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::testing::MockGateway;
    use ember_core::{Guild, User};
    use std::sync::Arc;

    fn context(gateway: Arc<MockGateway>, guild: Option<u64>) -> Context {
        let message = Message {
            id: MessageId(1),
            channel_id: ChannelId(10),
            guild_id: guild.map(GuildId),
            author: User::new(5u64, "alice"),
            content: "-cmd a b".to_string(),
            embeds: Vec::new(),
        };
        let args = Args::new(vec!["cmd".into(), "a".into(), "b".into()]);
        Context::new(gateway, message, args, Route::new())
    }

    #[test]
    fn test_args_accessors() {
        let args = Args::new(vec!["role add".into(), "x".into()]);
        assert_eq!(args.command(), "role add");
        assert_eq!(args.rest(), ["x".to_string()]);
        assert_eq!(args.arg(0), Some("x"));
        assert_eq!(args.arg(1), None);
        assert_eq!(Args::default().command(), "");
        assert!(Args::default().rest().is_empty());
    }

    #[test]
    fn test_vars_are_typed() {
        let ctx = context(Arc::new(MockGateway::new(1)), None);
        ctx.set("count", 3usize);
        assert_eq!(ctx.get::<usize>("count"), Some(3));
        assert_eq!(ctx.get::<String>("count"), None);
        assert!(ctx.has("count"));
        assert_eq!(ctx.take::<String>("count"), None);
        assert_eq!(ctx.take::<usize>("count"), Some(3));
        assert!(!ctx.has("count"));
    }

    #[tokio::test]
    async fn test_guild_requires_guild_context() {
        let ctx = context(Arc::new(MockGateway::new(1)), None);
        assert!(matches!(ctx.guild().await, Err(CommandError::NotAGuild)));
    }

    #[tokio::test]
    async fn test_guild_falls_back_to_rest() {
        let gateway = Arc::new(MockGateway::new(1));
        gateway.remote_guild(Guild::new(7u64, "remote", 5u64));
        let ctx = context(Arc::clone(&gateway), Some(7));
        assert_eq!(ctx.guild().await.unwrap().name, "remote");

        gateway.cache_guild(Guild::new(7u64, "cached", 5u64));
        assert_eq!(ctx.guild().await.unwrap().name, "cached");
    }

    #[tokio::test]
    async fn test_history_reads_invoking_channel() {
        let gateway = Arc::new(MockGateway::new(1));
        let posted = |id: u64, channel: u64| Message {
            id: MessageId(id),
            channel_id: ChannelId(channel),
            guild_id: None,
            author: User::new(5u64, "alice"),
            content: format!("message {id}"),
            embeds: Vec::new(),
        };
        for id in 100..=105 {
            gateway.insert_message(posted(id, 10));
        }
        gateway.insert_message(posted(200, 11));
        let ctx = context(Arc::clone(&gateway), None);

        let ids = |history: Vec<Message>| history.into_iter().map(|m| m.id.0).collect::<Vec<_>>();
        assert_eq!(
            ids(ctx.get_history(3, HistoryAnchor::Latest).await.unwrap()),
            vec![105, 104, 103]
        );
        assert_eq!(
            ids(ctx.get_history(10, HistoryAnchor::Before(MessageId(103))).await.unwrap()),
            vec![102, 101, 100]
        );
        assert_eq!(
            ids(ctx.get_history(2, HistoryAnchor::After(MessageId(101))).await.unwrap()),
            vec![103, 102]
        );
        assert_eq!(
            ids(ctx.get_history(3, HistoryAnchor::Around(MessageId(103))).await.unwrap()),
            vec![104, 103, 102]
        );
        assert_eq!(ctx.get_history(0, HistoryAnchor::Latest).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_targets_invoking_channel() {
        let gateway = Arc::new(MockGateway::new(1));
        let ctx = context(Arc::clone(&gateway), None);
        let sent = ctx.reply("hello").await.unwrap();
        assert_eq!(sent.channel_id, ChannelId(10));
        assert_eq!(gateway.sent()[0].content, "hello");
    }
}
