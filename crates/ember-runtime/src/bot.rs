//! Wires the dispatcher and embed registry to a gateway.
//!
//! ```rust,ignore
//! use ember_runtime::{Bot, config::load_config};
//!
//! let config = load_config()?;
//! let bot = Bot::builder(gateway).config(&config).build()?;
//!
//! bot.router().on("ping", async |ctx: Arc<Context>| {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! });
//! ```
//!
//! Once built, the bot listens on the gateway's event hub until
//! [`Bot::shutdown`] is called.

use std::fmt;
use std::sync::Arc;

use ember_core::{BoxedGateway, Message, Ready, Subscription};
use ember_framework::{
    BoxedTelemetry, CommandError, Dispatcher, EmbedRegistry, ErrorReporter, Route, TelemetrySink,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::{BotSettings, EmberConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};

/// Builder for [`Bot`].
pub struct BotBuilder {
    gateway: BoxedGateway,
    settings: BotSettings,
    router: Route,
    telemetry: Option<BoxedTelemetry>,
}

impl BotBuilder {
    fn new(gateway: BoxedGateway) -> Self {
        Self {
            gateway,
            settings: BotSettings::default(),
            router: Route::new(),
            telemetry: None,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.prefix = prefix.into();
        self
    }

    /// Whether reaction-driven embeds are tracked. On by default.
    pub fn stateful_embeds(mut self, enabled: bool) -> Self {
        self.settings.stateful_embeds = enabled;
        self
    }

    /// Sink for errors the classifier does not recognise. Without one such
    /// errors panic the command task.
    pub fn telemetry<T: TelemetrySink>(mut self, sink: T) -> Self {
        self.telemetry = Some(Arc::new(sink));
        self
    }

    /// Takes the bot settings from a loaded configuration.
    pub fn config(mut self, config: &EmberConfig) -> Self {
        self.settings = config.bot.clone();
        self
    }

    /// Uses an existing route tree instead of a fresh one.
    pub fn router(mut self, router: Route) -> Self {
        self.router = router;
        self
    }

    /// Creates the dispatcher and subscribes to the gateway's events.
    ///
    /// Must be called inside a Tokio runtime; commands run as tasks on it.
    pub fn build(self) -> RuntimeResult<Bot> {
        validate_config(&EmberConfig {
            bot: self.settings.clone(),
            ..Default::default()
        })?;
        let runtime = Handle::try_current().map_err(|_| RuntimeError::NoRuntime)?;

        let mut reporter = ErrorReporter::new();
        if let Some(sink) = self.telemetry {
            reporter.set_telemetry(sink);
        }
        let dispatcher = Arc::new(
            Dispatcher::new(self.router, Arc::clone(&self.gateway))
                .prefix(self.settings.prefix.clone())
                .reporter(reporter),
        );

        let hub = self.gateway.events();
        let mut subscriptions = Vec::new();

        let commands = Arc::clone(&dispatcher);
        let bot_id = self.gateway.current_user().id;
        subscriptions.push(hub.on::<Message, _>(move |message| {
            if message.author.id == bot_id {
                return;
            }
            let dispatcher = Arc::clone(&commands);
            let message = message.clone();
            runtime.spawn(async move {
                match dispatcher.find_and_execute(&message).await {
                    Ok(()) | Err(CommandError::RouteNotFound) => {}
                    Err(err) => warn!(message = %message.id, error = %err, "Dispatch failed"),
                }
            });
        }));

        subscriptions.push(hub.on::<Ready, _>(|ready| {
            info!(
                user = %ready.user.username,
                guilds = ready.guilds.len(),
                "{} is now ready",
                ready.user.username
            );
        }));

        let embeds = self.settings.stateful_embeds.then(|| {
            let registry = EmbedRegistry::new(Arc::clone(&self.gateway));
            subscriptions.extend(registry.attach(hub));
            registry
        });

        debug!(
            prefix = %self.settings.prefix,
            stateful_embeds = embeds.is_some(),
            listeners = subscriptions.len(),
            "Bot built"
        );

        Ok(Bot {
            gateway: self.gateway,
            dispatcher,
            embeds,
            subscriptions: Mutex::new(subscriptions),
        })
    }
}

/// A command bot listening on one gateway.
pub struct Bot {
    gateway: BoxedGateway,
    dispatcher: Arc<Dispatcher>,
    embeds: Option<EmbedRegistry>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Bot {
    pub fn builder(gateway: BoxedGateway) -> BotBuilder {
        BotBuilder::new(gateway)
    }

    /// The root of the command tree. Routes can be added at any time.
    pub fn router(&self) -> &Route {
        self.dispatcher.router()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The embed registry, if stateful embeds are enabled.
    pub fn embeds(&self) -> Option<&EmbedRegistry> {
        self.embeds.as_ref()
    }

    pub fn gateway(&self) -> &BoxedGateway {
        &self.gateway
    }

    pub fn prefix(&self) -> &str {
        self.dispatcher.get_prefix()
    }

    /// Whether the bot still listens for events.
    pub fn is_running(&self) -> bool {
        !self.subscriptions.lock().is_empty()
    }

    /// Stops listening for events and forgets every embed session.
    ///
    /// Commands already running finish normally. Calling it again does nothing.
    pub fn shutdown(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        if subscriptions.is_empty() {
            return;
        }
        let detached = subscriptions.iter().filter(|s| s.detach()).count();
        if let Some(embeds) = &self.embeds {
            embeds.clear();
        }
        info!(listeners = detached, "Bot shut down");
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("prefix", &self.prefix())
            .field("embeds", &self.embeds)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ember_core::testing::MockGateway;
    use ember_core::{ChannelId, Gateway, GatewayEvent, MessageId, User};
    use ember_framework::{CommandResult, Context};

    const BOT: u64 = 99;

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    fn message(author: u64, content: &str) -> GatewayEvent {
        GatewayEvent::MessageCreate(Message {
            id: MessageId(1),
            channel_id: ChannelId(3),
            guild_id: None,
            author: User::new(author, "someone"),
            content: content.to_string(),
            embeds: Vec::new(),
        })
    }

    fn counted(bot: &Bot, name: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        bot.router().on(name, move |_ctx: Arc<Context>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                CommandResult::Ok(())
            }
        });
        count
    }

    #[tokio::test]
    async fn test_message_runs_command() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let bot = Bot::builder(gateway.clone()).prefix("!").build().unwrap();
        let count = counted(&bot, "ping");

        gateway.emit(message(5, "!ping"));
        gateway.emit(message(5, "-ping"));
        gateway.emit(message(5, "!unknown"));
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_own_messages_are_ignored() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let bot = Bot::builder(gateway.clone()).build().unwrap();
        let count = counted(&bot, "ping");

        gateway.emit(message(BOT, "-ping"));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_config_settings_apply() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let mut config = EmberConfig::default();
        config.bot.prefix = "?".into();
        config.bot.stateful_embeds = false;

        let bot = Bot::builder(gateway.clone()).config(&config).build().unwrap();
        assert_eq!(bot.prefix(), "?");
        assert!(bot.embeds().is_none());
        assert_eq!(gateway.events().listener_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_prefix_is_rejected() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let result = Bot::builder(gateway).prefix("a b").build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_build_needs_runtime() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let result = Bot::builder(gateway).build();
        assert!(matches!(result, Err(RuntimeError::NoRuntime)));
    }

    async fn boom(_ctx: Arc<Context>) -> CommandResult {
        Err(CommandError::unexpected("database unavailable"))
    }

    #[tokio::test]
    async fn test_unexpected_errors_reach_telemetry() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        let bot = Bot::builder(gateway.clone())
            .telemetry(move |err: &CommandError, ctx: &Context| {
                sink.lock().push((err.to_string(), ctx.route().name()));
            })
            .build()
            .unwrap();
        bot.router().on("boom", boom);

        gateway.emit(message(5, "-boom"));
        settle().await;

        assert_eq!(captured.lock().len(), 1);
        assert_eq!(captured.lock()[0].1, "boom");
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_detaches_everything() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let bot = Bot::builder(gateway.clone()).build().unwrap();
        let count = counted(&bot, "ping");
        assert!(bot.is_running());
        assert_eq!(gateway.events().listener_count(), 4);

        bot.shutdown();
        bot.shutdown();
        assert!(!bot.is_running());
        assert_eq!(gateway.events().listener_count(), 0);

        gateway.emit(message(5, "-ping"));
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
