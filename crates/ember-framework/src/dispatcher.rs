//! Message dispatch.
//!
//! The [`Dispatcher`] turns one inbound message into at most one handler
//! invocation:
//!
//! 1. A message that is exactly a mention of the bot runs the root's default
//!    route, if one is set, with a single empty argument.
//! 2. Otherwise the message must start with the prefix, `<@BOT> ` or
//!    `<@!BOT> `. The rest is split into arguments.
//! 3. The deepest route along the arguments is resolved. The consumed tokens
//!    are joined into one leading argument so handlers can tell the command
//!    apart from its free arguments.
//! 4. The handler runs under panic recovery. Errors and panics are handed to
//!    the [`ErrorReporter`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{Instrument, debug, info_span, trace, warn};

use ember_core::{BoxedGateway, Message};

use crate::context::{Args, Context};
use crate::error::{CommandError, CommandResult};
use crate::report::{ErrorReporter, TelemetrySink};
use crate::route::Route;
use crate::split::split_args;

/// Joins the matched command path in the first argument.
pub const PATH_SEPARATOR: &str = " ";

/// Routes messages to handlers.
#[derive(Clone)]
pub struct Dispatcher {
    router: Route,
    gateway: BoxedGateway,
    prefix: String,
    reporter: ErrorReporter,
}

impl Dispatcher {
    /// Creates a dispatcher with the default `-` prefix and no telemetry.
    pub fn new(router: Route, gateway: BoxedGateway) -> Self {
        Self {
            router,
            gateway,
            prefix: "-".to_string(),
            reporter: ErrorReporter::new(),
        }
    }

    /// Sets the textual prefix. An empty prefix leaves only mentions.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn telemetry<T: TelemetrySink>(mut self, sink: T) -> Self {
        self.reporter = self.reporter.with_telemetry(sink);
        self
    }

    pub fn reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn router(&self) -> &Route {
        &self.router
    }

    pub fn get_prefix(&self) -> &str {
        &self.prefix
    }

    /// Finds the route for `message` and runs it.
    ///
    /// Returns [`CommandError::RouteNotFound`] when the message is not a
    /// command; that case is not reported to the user. Handler errors are
    /// reported and do not surface here.
    ///
    /// # Panics
    ///
    /// Panics when a handler fails unexpectedly and no telemetry sink is
    /// configured.
    pub async fn find_and_execute(&self, message: &Message) -> CommandResult {
        let bot = self.gateway.current_user().id;
        let mention = bot.mention();
        let nick_mention = bot.nick_mention();

        if (message.content == mention || message.content == nick_mention)
            && let Some(default) = self.router.default_route()
        {
            trace!(message = %message.id, "Bare mention, running default route");
            return self
                .execute(default, message.clone(), Args::new(vec![String::new()]))
                .await;
        }

        let mention_prefix = format!("{mention} ");
        let nick_prefix = format!("{nick_mention} ");
        let command = [self.prefix.as_str(), mention_prefix.as_str(), nick_prefix.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .find_map(|p| message.content.strip_prefix(p))
            .ok_or(CommandError::RouteNotFound)?;

        let mut args = split_args(command);
        let (route, depth) = self.router.find_full(args.as_slice());
        if depth == 0 {
            return Err(CommandError::RouteNotFound);
        }

        let path: Vec<String> = args.drain(..depth).collect();
        args.insert(0, path.join(PATH_SEPARATOR));
        self.execute(route, message.clone(), Args::new(args)).await
    }

    async fn execute(&self, route: Route, message: Message, args: Args) -> CommandResult {
        let Some(handler) = route.handler() else {
            debug!(route = %route.name(), "Matched route has no handler");
            return Err(CommandError::RouteNotFound);
        };

        let ctx = Arc::new(Context::new(
            Arc::clone(&self.gateway),
            message,
            args,
            route,
        ));
        let span = info_span!(
            "command",
            route = %ctx.route().name(),
            author = %ctx.author().id,
            channel = %ctx.channel_id(),
        );

        async {
            debug!(args = ?ctx.args(), "Executing command");
            let call_ctx = Arc::clone(&ctx);
            let outcome = AssertUnwindSafe(async move { handler.call(call_ctx).await })
                .catch_unwind()
                .await;

            let result = outcome.unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                warn!(panic = %message, "Command handler panicked");
                Err(CommandError::Panicked(message))
            });

            if let Err(err) = result {
                self.reporter.report(&ctx, err).await;
            }
        }
        .instrument(span)
        .await;

        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::testing::MockGateway;
    use ember_core::{ApiError, ChannelId, MessageId, RestError, User};
    use parking_lot::Mutex;

    const BOT: u64 = 42;

    fn message(content: &str) -> Message {
        Message {
            id: MessageId(1),
            channel_id: ChannelId(7),
            guild_id: None,
            author: User::new(5u64, "alice"),
            content: content.to_string(),
            embeds: Vec::new(),
        }
    }

    /// A router whose handlers record the args they were called with.
    fn recording_router(log: &Arc<Mutex<Vec<Vec<String>>>>) -> Route {
        let root = Route::new();
        let record = |log: Arc<Mutex<Vec<Vec<String>>>>| {
            move |ctx: Arc<Context>| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push(ctx.args().to_vec());
                    Ok(())
                }
            }
        };
        root.on("help", record(Arc::clone(log))).alias(["h"]);
        let role = root.node("role");
        role.on("add", record(Arc::clone(log)));
        let hello = root.on("hello", record(Arc::clone(log)));
        root.set_default(&hello);
        root
    }

    fn setup() -> (Arc<MockGateway>, Dispatcher, Arc<Mutex<Vec<Vec<String>>>>) {
        let gateway = Arc::new(MockGateway::new(BOT));
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(recording_router(&log), gateway.clone());
        (gateway, dispatcher, log)
    }

    fn last_report(gateway: &MockGateway) -> String {
        let sent = gateway.sent();
        let embed = sent.last().and_then(|m| m.embed.clone()).unwrap();
        assert_eq!(embed.color, Some(ember_core::color::RED));
        embed.description.unwrap()
    }

    #[tokio::test]
    async fn test_name_and_alias_resolve_to_same_route() {
        let (_, dispatcher, log) = setup();
        dispatcher.find_and_execute(&message("-help")).await.unwrap();
        dispatcher.find_and_execute(&message("-h me")).await.unwrap();
        assert_eq!(
            *log.lock(),
            vec![vec!["help".to_string()], vec!["h".to_string(), "me".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_subcommand_path_is_joined() {
        let (_, dispatcher, log) = setup();
        dispatcher
            .find_and_execute(&message("-role add bob \"the mod\""))
            .await
            .unwrap();
        assert_eq!(log.lock()[0], vec!["role add", "bob", "the mod"]);
    }

    #[tokio::test]
    async fn test_bare_mention_runs_default_route() {
        let (gateway, dispatcher, log) = setup();
        dispatcher.find_and_execute(&message("<@42>")).await.unwrap();
        dispatcher.find_and_execute(&message("<@!42>")).await.unwrap();
        assert_eq!(*log.lock(), vec![vec![String::new()], vec![String::new()]]);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_bare_mention_without_default_is_not_a_command() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let root = Route::new();
        root.on("help", |_ctx: Arc<Context>| async { Ok(()) });
        let dispatcher = Dispatcher::new(root, gateway);
        assert!(matches!(
            dispatcher.find_and_execute(&message("<@42>")).await,
            Err(CommandError::RouteNotFound)
        ));
    }

    #[tokio::test]
    async fn test_mention_prefixes() {
        let (_, dispatcher, log) = setup();
        dispatcher.find_and_execute(&message("<@42> help")).await.unwrap();
        dispatcher.find_and_execute(&message("<@!42> h")).await.unwrap();
        assert_eq!(log.lock().len(), 2);

        let other_bot = dispatcher.find_and_execute(&message("<@43> help")).await;
        assert!(matches!(other_bot, Err(CommandError::RouteNotFound)));
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let (_, dispatcher, log) = setup();
        let dispatcher = dispatcher.prefix("!!");
        assert!(dispatcher.find_and_execute(&message("-help")).await.is_err());
        dispatcher.find_and_execute(&message("!!help")).await.unwrap();
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_is_not_reported() {
        let (gateway, dispatcher, log) = setup();
        for content in ["hello", "-", "-nope", "-  "] {
            let result = dispatcher.find_and_execute(&message(content)).await;
            assert!(matches!(result, Err(CommandError::RouteNotFound)), "{content}");
        }
        assert!(log.lock().is_empty());
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_group_node_without_handler_is_not_found() {
        let (gateway, dispatcher, _) = setup();
        let result = dispatcher.find_and_execute(&message("-role")).await;
        assert!(matches!(result, Err(CommandError::RouteNotFound)));
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_argument_reports_usage() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let root = Route::new();
        root.on("ban", |_ctx: Arc<Context>| async { Err(CommandError::InvalidArgument) })
            .usage("ban <user>");
        let dispatcher = Dispatcher::new(root, gateway.clone());

        dispatcher.find_and_execute(&message("-ban")).await.unwrap();
        assert!(last_report(&gateway).ends_with("`ban <user>`"));
    }

    #[tokio::test]
    async fn test_forbidden_api_error_names_permission() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let root = Route::new();
        root.on("purge", |_ctx: Arc<Context>| async {
            Err(ApiError::from(RestError::new(
                403,
                "DELETE",
                "/api/v10/channels/7/messages/3",
            ))
            .into())
        });
        let dispatcher = Dispatcher::new(root, gateway.clone());

        dispatcher.find_and_execute(&message("-purge")).await.unwrap();
        assert!(last_report(&gateway).ends_with("permission(s): Manage Messages"));
    }

    #[tokio::test]
    async fn test_duplicate_route_is_reported_without_telemetry() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let root = Route::new();
        root.on("stats", |_ctx: Arc<Context>| async { Ok(()) });
        let tree = root.clone();
        root.on("install", move |_ctx: Arc<Context>| {
            let tree = tree.clone();
            async move {
                let scratch = Route::new();
                let stats = scratch.on("stats", |_ctx: Arc<Context>| async { Ok(()) });
                tree.add_route(stats)
            }
        });
        let dispatcher = Dispatcher::new(root, gateway.clone());

        dispatcher.find_and_execute(&message("-install")).await.unwrap();
        assert_eq!(last_report(&gateway), "This command is already registered");
    }

    fn unexpected_router() -> Route {
        let root = Route::new();
        root.on("fail", |_ctx: Arc<Context>| async {
            Err(CommandError::unexpected("database unavailable"))
        });
        root.on("panic", |_ctx: Arc<Context>| async {
            if true {
                panic!("handler exploded");
            }
            Ok(())
        });
        root
    }

    #[tokio::test]
    async fn test_panic_and_error_share_reporting_path() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let captured = Arc::clone(&captured);
            move |err: &CommandError, _ctx: &Context| captured.lock().push(err.to_string())
        };
        let dispatcher = Dispatcher::new(unexpected_router(), gateway.clone()).telemetry(sink);

        dispatcher.find_and_execute(&message("-fail")).await.unwrap();
        let after_error = last_report(&gateway);
        dispatcher.find_and_execute(&message("-panic")).await.unwrap();
        let after_panic = last_report(&gateway);

        assert_eq!(after_error, after_panic);
        assert!(after_panic.starts_with("An unknown error has occurred"));
        assert_eq!(
            *captured.lock(),
            vec![
                "database unavailable".to_string(),
                "handler panicked: handler exploded".to_string()
            ]
        );

        // The dispatcher keeps working after a panic.
        dispatcher.find_and_execute(&message("-fail")).await.unwrap();
        assert_eq!(captured.lock().len(), 3);
    }

    #[tokio::test]
    #[should_panic(expected = "unhandled command error")]
    async fn test_unexpected_error_without_telemetry_panics() {
        let gateway = Arc::new(MockGateway::new(BOT));
        let dispatcher = Dispatcher::new(unexpected_router(), gateway);
        let _ = dispatcher.find_and_execute(&message("-fail")).await;
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("static");
        let other: Box<dyn Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "static");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
