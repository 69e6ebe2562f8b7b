//! # Ember Framework
//!
//! Command routing and interaction components for chat bots.
//!
//! This layer provides:
//! - A route tree with name, regex and custom matchers, aliases and categories
//! - Middleware chains, including adapters for `tower` layers
//! - The [`Dispatcher`] that turns a message into a command invocation
//! - User-facing error classification and reporting
//! - One-shot event waiters
//! - Reaction-driven stateful embeds with paged lists
//! - Policy-engine authorization middleware and guild role lookups
//!
//! ```rust,ignore
//! let router = Route::new();
//! router.on("ping", async |ctx: Arc<Context>| {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! });
//!
//! let dispatcher = Dispatcher::new(router, gateway).prefix("!");
//! dispatcher.find_and_execute(&message).await?;
//! ```

pub mod context;
pub mod dispatcher;
pub mod embeds;
pub mod error;
pub mod handler;
pub mod matcher;
pub mod permissions;
pub mod policy;
pub mod report;
pub mod roles;
pub mod route;
pub mod split;
pub mod waiter;

pub use context::{Args, Context};
pub use dispatcher::{Dispatcher, PATH_SEPARATOR};
pub use embeds::{
    EmbedRegistry, EmbedSession, OptionHandler, PageId, PagingContext, PagingField, PagingPage,
    ReactionOutcome, StatefulEmbed, option_handler,
};
pub use error::{BoxError, CommandError, CommandResult, EmbedError, EmbedResult};
pub use handler::{
    BoxedHandler, BoxedMiddleware, FnMiddleware, Handler, HandlerService, LayerMiddleware,
    Middleware, Next, from_fn, into_handler,
};
pub use matcher::{MatchFn, Matcher};
pub use permissions::MissingPermission;
pub use policy::{EXECUTE_ACTION, PolicyEnforcer, policy_middleware};
pub use report::{BoxedTelemetry, ErrorReporter, TelemetrySink, normalize, user_message};
pub use roles::RoleResolver;
pub use route::Route;
pub use split::split_args;
pub use waiter::{Waiter, wait_for};
