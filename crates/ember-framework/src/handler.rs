//! Handlers and middleware.
//!
//! A handler is any async function taking the invocation [`Context`] and
//! returning a [`CommandResult`]:
//!
//! ```rust,ignore
//! async fn ping(ctx: Arc<Context>) -> CommandResult {
//!     ctx.reply("Pong!").await?;
//!     Ok(())
//! }
//! ```
//!
//! Middleware turns one handler into another. It is applied when a route is
//! registered, so the wrapping cost is paid once and not per message. Three
//! forms are accepted:
//!
//! - a plain `Fn(BoxedHandler) -> BoxedHandler`,
//! - [`from_fn`], for `async fn(ctx, next)` style middleware,
//! - any tower [`Layer`] over [`HandlerService`], through
//!   [`Route::layer`](crate::Route::layer).

use std::future::Future;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::future::BoxFuture;
use tower::{Service, ServiceExt};
use tower_layer::Layer;

use crate::context::Context;
use crate::error::{BoxError, CommandError, CommandResult};

// ============================================================================
// Handler
// ============================================================================

/// A command handler.
///
/// Implemented for every `Fn(Arc<Context>) -> impl Future<Output = CommandResult>`.
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler.
    fn call(&self, ctx: Arc<Context>) -> BoxFuture<'static, CommandResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    fn call(&self, ctx: Arc<Context>) -> BoxFuture<'static, CommandResult> {
        Box::pin(self(ctx))
    }
}

/// A type-erased, shareable handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Erases a handler's type.
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

// ============================================================================
// Middleware
// ============================================================================

/// Wraps one handler into another.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// A type-erased, shareable middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the chain, as seen from a [`from_fn`] middleware.
#[derive(Clone)]
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Calls the wrapped handler.
    pub async fn run(self, ctx: Arc<Context>) -> CommandResult {
        self.inner.call(ctx).await
    }
}

/// Middleware built from an `async fn(ctx, next)`.
#[derive(Clone)]
pub struct FnMiddleware<F> {
    f: F,
}

/// Builds middleware from an async function that decides whether and how to
/// call the rest of the chain.
///
/// ```rust,ignore
/// let log_calls = from_fn(|ctx: Arc<Context>, next: Next| async move {
///     tracing::info!(route = %ctx.route().name(), "Running command");
///     next.run(ctx).await
/// });
/// router.use_middleware(log_calls);
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Arc<Context>, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    FnMiddleware { f }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Arc<Context>, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let f = self.f.clone();
        into_handler(move |ctx: Arc<Context>| {
            f(
                ctx,
                Next {
                    inner: Arc::clone(&next),
                },
            )
        })
    }
}

// ============================================================================
// Tower interop
// ============================================================================

/// A tower [`Service`] view of a handler, so tower layers can wrap it.
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxedHandler,
}

impl HandlerService {
    pub fn new(handler: BoxedHandler) -> Self {
        Self { handler }
    }
}

impl Service<Arc<Context>> for HandlerService {
    type Response = ();
    type Error = CommandError;
    type Future = BoxFuture<'static, CommandResult>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<Context>) -> Self::Future {
        self.handler.call(ctx)
    }
}

/// Middleware that applies a tower [`Layer`] to the handler.
#[derive(Clone)]
pub struct LayerMiddleware<L> {
    layer: L,
}

impl<L> LayerMiddleware<L> {
    pub fn new(layer: L) -> Self {
        Self { layer }
    }
}

impl<L, S> Middleware for LayerMiddleware<L>
where
    L: Layer<HandlerService, Service = S> + Send + Sync + 'static,
    S: Service<Arc<Context>, Response = ()> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let service = self.layer.layer(HandlerService::new(next));
        into_handler(move |ctx: Arc<Context>| {
            let service = service.clone();
            async move { service.oneshot(ctx).await.map_err(recover_command_error) }
        })
    }
}

/// Layers box their errors; unbox ours so classification still sees the sentinel.
fn recover_command_error(err: impl Into<BoxError>) -> CommandError {
    match err.into().downcast::<CommandError>() {
        Ok(err) => *err,
        Err(other) => CommandError::Unexpected(other),
    }
}
