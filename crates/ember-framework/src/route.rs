//! The command route tree.
//!
//! A [`Route`] is a cheap, cloneable handle to one node of the tree. The root
//! is created with [`Route::new`] and commands are declared on it:
//!
//! ```rust,ignore
//! let router = Route::new();
//! router.use_middleware(log_calls);
//!
//! router.on("help", help).alias("h").desc("Lists every command");
//!
//! let role = router.node("role").cat("moderation");
//! role.on("add", role_add).usage("role add <user> <role>");
//! role.on("remove", role_remove);
//!
//! router.set_default(&router.on("hello", greet));
//! ```
//!
//! Sibling order is registration order, and lookups return the first sibling
//! whose matcher accepts the token. Category and middleware set on a node are
//! copied into children created afterwards; children created earlier keep
//! what they had.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{CommandError, CommandResult};
use crate::handler::{BoxedHandler, BoxedMiddleware, Handler, LayerMiddleware, Middleware, into_handler};
use crate::matcher::Matcher;

#[derive(Default)]
struct RouteData {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: String,
    category: String,
    matcher: Matcher,
    handler: Option<BoxedHandler>,
    routes: Vec<Route>,
    default: Option<Route>,
    parent: Weak<RwLock<RouteData>>,
    middleware: Vec<BoxedMiddleware>,
}

/// A node of the command tree.
///
/// Cloning yields another handle to the same node. Equality is identity.
#[derive(Clone, Default)]
pub struct Route {
    inner: Arc<RwLock<RouteData>>,
}

impl Route {
    /// Creates an empty root.
    pub fn new() -> Self {
        Self::default()
    }

    fn from_data(data: RouteData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a child matched by name or alias.
    ///
    /// If a sibling already matches `name`, that sibling is returned
    /// unchanged and `handler` is dropped.
    pub fn on<H: Handler>(&self, name: impl Into<String>, handler: H) -> Route {
        self.register(name.into(), Matcher::Name, Some(into_handler(handler)))
    }

    /// Registers a child with a custom matcher. Idempotent like [`on`](Self::on).
    pub fn on_match<H: Handler>(&self, name: impl Into<String>, matcher: Matcher, handler: H) -> Route {
        self.register(name.into(), matcher, Some(into_handler(handler)))
    }

    /// Registers a child without a handler, used to group subcommands.
    pub fn node(&self, name: impl Into<String>) -> Route {
        self.register(name.into(), Matcher::Name, None)
    }

    fn register(&self, name: String, matcher: Matcher, handler: Option<BoxedHandler>) -> Route {
        if let Some(existing) = self.find(&name) {
            debug!(route = %name, "Route already registered, keeping existing");
            return existing;
        }

        let (category, middleware) = {
            let data = self.inner.read();
            (data.category.clone(), data.middleware.clone())
        };
        let handler = handler.map(|h| apply_middleware(&middleware, h));
        let route = Route::from_data(RouteData {
            name,
            category,
            matcher,
            handler,
            middleware,
            ..Default::default()
        });

        if let Err(err) = self.add_route(route.clone()) {
            warn!(route = %route.name(), error = %err, "Concurrent registration won the race");
        }
        route
    }

    /// Attaches an existing route as a child.
    ///
    /// Fails with [`CommandError::RouteExists`] if a sibling already matches
    /// the route's name.
    pub fn add_route(&self, route: Route) -> CommandResult {
        let name = route.name();
        if self.find(&name).is_some() {
            return Err(CommandError::RouteExists);
        }

        route.inner.write().parent = Arc::downgrade(&self.inner);
        self.inner.write().routes.push(route);
        debug!(route = %name, parent = %self.name(), "Registered route");
        Ok(())
    }

    /// Detaches a direct child.
    pub fn remove_route(&self, route: &Route) -> CommandResult {
        let removed = {
            let mut data = self.inner.write();
            let index = data
                .routes
                .iter()
                .position(|r| r == route)
                .ok_or(CommandError::RouteNotFound)?;
            data.routes.remove(index)
        };
        removed.inner.write().parent = Weak::new();
        debug!(route = %removed.name(), parent = %self.name(), "Removed route");
        Ok(())
    }

    /// Declares a batch of routes on a scratch tree, then moves its children
    /// here.
    ///
    /// Category and middleware set on the scratch tree inside `f` apply only
    /// to the routes declared there.
    pub fn group<F: FnOnce(&Route)>(&self, f: F) -> Route {
        let scratch = Route::new();
        f(&scratch);
        for child in scratch.routes() {
            if let Err(err) = self.add_route(child.clone()) {
                warn!(route = %child.name(), error = %err, "Skipping grouped route");
            }
        }
        self.clone()
    }

    /// Appends middleware applied to children registered after this call.
    pub fn use_middleware<M: Middleware>(&self, middleware: M) -> Route {
        self.inner.write().middleware.push(Arc::new(middleware));
        self.clone()
    }

    /// Appends a tower [`Layer`](tower_layer::Layer) as middleware.
    ///
    /// ```rust,ignore
    /// router.layer(tower::util::MapRequestLayer::new(|ctx: Arc<Context>| {
    ///     ctx.set("started", std::time::Instant::now());
    ///     ctx
    /// }));
    /// ```
    pub fn layer<L>(&self, layer: L) -> Route
    where
        LayerMiddleware<L>: Middleware,
    {
        self.use_middleware(LayerMiddleware::new(layer))
    }

    /// Sets the route run when a message is only a mention of the bot.
    pub fn set_default(&self, route: &Route) -> Route {
        self.inner.write().default = Some(route.clone());
        self.clone()
    }

    /// Wraps `handler` in this route's middleware exactly as registration would.
    pub fn build_test_handler<H: Handler>(&self, handler: H) -> BoxedHandler {
        let middleware = self.inner.read().middleware.clone();
        apply_middleware(&middleware, into_handler(handler))
    }

    // ========================================================================
    // Metadata builders
    // ========================================================================

    pub fn desc(&self, description: impl Into<String>) -> Route {
        self.inner.write().description = description.into();
        self.clone()
    }

    /// Sets the usage string appended to invalid-argument reports.
    pub fn usage(&self, usage: impl Into<String>) -> Route {
        self.inner.write().usage = usage.into();
        self.clone()
    }

    pub fn cat(&self, category: impl Into<String>) -> Route {
        self.inner.write().category = category.into();
        self.clone()
    }

    pub fn alias<I, S>(&self, aliases: I) -> Route
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .write()
            .aliases
            .extend(aliases.into_iter().map(Into::into));
        self.clone()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Whether this route's matcher accepts `input`.
    pub fn matches(&self, input: &str) -> bool {
        let data = self.inner.read();
        data.matcher.matches(input, &data.name, &data.aliases)
    }

    /// The first child whose matcher accepts `name`.
    pub fn find(&self, name: &str) -> Option<Route> {
        self.inner
            .read()
            .routes
            .iter()
            .find(|r| r.matches(name))
            .cloned()
    }

    /// Walks `path` as deep as successive tokens keep matching.
    ///
    /// Returns the deepest route reached and how many tokens were consumed.
    /// With zero tokens consumed the returned route is `self`.
    pub fn find_full<S: AsRef<str>>(&self, path: &[S]) -> (Route, usize) {
        let mut current = self.clone();
        let mut depth = 0;
        for token in path {
            match current.find(token.as_ref()) {
                Some(next) => {
                    current = next;
                    depth += 1;
                }
                None => break,
            }
        }
        (current, depth)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> String {
        self.inner.read().name.clone()
    }

    pub fn aliases(&self) -> Vec<String> {
        self.inner.read().aliases.clone()
    }

    pub fn description(&self) -> String {
        self.inner.read().description.clone()
    }

    /// The usage string, empty when unset.
    pub fn usage_string(&self) -> String {
        self.inner.read().usage.clone()
    }

    pub fn category(&self) -> String {
        self.inner.read().category.clone()
    }

    /// The handler with middleware applied, if any.
    pub fn handler(&self) -> Option<BoxedHandler> {
        self.inner.read().handler.clone()
    }

    /// Children in registration order.
    pub fn routes(&self) -> Vec<Route> {
        self.inner.read().routes.clone()
    }

    pub fn parent(&self) -> Option<Route> {
        self.inner
            .read()
            .parent
            .upgrade()
            .map(|inner| Route { inner })
    }

    pub fn default_route(&self) -> Option<Route> {
        self.inner.read().default.clone()
    }
}

/// Wraps so the first middleware registered is the outermost.
fn apply_middleware(middleware: &[BoxedMiddleware], handler: BoxedHandler) -> BoxedHandler {
    middleware.iter().rev().fold(handler, |h, m| m.wrap(h))
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Route {}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.read();
        f.debug_struct("Route")
            .field("name", &data.name)
            .field("aliases", &data.aliases)
            .field("category", &data.category)
            .field("matcher", &data.matcher)
            .field("has_handler", &data.handler.is_some())
            .field("routes", &data.routes.len())
            .finish_non_exhaustive()
    }
}
