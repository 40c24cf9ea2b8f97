//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Every route carries a
//! [`RouteId`], the identity middleware uses to decide what to do with it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Group name for routes registered directly on the [`Router`].
pub const DEFAULT_GROUP: &str = "default";

// ── RouteId ───────────────────────────────────────────────────────────────────

/// Identity of a registered route: the handler's name and the group it
/// belongs to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RouteId {
    pub group: String,
    pub handler: String,
}

impl RouteId {
    pub fn new(group: impl Into<String>, handler: impl Into<String>) -> Self {
        Self { group: group.into(), handler: handler.into() }
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.group, self.handler)
    }
}

// ── Group ─────────────────────────────────────────────────────────────────────

/// A named set of routes, mounted with [`Router::group`].
///
/// Groups are the unit a log policy can switch on as a whole:
///
/// ```rust,no_run
/// # use loupe::{Group, Method, Request, Response, Router};
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// Router::new().group(
///     Group::new("UserController")
///         .on(Method::GET,  "/users/{id}", get_user)
///         .on(Method::POST, "/users",      create_user),
/// );
/// ```
pub struct Group {
    name: String,
    routes: Vec<(Method, String, String, BoxedHandler)>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), routes: Vec::new() }
    }

    /// Register a handler, named after the handler function.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        let name = handler.name();
        self.on_named(method, path, name, handler)
    }

    /// Register a handler under an explicit name (useful for closures).
    pub fn on_named(
        mut self,
        method: Method,
        path: &str,
        name: &str,
        handler: impl Handler,
    ) -> Self {
        self.routes.push((method, path.to_owned(), name.to_owned(), handler.into_boxed_handler()));
        self
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Route {
    id: Arc<RouteId>,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup and pass it to [`Server::serve`](crate::Server::serve).
/// Every builder method returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    middleware: Arc<[Arc<dyn Middleware>]>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), middleware: Vec::new().into() }
    }

    /// Register a handler in the [`DEFAULT_GROUP`].
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is malformed or conflicts with an existing route.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        let name = handler.name();
        self.add(method, path, RouteId::new(DEFAULT_GROUP, name), handler.into_boxed_handler())
    }

    /// Mount every route of `group`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Router::on`].
    pub fn group(self, group: Group) -> Self {
        let Group { name, routes } = group;
        routes.into_iter().fold(self, |router, (method, path, handler_name, handler)| {
            router.add(method, &path, RouteId::new(name.clone(), handler_name), handler)
        })
    }

    /// Append `middleware` to the chain. The first layer added is the
    /// outermost: it sees the request first and the outcome last.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        let mut chain = self.middleware.to_vec();
        chain.push(Arc::new(middleware));
        self.middleware = chain.into();
        self
    }

    fn add(mut self, method: Method, path: &str, id: RouteId, handler: BoxedHandler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Route { id: Arc::new(id), handler })
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<RouteId>, BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let route = matched.value.clone();
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((route.id, route.handler, params))
    }

    /// Runs `req` through the middleware chain and into `handler`.
    pub(crate) fn call(&self, route: Arc<RouteId>, handler: BoxedHandler, req: Request) -> BoxFuture {
        Next::new(route, handler, Arc::clone(&self.middleware)).run(req)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
