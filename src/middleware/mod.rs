//! Middleware layer.
//!
//! Middleware wraps every routed request and is the right place for
//! cross-cutting concerns. A middleware receives the route identity, the
//! request, and a [`Next`] continuation; it decides whether and how to call
//! `next.run(req)` and returns the outcome.
//!
//! Built-in middleware:
//! - [`access_log`]: per-route request/response logging with timing

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::router::RouteId;

pub mod access_log;

/// A layer in the router's middleware chain.
///
/// The returned future must be `'static`, so clone whatever state the call
/// needs out of `&self` before building it.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, route: Arc<RouteId>, req: Request, next: Next) -> BoxFuture;
}

/// The rest of the chain: remaining middleware, then the handler.
pub struct Next {
    route: Arc<RouteId>,
    handler: BoxedHandler,
    chain: Arc<[Arc<dyn Middleware>]>,
    index: usize,
}

impl Next {
    pub(crate) fn new(
        route: Arc<RouteId>,
        handler: BoxedHandler,
        chain: Arc<[Arc<dyn Middleware>]>,
    ) -> Self {
        Self { route, handler, chain, index: 0 }
    }

    /// Invoke the next layer, or the handler once the chain is exhausted.
    pub fn run(self, req: Request) -> BoxFuture {
        match self.chain.get(self.index).cloned() {
            Some(layer) => {
                let route = Arc::clone(&self.route);
                layer.call(route, req, Next { index: self.index + 1, ..self })
            }
            None => self.handler.call(req),
        }
    }
}
