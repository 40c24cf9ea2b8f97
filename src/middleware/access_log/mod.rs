//! Per-route request/response access logging.
//!
//! [`RequestLogInterceptor`] wraps a handler invocation. For routes its
//! [`RouteLogPolicy`] enables, it snapshots the request, times the handler,
//! and writes exactly one entry to its [`LogSink`] when the outcome is known:
//!
//! ```text
//!
//! <<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<
//! {
//!   "class": "UserController",
//!   "method": "get_user",
//!   "url": "GET - /users/1",
//!   "IP": "203.0.113.7",
//!   "time": "12ms",
//!   "request": { "params": { "id": "1" }, "query": {}, "body": null, "headers": { … } },
//!   "response": { "id": 1 }
//! }
//! >>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>
//! ```
//!
//! Failures carry `responseError` instead of `response`, have their opening
//! marker tagged `error`, and go through [`LogSink::error`] rather than the
//! route's channel.
//!
//! Logging never changes what the caller sees: the handler's value or error
//! is returned as is, a sink that panics is contained, and a skipped route
//! costs one policy lookup.
//!
//! The logged `IP` is the TCP peer. Behind a reverse proxy that overwrites
//! `x-forwarded-for`, enable [`RequestLogInterceptor::trust_proxy`].
//!
//! ```rust,no_run
//! use loupe::middleware::access_log::{PolicyTable, RequestLogInterceptor, Rule, TracingSink};
//! use loupe::{Group, Method, Request, Response, Router};
//!
//! # async fn get_user(_: Request) -> Response { Response::text("") }
//! let policy = PolicyTable::new().group("UserController", Rule::enabled().channel("users"));
//!
//! let app = Router::new()
//!     .group(Group::new("UserController").on(Method::GET, "/users/{id}", get_user))
//!     .layer(RequestLogInterceptor::new(TracingSink, policy));
//! ```

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::warn;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::router::RouteId;

mod policy;
mod record;
mod sink;

pub use policy::{DEFAULT_CHANNEL, LogDecision, PolicyTable, RouteLogPolicy, Rule};
pub use record::{RequestContext, RequestSnapshot};
pub use sink::{FileSink, LogSink, TracingSink};

use record::{ERROR_TAG, Payload};

/// Logs requests on the routes its policy enables.
///
/// Holds no per-request state; one instance serves any number of concurrent
/// requests. Cloning shares the sink and policy.
pub struct RequestLogInterceptor<S, P> {
    sink: Arc<S>,
    policy: Arc<P>,
    include_stack: bool,
    trust_proxy: bool,
}

impl<S, P> Clone for RequestLogInterceptor<S, P> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            policy: Arc::clone(&self.policy),
            include_stack: self.include_stack,
            trust_proxy: self.trust_proxy,
        }
    }
}

impl<S: LogSink, P: RouteLogPolicy> RequestLogInterceptor<S, P> {
    pub fn new(sink: S, policy: P) -> Self {
        Self {
            sink: Arc::new(sink),
            policy: Arc::new(policy),
            include_stack: false,
            trust_proxy: false,
        }
    }

    /// Ask the sink to attach a stack trace to failure entries. Off by default.
    pub fn include_stack(mut self, include_stack: bool) -> Self {
        self.include_stack = include_stack;
        self
    }

    /// Log the client address from `x-forwarded-for` / `x-real-ip` instead
    /// of the TCP peer. Off by default: only enable it when every request
    /// comes through a proxy that sets those headers itself.
    pub fn trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    /// Runs `next(req)` and, if `route` is logged, writes one entry for its
    /// outcome. The outcome is returned unchanged either way.
    ///
    /// If the returned future is dropped before `next` completes, nothing
    /// is written.
    pub async fn intercept<T, E, F, Fut>(&self, route: &Arc<RouteId>, req: Request, next: F) -> Result<T, E>
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let channel = match self.policy.decide(route) {
            LogDecision::Skip => return next(req).await,
            LogDecision::Log { channel } => channel,
        };

        let context = RequestContext::capture(route, &req, self.trust_proxy);
        let start = Instant::now();
        let outcome = next(req).await;
        let time = format!("{}ms", start.elapsed().as_millis());

        let written = panic::catch_unwind(AssertUnwindSafe(|| match &outcome {
            Ok(value) => {
                let entry = context.record(time, Payload::Response(record::response_value(value)));
                self.sink.write(&channel, &record::frame("", &record::render(&entry)));
            }
            Err(err) => {
                let entry = context.record(time, Payload::Error(err.to_string()));
                self.sink.error(&record::frame(ERROR_TAG, &record::render(&entry)), self.include_stack);
            }
        }));
        if let Err(cause) = written {
            warn!(route = %route, "access log entry lost, writing it panicked: {}", panic_message(&*cause));
        }
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic.downcast_ref::<&str>().copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl<S: LogSink, P: RouteLogPolicy> Middleware for RequestLogInterceptor<S, P> {
    fn call(&self, route: Arc<RouteId>, req: Request, next: Next) -> BoxFuture {
        let this = self.clone();
        Box::pin(async move { this.intercept(&route, req, |req| next.run(req)).await })
    }
}
