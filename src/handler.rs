//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`, so every handler is hidden behind the common
//! `dyn ErasedHandler` interface:
//!
//! ```text
//! async fn get_user(req: Request) -> Result<Response, Failure> { … }
//!        ↓ router.on(Method::GET, "/users/{id}", get_user)
//! get_user.into_boxed_handler()                    ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_user))                    ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { get_user(req).await.into_outcome() })  ← BoxFuture
//! ```
//!
//! Erased handlers resolve to an [`Outcome`] rather than a bare
//! [`Response`]: middleware has to tell a handler's success from its
//! failure, and that distinction would be gone once both are rendered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::failure::Failure;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// The terminal result of one handler invocation.
pub type Outcome = Result<Response, Failure>;

/// A heap-allocated, type-erased future that resolves to an [`Outcome`].
///
/// `Send + 'static` let tokio move the future across threads safely.
pub type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Anything a handler may return.
///
/// Every [`IntoResponse`] is a success. `Result<R, E>` is a success or a
/// [`Failure`], so handlers can use `?`.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl<R: IntoResponse> IntoOutcome for R {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl<R: IntoResponse, E: Into<Failure>> IntoOutcome for Result<R, E> {
    fn into_outcome(self) -> Outcome {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    /// The name the handler is known by in the access log.
    ///
    /// For a function item this is its bare name (`get_user`), taken from
    /// the type name; closures all read as `{{closure}}`, so name those
    /// explicitly with [`Group::on_named`](crate::Group::on_named).
    #[doc(hidden)]
    fn name(&self) -> &'static str;

    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn name(&self) -> &'static str {
        short_name(std::any::type_name::<F>())
    }

    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// `my_app::users::get_user` → `get_user`, `my_app::list<alloc::string::String>` → `list`.
fn short_name(type_name: &'static str) -> &'static str {
    let path = type_name.split('<').next().unwrap_or(type_name);
    path.rsplit("::").next().unwrap_or(path)
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}
