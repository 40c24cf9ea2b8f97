//! # loupe
//!
//! A minimal HTTP framework for Rust services behind a reverse proxy, with
//! per-route request/response access logging built in.
//!
//! ## The contract
//!
//! The proxy owns TLS, rate limiting, slow clients, and body-size limits.
//! loupe owns routing, dispatch, and seeing what happened:
//!
//! - Radix-tree routing: O(path-length) lookup via [`matchit`]
//! - Async I/O: tokio + hyper, HTTP/1.1 and HTTP/2
//! - Graceful shutdown: SIGTERM / Ctrl-C, drains in-flight requests
//! - Access logging: [`middleware::access_log`] records the request, the
//!   timing, and the response or error of the routes you opt in, without
//!   touching what the client receives
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use loupe::middleware::access_log::{PolicyTable, RequestLogInterceptor, Rule, TracingSink};
//! use loupe::{Failure, Group, Method, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), loupe::Error> {
//!     let policy = PolicyTable::new()
//!         .group("UserController", Rule::enabled().channel("users"));
//!
//!     let app = Router::new()
//!         .group(
//!             Group::new("UserController")
//!                 .on(Method::GET,  "/users/{id}", get_user)
//!                 .on(Method::POST, "/users",      create_user),
//!         )
//!         .layer(RequestLogInterceptor::new(TracingSink, policy));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Result<Response, Failure> {
//!     match req.param("id") {
//!         Some("1") => Ok(Response::json(br#"{"id":1}"#.to_vec())),
//!         _ => Err(Failure::not_found("not found")),
//!     }
//! }
//!
//! async fn create_user(req: Request) -> Result<Response, Failure> {
//!     if req.body().is_empty() {
//!         return Err(Failure::bad_request("empty body"));
//!     }
//!     Ok(Response::builder()
//!         .status(loupe::StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(br#"{"id":99}"#.to_vec()))
//! }
//! ```

mod body;
mod error;
mod failure;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use failure::Failure;
pub use handler::{BoxFuture, Handler, IntoOutcome, Outcome};
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{DEFAULT_GROUP, Group, RouteId, Router};
pub use server::Server;
