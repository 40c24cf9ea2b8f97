//! Access logging demo: one logged controller, one unlogged health check.
//!
//! Run with:
//!   RUST_LOG=info,access=info cargo run --example access_log
//!   RUST_LOG=info cargo run --example access_log -- ./logs   # per-channel files
//!
//! Try:
//!   curl http://localhost:3000/users/1
//!   curl http://localhost:3000/users/2           # logged as an error entry
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl http://localhost:3000/healthz           # not logged

use loupe::middleware::access_log::{FileSink, LogSink, PolicyTable, RequestLogInterceptor, TracingSink};
use loupe::{Failure, Group, Method, Request, Response, Router, Server, StatusCode};
use tracing_subscriber::EnvFilter;

const POLICY: &str = r#"
default_channel = "access"

[[rule]]
group = "UserController"
log = true
channel = "UserController"
"#;

#[tokio::main]
async fn main() -> Result<(), loupe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let policy = PolicyTable::from_toml(POLICY)?;
    match std::env::args().nth(1) {
        Some(dir) => serve(FileSink::spawn(dir), policy).await,
        None => serve(TracingSink, policy).await,
    }
}

async fn serve(sink: impl LogSink, policy: PolicyTable) -> Result<(), loupe::Error> {
    let app = Router::new()
        .on(Method::GET, "/healthz", healthz)
        .group(
            Group::new("UserController")
                .on(Method::GET,  "/users/{id}", get_user)
                .on(Method::POST, "/users",      create_user),
        )
        .layer(RequestLogInterceptor::new(sink, policy).include_stack(false).trust_proxy(false));

    Server::bind("0.0.0.0:3000").serve(app).await
}

async fn healthz(_req: Request) -> &'static str {
    "ok"
}

// GET /users/{id}
async fn get_user(req: Request) -> Result<Response, Failure> {
    match req.param("id") {
        Some("1") => Ok(Response::json(br#"{"id":1,"name":"alice"}"#.to_vec())),
        _ => Err(Failure::not_found("not found")),
    }
}

// POST /users
//
// A malformed body surfaces as a 500 through `?` and shows up in the log
// as `responseError`.
async fn create_user(req: Request) -> Result<Response, Failure> {
    let input: serde_json::Value = serde_json::from_slice(req.body())?;
    let body = serde_json::to_vec(&serde_json::json!({ "id": 99, "name": input["name"] }))?;
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(body))
}
