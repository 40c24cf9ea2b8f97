//! Handler failures.

use std::fmt;

use http::StatusCode;

use crate::response::Response;

/// An error returned by a handler.
///
/// `Failure` is what travels through the middleware chain when a handler
/// returns `Err`. The server renders it as a `text/plain` response carrying
/// its status and message; middleware sees it untouched.
///
/// Any [`std::error::Error`] converts into a `500 Internal Server Error`
/// failure, so `?` works inside handlers:
///
/// ```rust,no_run
/// use loupe::{Failure, Request, Response};
///
/// async fn parse_user(req: Request) -> Result<Response, Failure> {
///     let body = std::str::from_utf8(req.body())?;
///     if body.is_empty() {
///         return Err(Failure::bad_request("empty body"));
///     }
///     Ok(Response::text(body.to_owned()))
/// }
/// ```
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// `404 Not Found` with `message` as the body.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// `400 Bad Request` with `message` as the body.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }

    /// Renders the failure for the client. Not an [`IntoResponse`] impl:
    /// a handler returning a bare `Failure` would otherwise count as a success.
    ///
    /// [`IntoResponse`]: crate::IntoResponse
    pub(crate) fn into_response(self) -> Response {
        Response::builder().status(self.status).text(self.message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// `Failure` must never implement `std::error::Error`: this impl would then
// overlap with `From<T> for T`.
impl<E: std::error::Error> From<E> for Failure {
    fn from(e: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}
