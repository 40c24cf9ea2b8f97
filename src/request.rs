//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request with its body fully read.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: SocketAddr,
}

impl Request {
    pub(crate) fn new(
        parts: http::request::Parts,
        body: Vec<u8>,
        params: HashMap<String, String>,
        remote_addr: SocketAddr,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params,
            remote_addr,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    /// Percent-decoded query pairs, in the order they appear.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect()
    }

    /// The address of the TCP peer.
    ///
    /// Behind a reverse proxy this is the proxy itself; see
    /// [`forwarded_ip`](Request::forwarded_ip).
    pub fn client_ip(&self) -> IpAddr {
        self.remote_addr.ip()
    }

    /// The client address as reported by a reverse proxy: the first
    /// `x-forwarded-for` hop, then `x-real-ip`, then the TCP peer.
    ///
    /// Any client can set these headers. Only use this when every request
    /// arrives through a proxy that overwrites them.
    pub fn forwarded_ip(&self) -> IpAddr {
        self.header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
            .or_else(|| self.header("x-real-ip").and_then(|ip| ip.trim().parse().ok()))
            .unwrap_or_else(|| self.client_ip())
    }
}
