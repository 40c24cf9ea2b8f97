//! What gets written: the request snapshot, the log record, and its framing.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::body;
use crate::request::Request;
use crate::router::RouteId;

const OPEN: &str = "<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<";
const CLOSE: &str = ">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>";

/// Tag prefixed to the opening marker of failure entries.
pub(crate) const ERROR_TAG: &str = "error";

/// The request half of a log record.
#[derive(Debug, Serialize)]
pub struct RequestSnapshot {
    params: BTreeMap<String, String>,
    query: Map<String, Value>,
    body: Value,
    headers: BTreeMap<String, String>,
}

/// Immutable view of an in-flight request, captured once at interception
/// entry and only when the route is logged.
#[derive(Debug)]
pub struct RequestContext {
    route: Arc<RouteId>,
    url: String,
    ip: IpAddr,
    request: RequestSnapshot,
}

impl RequestContext {
    /// With `trust_proxy`, the logged IP comes from the forwarding headers
    /// ([`Request::forwarded_ip`]) instead of the TCP peer.
    pub fn capture(route: &Arc<RouteId>, req: &Request, trust_proxy: bool) -> Self {
        let target = req.uri().path_and_query().map_or(req.path(), |pq| pq.as_str());
        let url = format!("{} - {target}", req.method());

        let params = req.params().iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut query = Map::new();
        for (key, value) in req.query_pairs() {
            match query.get_mut(&key) {
                None => { query.insert(key, Value::String(value)); }
                Some(Value::Array(values)) => values.push(Value::String(value)),
                Some(first) => *first = Value::Array(vec![first.take(), Value::String(value)]),
            }
        }

        let mut headers = BTreeMap::<String, String>::new();
        for (name, value) in req.headers() {
            let value = String::from_utf8_lossy(value.as_bytes());
            headers.entry(name.as_str().to_owned())
                .and_modify(|joined| {
                    joined.push_str(", ");
                    joined.push_str(&value);
                })
                .or_insert_with(|| value.into_owned());
        }

        let body = body::to_value(req.header("content-type"), req.body());

        Self {
            route: Arc::clone(route),
            url,
            ip: if trust_proxy { req.forwarded_ip() } else { req.client_ip() },
            request: RequestSnapshot { params, query, body, headers },
        }
    }

    pub(crate) fn record(&self, time: String, outcome: Payload) -> LogRecord<'_> {
        LogRecord {
            group: &self.route.group,
            handler: &self.route.handler,
            url: &self.url,
            ip: self.ip,
            time,
            request: &self.request,
            outcome,
        }
    }
}

/// Exactly one of `response` / `responseError`.
#[derive(Debug, Serialize)]
pub(crate) enum Payload {
    #[serde(rename = "response")]
    Response(Value),
    #[serde(rename = "responseError")]
    Error(String),
}

/// The serialized entry. Field order is the order on the wire.
#[derive(Debug, Serialize)]
pub(crate) struct LogRecord<'a> {
    #[serde(rename = "class")]
    group: &'a str,
    #[serde(rename = "method")]
    handler: &'a str,
    url: &'a str,
    #[serde(rename = "IP")]
    ip: IpAddr,
    time: String,
    request: &'a RequestSnapshot,
    #[serde(flatten)]
    outcome: Payload,
}

/// Converts a handler's success value, never failing.
pub(crate) fn response_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("<unserializable response: {e}>")))
}

/// Pretty-printed JSON, or the `Debug` form if serialization fails.
pub(crate) fn render(record: &LogRecord<'_>) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|e| {
        tracing::warn!(group = record.group, handler = record.handler, "access log record not serializable: {e}");
        format!("{record:#?}")
    })
}

/// Wraps `payload` in the marker lines that separate entries in a raw stream.
pub(crate) fn frame(tag: &str, payload: &str) -> String {
    format!("\n{tag}{OPEN}\n{payload}\n{CLOSE}\n\n")
}
