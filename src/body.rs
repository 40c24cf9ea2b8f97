//! Best-effort decoding of message bodies into JSON values for the access log.

use serde_json::Value;

/// Decodes `body` into the value written under `request.body` / `response`.
///
/// | Body | Value |
/// |---|---|
/// | empty | `null` |
/// | JSON content type that parses | the parsed value |
/// | valid UTF-8 | string |
/// | anything else | `"<N bytes>"` |
pub(crate) fn to_value(content_type: Option<&str>, body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    if content_type.is_some_and(is_json) {
        if let Ok(value) = serde_json::from_slice(body) {
            return value;
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) => Value::String(text.to_owned()),
        Err(_) => Value::String(format!("<{} bytes>", body.len())),
    }
}

/// `application/json`, `application/problem+json`, etc. Parameters ignored.
fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("application/json")
        || essence.to_ascii_lowercase().ends_with("+json")
}
