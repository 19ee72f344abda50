use crate::chain::ChainError;
use crate::method::HttpMethod;
use serde_json::{Map, Value};

/// Transport-level request handed to [`super::Router::handle`].
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: HttpMethod,
    /// Path plus optional query string.
    pub target: String,
    /// Header pairs as received; names may repeat.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn new(method: HttpMethod, target: impl Into<String>) -> Self {
        RawRequest {
            method,
            target: target.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching `content-type`.
    #[must_use]
    pub fn json(self, body: &Value) -> Self {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        self.header("content-type", "application/json").body(bytes)
    }
}

/// Query string to a JSON object; repeated keys collect into arrays.
#[must_use]
pub fn parse_query(query: &str) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}

/// Header pairs to a JSON object with lowercase names; repeated headers are
/// joined with `", "`.
#[must_use]
pub fn parse_headers(headers: &[(String, String)]) -> Value {
    let mut map = Map::new();
    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        match map.get_mut(&name) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            _ => {
                map.insert(name, Value::String(value.clone()));
            }
        }
    }
    Value::Object(map)
}

/// Decode a request body.
///
/// An empty body is `null`. JSON is parsed when the content type mentions
/// `json` or is absent; `text/*` bodies become a string. Anything else is
/// kept as a lossy UTF-8 string.
///
/// # Errors
///
/// Returns [`ChainError::MalformedBody`] when a JSON body does not parse.
pub fn parse_body(body: &[u8], content_type: Option<&str>) -> Result<Value, ChainError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    let is_json = content_type.map_or(true, |ct| ct.to_ascii_lowercase().contains("json"));
    if is_json {
        serde_json::from_slice(body).map_err(|e| ChainError::MalformedBody(e.to_string()))
    } else {
        Ok(Value::String(String::from_utf8_lossy(body).into_owned()))
    }
}
