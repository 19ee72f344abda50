use crate::ids::RequestId;
use crate::method::HttpMethod;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Request object seen by every step of a handler chain.
///
/// All four parts are JSON values so that the input validator can replace them
/// in place with their coerced, validated form:
///
/// - `params`: object of path placeholders (`/users/:id` → `{"id": "7"}`)
/// - `query`: object of query parameters; repeated keys become arrays
/// - `headers`: object of lowercase header names to string values
/// - `body`: parsed JSON body, `null` when the request had none
#[derive(Debug)]
pub struct Request {
    pub request_id: RequestId,
    pub method: HttpMethod,
    /// Path without the query string.
    pub path: String,
    /// Path plus query string as received.
    pub original_url: String,
    pub params: Value,
    pub query: Value,
    pub headers: Value,
    pub body: Value,
    /// Per-request values attached by steps (verified claims, cache keys).
    pub extensions: http::Extensions,
}

impl Request {
    /// Request with empty parts; the query string of `target` is not parsed.
    #[must_use]
    pub fn new(method: HttpMethod, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/").to_string();
        Request {
            request_id: RequestId::new(),
            method,
            path,
            original_url: target.to_string(),
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            headers: Value::Object(Map::new()),
            body: Value::Null,
            extensions: http::Extensions::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Value) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Header value by name (case-insensitive). Non-string values are ignored.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_object()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    /// Deserialize the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the body does not match `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    /// Deserialize the query object into `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the query does not match `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.query)
    }

    /// Deserialize the path parameters into `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the parameters do not match `T`.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.params)
    }

    /// Deserialize the header object into `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the headers do not match `T`.
    pub fn headers_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.headers)
    }
}
