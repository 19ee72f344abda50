//! # Response Object and Emission Primitives
//!
//! Handlers finish a response through one of four primitives on [`Response`]:
//!
//! | Primitive       | Payload                        |
//! |-----------------|--------------------------------|
//! | `json`          | JSON value                     |
//! | `send`          | text or raw bytes              |
//! | `render`        | named view plus JSON context   |
//! | `send_status`   | status code only               |
//!
//! Each primitive delegates to the response's current [`Emitter`]. The default
//! emitter ([`WireEmitter`]) records what was sent on the [`ResponseHead`].
//! Steps that need to observe or police emissions (the output interceptor, the
//! cache) call [`Response::wrap_emitter`] to decorate the current emitter for
//! the rest of one request. The decorator owns the emitter it wraps; nothing
//! shared is mutated.
//!
//! A response is finished after its first emission. Later emissions are
//! ignored with a warning.

use serde::Serialize;
use serde_json::{json, Value};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{error, warn};

/// Maximum inline response headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 8;

/// Response header storage; names are shared `Arc<str>`.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Raw body accepted by [`Response::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Self {
        Body::Bytes(b)
    }
}

/// What a finished response emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
    View { name: String, context: Value },
    Status,
}

/// Status, headers and emission record of one response.
#[derive(Debug, Default)]
pub struct ResponseHead {
    status: Option<u16>,
    headers: HeaderVec,
    sent: Option<Sent>,
    halted: bool,
}

impl ResponseHead {
    /// Status that will be sent: the explicit one, or 200.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    /// Status set by a step or handler, if any.
    #[must_use]
    pub fn explicit_status(&self) -> Option<u16> {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    fn default_header(&mut self, name: &str, value: &str) {
        if self.header(name).is_none() {
            self.headers.push((Arc::from(name), value.to_string()));
        }
    }

    #[must_use]
    pub fn sent(&self) -> Option<&Sent> {
        self.sent.as_ref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sent.is_some()
    }

    /// Record the emission. Emitters call this exactly once per response.
    pub fn finish(&mut self, sent: Sent) {
        self.sent = Some(sent);
    }

    /// Mark the response as replaced by an error; no further step may run.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

/// One interception point per emission primitive.
///
/// Decorators hold the emitter they wrap in a `Box<dyn Emitter>` and forward
/// to it when the payload may go out.
pub trait Emitter: Send {
    fn json(&mut self, head: &mut ResponseHead, payload: Value);
    fn send(&mut self, head: &mut ResponseHead, body: Body);
    fn render(&mut self, head: &mut ResponseHead, view: String, context: Value);
    fn send_status(&mut self, head: &mut ResponseHead, status: u16);
}

/// Terminal emitter: records the payload and its default content type.
#[derive(Debug, Default, Clone, Copy)]
pub struct WireEmitter;

impl Emitter for WireEmitter {
    fn json(&mut self, head: &mut ResponseHead, payload: Value) {
        head.default_header("content-type", "application/json");
        head.finish(Sent::Json(payload));
    }

    fn send(&mut self, head: &mut ResponseHead, body: Body) {
        match body {
            Body::Text(text) => {
                head.default_header("content-type", "text/plain; charset=utf-8");
                head.finish(Sent::Text(text));
            }
            Body::Bytes(bytes) => {
                head.default_header("content-type", "application/octet-stream");
                head.finish(Sent::Bytes(bytes));
            }
        }
    }

    fn render(&mut self, head: &mut ResponseHead, view: String, context: Value) {
        head.default_header("content-type", "text/html; charset=utf-8");
        head.finish(Sent::View {
            name: view,
            context,
        });
    }

    fn send_status(&mut self, head: &mut ResponseHead, status: u16) {
        head.set_status(status);
        head.finish(Sent::Status);
    }
}

/// Response object passed through a handler chain.
pub struct Response {
    head: ResponseHead,
    emitter: Box<dyn Emitter>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Response {
            head: ResponseHead::default(),
            emitter: Box::new(WireEmitter),
        }
    }

    /// Set the status for the next emission.
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.head.set_status(status);
        self
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.head.status()
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.head.set_header(name, value.into());
        self
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    #[must_use]
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn json(&mut self, payload: Value) {
        if self.refuse_emission("json") {
            return;
        }
        self.emitter.json(&mut self.head, payload);
    }

    /// Serialize `payload` and emit it as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serde error when `payload` cannot be represented as JSON.
    pub fn json_from<T: Serialize>(&mut self, payload: &T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(payload)?;
        self.json(value);
        Ok(())
    }

    pub fn send(&mut self, body: impl Into<Body>) {
        if self.refuse_emission("send") {
            return;
        }
        self.emitter.send(&mut self.head, body.into());
    }

    pub fn render(&mut self, view: &str, context: Value) {
        if self.refuse_emission("render") {
            return;
        }
        self.emitter.render(&mut self.head, view.to_string(), context);
    }

    pub fn send_status(&mut self, status: u16) {
        if self.refuse_emission("send_status") {
            return;
        }
        self.emitter.send_status(&mut self.head, status);
    }

    /// Replace the current emitter with `wrap(current)`.
    pub fn wrap_emitter<F>(&mut self, wrap: F)
    where
        F: FnOnce(Box<dyn Emitter>) -> Box<dyn Emitter>,
    {
        let current = std::mem::replace(&mut self.emitter, Box::new(WireEmitter));
        self.emitter = wrap(current);
    }

    #[must_use]
    pub fn sent(&self) -> Option<&Sent> {
        self.head.sent()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.head.is_finished()
    }

    /// True once an emitter replaced the payload with an error response.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.head.is_halted()
    }

    fn refuse_emission(&self, primitive: &'static str) -> bool {
        if self.head.is_finished() {
            warn!(
                primitive = primitive,
                status = self.head.status(),
                "Response already finished, ignoring emission"
            );
            true
        } else {
            false
        }
    }

    /// Turn the finished response into wire form.
    ///
    /// Views are rendered with `views`; a missing environment or template is a
    /// 500. An unfinished response is also a 500.
    #[must_use]
    pub fn finalize(self, views: Option<&minijinja::Environment<'_>>) -> HttpResponse {
        let ResponseHead {
            status,
            mut headers,
            sent,
            ..
        } = self.head;
        let status = status.unwrap_or(200);

        let body = match sent {
            Some(Sent::Json(value)) => match serde_json::to_vec(&value) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(error = %e, "Failed to serialize JSON response");
                    return HttpResponse::internal_error();
                }
            },
            Some(Sent::Text(text)) => text.into_bytes(),
            Some(Sent::Bytes(bytes)) => bytes,
            Some(Sent::View { name, context }) => {
                let Some(env) = views else {
                    error!(view = %name, "No view environment configured");
                    return HttpResponse::internal_error();
                };
                match env
                    .get_template(&name)
                    .and_then(|tpl| tpl.render(&context))
                {
                    Ok(html) => html.into_bytes(),
                    Err(e) => {
                        error!(view = %name, error = %e, "View rendering failed");
                        return HttpResponse::internal_error();
                    }
                }
            }
            Some(Sent::Status) => Vec::new(),
            None => {
                warn!(status = status, "Handler chain finished without emitting a response");
                return HttpResponse::internal_error();
            }
        };

        headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-length"));
        headers.push((Arc::from("content-length"), body.len().to_string()));
        HttpResponse {
            status,
            headers,
            body,
        }
    }
}

/// Finalized response: status, headers and encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// JSON response with a `content-type` header.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        headers.push((Arc::from("content-length"), bytes.len().to_string()));
        HttpResponse {
            status,
            headers,
            body: bytes,
        }
    }

    /// `{"error": message}` with the given status.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    #[must_use]
    pub fn internal_error() -> Self {
        Self::error(500, "Internal server error")
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON, `None` when it is not JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
