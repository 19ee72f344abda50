//! Typed handler adapter.
//!
//! [`typed`] turns a function over deserialized request parts into a plain
//! registration handler. Because the input validator has already replaced
//! each declared part with its coerced value, deserializing into caller types
//! normally succeeds; if it does not, the adapter answers
//! 400 `{"error": "Invalid request data", "message": ...}` without calling
//! the function.
//!
//! ```rust
//! use routeguard::typed::{typed, Reply, TypedRequest};
//! use serde::{Deserialize, Serialize};
//! use serde_json::Value;
//!
//! #[derive(Deserialize)]
//! struct Sum { a: f64, b: f64 }
//!
//! #[derive(Serialize)]
//! struct Total { result: f64 }
//!
//! let handler = typed(|req: TypedRequest<Value, Sum>| {
//!     Ok(Reply::ok(Total { result: req.query.a + req.query.b }))
//! });
//! # let _ = handler;
//! ```

use crate::chain::HandlerResult;
use crate::ids::RequestId;
use crate::request::Request;
use crate::response::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

/// Request parts deserialized into caller types.
#[derive(Debug, Clone)]
pub struct TypedRequest<B = Value, Q = Value, P = Value, H = Value> {
    pub request_id: RequestId,
    pub body: B,
    pub query: Q,
    pub params: P,
    pub headers: H,
}

impl<B, Q, P, H> TypedRequest<B, Q, P, H>
where
    B: DeserializeOwned,
    Q: DeserializeOwned,
    P: DeserializeOwned,
    H: DeserializeOwned,
{
    /// Deserialize every part of `req`.
    ///
    /// # Errors
    ///
    /// Returns the first serde error.
    pub fn from_request(req: &Request) -> Result<Self, serde_json::Error> {
        Ok(TypedRequest {
            request_id: req.request_id,
            body: req.body_as()?,
            query: req.query_as()?,
            params: req.params_as()?,
            headers: req.headers_as()?,
        })
    }
}

/// Typed response: status plus a serializable body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub status: u16,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn ok(body: T) -> Self {
        Reply { status: 200, body }
    }

    pub fn with_status(status: u16, body: T) -> Self {
        Reply { status, body }
    }
}

/// Adapt a typed function into a registration handler.
pub fn typed<B, Q, P, H, T, F>(
    f: F,
) -> impl Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static
where
    B: DeserializeOwned + 'static,
    Q: DeserializeOwned + 'static,
    P: DeserializeOwned + 'static,
    H: DeserializeOwned + 'static,
    T: Serialize,
    F: Fn(TypedRequest<B, Q, P, H>) -> anyhow::Result<Reply<T>> + Send + Sync + 'static,
{
    move |req: &mut Request, res: &mut Response| -> HandlerResult {
        let typed_req = match TypedRequest::<B, Q, P, H>::from_request(req) {
            Ok(t) => t,
            Err(err) => {
                debug!(
                    request_id = %req.request_id,
                    path = %req.path,
                    error = %err,
                    "Typed request conversion failed"
                );
                res.status(400).json(json!({
                    "error": "Invalid request data",
                    "message": err.to_string()
                }));
                return Ok(());
            }
        };
        let reply = f(typed_req)?;
        res.status(reply.status);
        res.json_from(&reply.body)?;
        Ok(())
    }
}
