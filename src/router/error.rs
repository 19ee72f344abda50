use crate::chain::ChainError;
use crate::request::Request;
use crate::response::Response;
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

/// Route table errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The path pattern is malformed.
    InvalidPath { path: String, reason: String },
    /// The pattern could not be compiled into a matcher.
    Pattern { path: String, reason: String },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidPath { path, reason } => {
                write!(f, "invalid route path '{path}': {reason}")
            }
            RouteError::Pattern { path, reason } => {
                write!(f, "failed to compile route '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// Generic error stage run when a chain returns an error.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, err: &ChainError, req: &Request, res: &mut Response);
}

/// Maps chain errors to responses:
///
/// | Error              | Status | Body                                  |
/// |--------------------|--------|---------------------------------------|
/// | `PayloadTooLarge`  | 413    | `{"error": "Payload Too Large"}`      |
/// | `MalformedBody`    | 400    | `{"error": <reason>}`                 |
/// | `Handler`          | 500    | `{"error": "Internal server error"}`  |
///
/// When the response is already finished the error is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, err: &ChainError, req: &Request, res: &mut Response) {
        if res.is_finished() {
            error!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                error = %err,
                "Error after response was sent"
            );
            return;
        }
        match err {
            ChainError::PayloadTooLarge { limit, actual } => {
                warn!(
                    request_id = %req.request_id,
                    path = %req.path,
                    limit = limit,
                    actual = actual,
                    "Request body too large"
                );
                res.status(413).json(json!({ "error": "Payload Too Large" }));
            }
            ChainError::MalformedBody(reason) => {
                warn!(
                    request_id = %req.request_id,
                    path = %req.path,
                    reason = %reason,
                    "Malformed request body"
                );
                res.status(400).json(json!({ "error": reason }));
            }
            ChainError::Handler(e) => {
                error!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    error = ?e,
                    "Unhandled error in handler chain"
                );
                res.status(500)
                    .json(json!({ "error": "Internal server error" }));
            }
        }
    }
}
