//! Handler chains with an explicit continuation.
//!
//! A chain is an ordered slice of [`Step`]s built once at registration time.
//! Each step receives a [`Next`] and advances the chain by calling
//! [`Next::run`]; a step that returns without calling it halts the chain for
//! that request. Errors propagate back through every step to the router's
//! generic error stage.

use crate::request::Request;
use crate::response::Response;
use std::fmt;
use std::sync::Arc;

/// Result returned by steps and handlers.
pub type HandlerResult = Result<(), ChainError>;

/// Errors that leave a handler chain.
///
/// Schema failures never appear here: the validators answer them directly
/// (400 for input, 500 for output) and halt the chain.
#[derive(Debug)]
pub enum ChainError {
    /// Request body exceeded the configured limit.
    PayloadTooLarge { limit: usize, actual: usize },
    /// Request body could not be decoded.
    MalformedBody(String),
    /// Anything raised by a handler or policy step.
    Handler(anyhow::Error),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::PayloadTooLarge { limit, actual } => {
                write!(f, "payload of {actual} bytes exceeds limit of {limit} bytes")
            }
            ChainError::MalformedBody(reason) => write!(f, "malformed request body: {reason}"),
            ChainError::Handler(e) => write!(f, "handler error: {e}"),
        }
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChainError::Handler(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ChainError {
    fn from(e: anyhow::Error) -> Self {
        ChainError::Handler(e)
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Handler(e.into())
    }
}

/// One element of a handler chain.
pub trait Step: Send + Sync {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult;
}

/// Continuation over the remaining steps of a chain.
pub struct Next<'a> {
    steps: &'a [Arc<dyn Step>],
}

impl<'a> Next<'a> {
    /// Run the remaining steps. Running past the last step is a no-op.
    pub fn run(self, req: &mut Request, res: &mut Response) -> HandlerResult {
        match self.steps.split_first() {
            Some((step, rest)) => step.handle(req, res, Next { steps: rest }),
            None => Ok(()),
        }
    }

    /// Number of steps still to run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

struct FnStep<F>(F);

impl<F> Step for FnStep<F>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) -> HandlerResult + Send + Sync,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        (self.0)(req, res, next)
    }
}

/// Build a step from a closure.
///
/// ```rust
/// use routeguard::chain::from_fn;
///
/// let tag = from_fn(|req, res, next| {
///     res.set_header("x-request-id", req.request_id.to_string());
///     next.run(req, res)
/// });
/// # let _ = tag;
/// ```
pub fn from_fn<F>(f: F) -> Arc<dyn Step>
where
    F: Fn(&mut Request, &mut Response, Next<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(FnStep(f))
}

/// Ordered, immutable sequence of steps registered for one route.
#[derive(Clone)]
pub struct HandlerChain {
    steps: Arc<[Arc<dyn Step>]>,
}

impl HandlerChain {
    #[must_use]
    pub fn new(steps: Vec<Arc<dyn Step>>) -> Self {
        HandlerChain {
            steps: steps.into(),
        }
    }

    /// Run the chain from its first step.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a step.
    pub fn run(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        Next {
            steps: &self.steps[..],
        }
        .run(req, res)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}
