use std::time::Instant;

use tracing::{field, info, info_span};

use crate::chain::{HandlerResult, Next, Step};
use crate::request::Request;
use crate::response::Response;

/// Wraps the rest of the chain in a `request` span and records the final
/// status and latency on it.
pub struct RequestSpan;

impl Step for RequestSpan {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        let span = info_span!(
            "request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            status = field::Empty,
            latency_ms = field::Empty,
        );
        let started = Instant::now();
        let result = span.in_scope(|| next.run(req, res));
        let latency_ms = started.elapsed().as_millis() as u64;
        span.record("status", res.status_code());
        span.record("latency_ms", latency_ms);
        span.in_scope(|| {
            info!(
                status = res.status_code(),
                latency_ms = latency_ms,
                ok = result.is_ok(),
                "Request completed"
            );
        });
        result
    }
}
