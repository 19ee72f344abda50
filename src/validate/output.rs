use crate::chain::{HandlerResult, Next, Step};
use crate::ids::RequestId;
use crate::registry::EndpointDescriptor;
use crate::request::Request;
use crate::response::{Body, Emitter, Response, ResponseHead};
use crate::schema::ValidationError;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

/// Check `payload` against the entries `descriptor` declares for `status`.
///
/// - no entry for `status`: accepted
/// - an entry without a body schema: accepted
/// - otherwise accepted when any body schema accepts the payload
///
/// `payload` is `None` for emissions with no JSON form (raw bytes, views),
/// which never satisfy a body schema.
///
/// # Errors
///
/// Returns the combined issues of every body schema that rejected the payload.
pub fn check_output(
    descriptor: &EndpointDescriptor,
    status: u16,
    payload: Option<&Value>,
) -> Result<(), ValidationError> {
    let mut schemas = Vec::new();
    for entry in descriptor.outputs_for(status) {
        match &entry.body {
            Some(schema) => schemas.push(schema),
            None => return Ok(()),
        }
    }
    if schemas.is_empty() {
        return Ok(());
    }

    let Some(payload) = payload else {
        return Err(ValidationError::root(
            "response payload has no JSON representation",
        ));
    };

    let mut combined = ValidationError::new(Vec::new());
    for schema in schemas {
        match schema.validate(payload) {
            Ok(_) => return Ok(()),
            Err(e) => combined.extend(e),
        }
    }
    Err(combined)
}

/// Chain step that installs the output contract on the response emitter.
///
/// Runs ahead of the handler; enforcement fires when the handler (or a later
/// step) emits.
pub struct OutputInterceptor {
    descriptor: Arc<EndpointDescriptor>,
}

impl OutputInterceptor {
    #[must_use]
    pub fn new(descriptor: Arc<EndpointDescriptor>) -> Self {
        OutputInterceptor { descriptor }
    }
}

impl Step for OutputInterceptor {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        let descriptor = Arc::clone(&self.descriptor);
        let request_id = req.request_id;
        res.wrap_emitter(move |inner| {
            Box::new(ContractEmitter {
                inner,
                descriptor,
                request_id,
            })
        });
        next.run(req, res)
    }
}

/// Emitter decorator that validates every payload before forwarding it.
struct ContractEmitter {
    inner: Box<dyn Emitter>,
    descriptor: Arc<EndpointDescriptor>,
    request_id: RequestId,
}

impl ContractEmitter {
    /// True when the payload may go out. On violation the 500 has already
    /// been emitted through the inner emitter and the head is halted.
    fn admit(&mut self, head: &mut ResponseHead, status: u16, payload: Option<&Value>) -> bool {
        let Err(issues) = check_output(&self.descriptor, status, payload) else {
            return true;
        };
        error!(
            request_id = %self.request_id,
            method = %self.descriptor.method,
            path = %self.descriptor.path,
            status = status,
            issues = %issues,
            "Response violates declared output schema"
        );
        head.halt();
        head.set_status(500);
        head.set_header("content-type", "application/json".to_string());
        self.inner
            .json(head, json!({ "error": "Internal server error" }));
        false
    }
}

impl Emitter for ContractEmitter {
    fn json(&mut self, head: &mut ResponseHead, payload: Value) {
        let status = head.status();
        if self.admit(head, status, Some(&payload)) {
            self.inner.json(head, payload);
        }
    }

    fn send(&mut self, head: &mut ResponseHead, body: Body) {
        let status = head.status();
        let as_json = match &body {
            Body::Text(text) => Some(Value::String(text.clone())),
            Body::Bytes(_) => None,
        };
        if self.admit(head, status, as_json.as_ref()) {
            self.inner.send(head, body);
        }
    }

    fn render(&mut self, head: &mut ResponseHead, view: String, context: Value) {
        let status = head.status();
        if self.admit(head, status, None) {
            self.inner.render(head, view, context);
        }
    }

    fn send_status(&mut self, head: &mut ResponseHead, status: u16) {
        if self.admit(head, status, Some(&Value::Null)) {
            self.inner.send_status(head, status);
        }
    }
}
