use crate::chain::{HandlerResult, Next, Step};
use crate::coerce::{coerce, strip_unknown, unknown_field_issues, UnknownFields};
use crate::registry::InputSchema;
use crate::request::Request;
use crate::response::Response;
use crate::schema::{Schema, ValidationError};
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

/// Request part checked by the input validator, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPart {
    Query,
    Body,
    Params,
    Headers,
}

impl RequestPart {
    pub const ORDER: [RequestPart; 4] = [
        RequestPart::Query,
        RequestPart::Body,
        RequestPart::Params,
        RequestPart::Headers,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPart::Query => "query",
            RequestPart::Body => "body",
            RequestPart::Params => "params",
            RequestPart::Headers => "headers",
        }
    }

    fn schema<'a>(&self, input: &'a InputSchema) -> Option<&'a Schema> {
        match self {
            RequestPart::Query => input.query.as_ref(),
            RequestPart::Body => input.body.as_ref(),
            RequestPart::Params => input.params.as_ref(),
            RequestPart::Headers => input.headers.as_ref(),
        }
    }

    fn slot<'r>(&self, req: &'r mut Request) -> &'r mut Value {
        match self {
            RequestPart::Query => &mut req.query,
            RequestPart::Body => &mut req.body,
            RequestPart::Params => &mut req.params,
            RequestPart::Headers => &mut req.headers,
        }
    }
}

impl fmt::Display for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First request part that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRejection {
    pub part: RequestPart,
    pub error: ValidationError,
}

/// Coerce and validate every declared part of `req`, in query, body,
/// params, headers order.
///
/// Each part that passes is replaced by its validated value, with the unknown
/// field policy applied (headers always keep undeclared keys). The first part
/// that fails stops the check; later parts are left untouched.
///
/// # Errors
///
/// Returns the failing part and its issues.
pub fn validate_input(
    input: &InputSchema,
    unknown_fields: UnknownFields,
    req: &mut Request,
) -> Result<(), InputRejection> {
    for part in RequestPart::ORDER {
        let Some(schema) = part.schema(input) else {
            continue;
        };
        let slot = part.slot(req);
        let coerced = coerce(schema.shape(), std::mem::take(slot));

        let validated = match schema.validate(&coerced) {
            Ok(value) => value,
            Err(error) => {
                *slot = coerced;
                return Err(InputRejection { part, error });
            }
        };

        let policy = if part == RequestPart::Headers {
            UnknownFields::Passthrough
        } else {
            unknown_fields
        };
        match policy {
            UnknownFields::Passthrough => *slot = validated,
            UnknownFields::Strip => *slot = strip_unknown(schema.shape(), validated),
            UnknownFields::Reject => {
                let issues = unknown_field_issues(schema.shape(), &validated);
                *slot = validated;
                if !issues.is_empty() {
                    return Err(InputRejection {
                        part,
                        error: ValidationError::new(issues),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Chain step wrapping [`validate_input`].
///
/// On failure it answers 400 `{"error": [issues]}` and does not call the next
/// step.
pub struct InputValidator {
    schema: InputSchema,
    unknown_fields: UnknownFields,
}

impl InputValidator {
    #[must_use]
    pub fn new(schema: InputSchema, unknown_fields: UnknownFields) -> Self {
        InputValidator {
            schema,
            unknown_fields,
        }
    }
}

impl Step for InputValidator {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        match validate_input(&self.schema, self.unknown_fields, req) {
            Ok(()) => next.run(req, res),
            Err(rejection) => {
                debug!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    part = %rejection.part,
                    issues = %rejection.error,
                    "Request validation failed"
                );
                res.status(400).json(json!({ "error": rejection.error }));
                Ok(())
            }
        }
    }
}
