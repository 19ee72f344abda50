use super::{FieldIssue, SchemaAdapter, SchemaError, Shape, ValidationError};
use jsonschema::{Draft, Validator};
use serde_json::Value;

/// [`SchemaAdapter`] over a JSON Schema document (draft 2020-12).
///
/// The document is compiled once with format validation enabled; request-time
/// calls only run the compiled validator.
pub struct JsonSchema {
    document: Value,
    validator: Validator,
    shape: Shape,
}

impl JsonSchema {
    /// Compile `document`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] when the document is not a valid schema.
    pub fn compile(document: Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .should_validate_formats(true)
            .build(&document)
            .map_err(|e| SchemaError::Invalid {
                reason: e.to_string(),
            })?;
        let shape = Shape::from_json_schema(&document);
        Ok(JsonSchema {
            document,
            validator,
            shape,
        })
    }
}

impl SchemaAdapter for JsonSchema {
    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        let issues: Vec<FieldIssue> = self
            .validator
            .iter_errors(value)
            .map(|e| FieldIssue::new(e.instance_path.to_string(), e.to_string()))
            .collect();
        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(ValidationError::new(issues))
        }
    }

    fn describe_shape(&self) -> Shape {
        self.shape.clone()
    }

    fn to_json_schema(&self) -> Value {
        self.document.clone()
    }
}

impl std::fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}
