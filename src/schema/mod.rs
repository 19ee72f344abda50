//! # Schema Adapter
//!
//! Everything downstream of registration talks to schemas through one
//! interface, [`SchemaAdapter`]:
//!
//! - `validate(value)` returns the parsed value or a list of field issues
//! - `describe_shape()` returns the closed [`Shape`] description that drives
//!   coercion and document generation
//! - `to_json_schema()` returns the JSON Schema form used in OpenAPI output
//!
//! [`JsonSchema`] is the bundled implementation. Other schema libraries plug
//! in by implementing the trait and wrapping the value with
//! [`Schema::from_adapter`].
//!
//! ```rust
//! use routeguard::schema::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::json(json!({
//!     "type": "object",
//!     "properties": {"id": {"type": "integer"}},
//!     "required": ["id"]
//! })).unwrap();
//! assert!(schema.validate(&json!({"id": 1})).is_ok());
//! assert!(schema.validate(&json!({"id": "x"})).is_err());
//! ```

mod error;
mod json;
mod shape;

pub use error::{FieldIssue, SchemaError, ValidationError};
pub use json::JsonSchema;
pub use shape::{Field, Shape};

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Interface every schema library is consumed through.
pub trait SchemaAdapter: Send + Sync {
    /// Validate `value`, returning the parsed value on success.
    fn validate(&self, value: &Value) -> Result<Value, ValidationError>;

    /// Structural description of the schema.
    fn describe_shape(&self) -> Shape;

    /// JSON Schema form of the schema, for document generation.
    fn to_json_schema(&self) -> Value;
}

/// Immutable, cheaply cloneable schema handle.
///
/// The shape is described once at construction and shared by every clone.
#[derive(Clone)]
pub struct Schema {
    adapter: Arc<dyn SchemaAdapter>,
    shape: Arc<Shape>,
}

impl Schema {
    /// Compile a JSON Schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the document does not compile.
    pub fn json(document: Value) -> Result<Self, SchemaError> {
        Ok(Self::from_adapter(JsonSchema::compile(document)?))
    }

    pub fn from_adapter<A: SchemaAdapter + 'static>(adapter: A) -> Self {
        let shape = Arc::new(adapter.describe_shape());
        Schema {
            adapter: Arc::new(adapter),
            shape,
        }
    }

    /// Validate `value` against the schema.
    ///
    /// # Errors
    ///
    /// Returns the adapter's field issues when the value does not conform.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.adapter.validate(value)
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        self.adapter.to_json_schema()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema")
            .field(&self.adapter.to_json_schema())
            .finish()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.adapter.to_json_schema().serialize(serializer)
    }
}
