//! Structural description of a schema, independent of the validator library.
//!
//! Coercion and document generation dispatch on [`Shape`] rather than on
//! library-specific schema types. A JSON Schema document is mapped as follows:
//!
//! | JSON Schema                                   | Shape            |
//! |-----------------------------------------------|------------------|
//! | `string` + `format: date`                     | `Date` (no time) |
//! | `string` + `format: date-time`                | `Date` (time)    |
//! | `string`                                      | `String`         |
//! | `integer` + `format: int64`/`uint64`/`bigint` | `BigInt`         |
//! | `number`, `integer`                           | `Number`         |
//! | `boolean`                                     | `Boolean`        |
//! | `array` (+ `items`)                           | `Array`          |
//! | `object` or a `properties` map                | `Object`         |
//! | anything else                                 | `Other`          |

use serde_json::{Map, Value};

/// Declared kind of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Boolean,
    Date { with_time: bool },
    BigInt,
    Array(Box<Shape>),
    Object(Vec<Field>),
    Other,
}

/// Declared key of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub required: bool,
    pub shape: Shape,
}

impl Shape {
    /// Derive a shape from a JSON Schema document.
    #[must_use]
    pub fn from_json_schema(schema: &Value) -> Shape {
        let Some(obj) = schema.as_object() else {
            return Shape::Other;
        };

        match declared_type(obj) {
            Some("string") => match obj.get("format").and_then(Value::as_str) {
                Some("date") => Shape::Date { with_time: false },
                Some("date-time") => Shape::Date { with_time: true },
                _ => Shape::String,
            },
            Some("integer") => match obj.get("format").and_then(Value::as_str) {
                Some("int64") | Some("uint64") | Some("bigint") => Shape::BigInt,
                _ => Shape::Number,
            },
            Some("number") => Shape::Number,
            Some("boolean") => Shape::Boolean,
            Some("array") => {
                let items = obj
                    .get("items")
                    .map(Shape::from_json_schema)
                    .unwrap_or(Shape::Other);
                Shape::Array(Box::new(items))
            }
            Some("object") => Shape::Object(object_fields(obj)),
            None if obj.contains_key("properties") => Shape::Object(object_fields(obj)),
            _ => Shape::Other,
        }
    }

    /// Declared fields when this is an object shape, otherwise empty.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        match self {
            Shape::Object(fields) => fields,
            _ => &[],
        }
    }

    /// Look up a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Short kind name, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Number => "number",
            Shape::Boolean => "boolean",
            Shape::Date { .. } => "date",
            Shape::BigInt => "bigint",
            Shape::Array(_) => "array",
            Shape::Object(_) => "object",
            Shape::Other => "other",
        }
    }
}

/// `type` may be a string or an array such as `["integer", "null"]`; the
/// first non-null entry wins.
fn declared_type(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn object_fields(obj: &Map<String, Value>) -> Vec<Field> {
    let required: Vec<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    obj.get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| Field {
                    name: name.clone(),
                    required: required.contains(&name.as_str()),
                    shape: Shape::from_json_schema(prop),
                })
                .collect()
        })
        .unwrap_or_default()
}
