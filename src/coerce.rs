//! # Coercion Engine
//!
//! Query strings, headers and path segments only carry text. Before a request
//! part is validated, [`coerce`] walks the declared [`Shape`] and converts
//! string values toward the declared primitive kind:
//!
//! - **Number**: `"42"` → `42`, `"1.5"` → `1.5`
//! - **Boolean**: `"true"`/`"false"` (any case), `"1"`/`"0"`
//! - **BigInt**: `"9007199254740993"` → integer (`i64`, then `u64`)
//! - **Date**: epoch milliseconds → RFC 3339 (or `YYYY-MM-DD`); valid date text is
//!   left untouched
//! - **Array**: element-wise; a non-array raw value passes through
//! - **Object**: declared keys recursively; undeclared keys pass through
//!
//! Coercion never fails. A value that cannot be converted is returned as it was
//! so that validation reports the real error with the schema library's own
//! diagnostics.
//!
//! The unknown-field policy ([`UnknownFields`]) is applied separately, after
//! validation succeeds.

use crate::schema::{FieldIssue, Shape};
use chrono::{DateTime, NaiveDate, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;

/// Best-effort conversion of `raw` toward `shape`.
#[must_use]
pub fn coerce(shape: &Shape, raw: Value) -> Value {
    match shape {
        Shape::String | Shape::Other => raw,
        Shape::Number => coerce_number(raw),
        Shape::Boolean => coerce_bool(raw),
        Shape::BigInt => coerce_bigint(raw),
        Shape::Date { with_time } => coerce_date(raw, *with_time),
        Shape::Array(items) => match raw {
            Value::Array(elements) => {
                Value::Array(elements.into_iter().map(|e| coerce(items, e)).collect())
            }
            other => other,
        },
        Shape::Object(fields) => match raw {
            Value::Object(mut map) => {
                for field in fields {
                    if let Some(slot) = map.get_mut(&field.name) {
                        let value = slot.take();
                        *slot = coerce(&field.shape, value);
                    }
                }
                Value::Object(map)
            }
            other => other,
        },
    }
}

fn coerce_number(raw: Value) -> Value {
    let Value::String(s) = &raw else {
        return raw;
    };
    let text = s.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Number::from_f64(f).map(Value::Number).unwrap_or(raw),
        _ => raw,
    }
}

fn coerce_bool(raw: Value) -> Value {
    let Value::String(s) = &raw else {
        return raw;
    };
    let text = s.trim();
    let parsed = if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    };
    parsed.map(Value::Bool).unwrap_or(raw)
}

fn coerce_bigint(raw: Value) -> Value {
    let Value::String(s) = &raw else {
        return raw;
    };
    let text = s.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    match text.parse::<u64>() {
        Ok(u) => Value::from(u),
        Err(_) => raw,
    }
}

fn coerce_date(raw: Value, with_time: bool) -> Value {
    let millis = match &raw {
        Value::String(s) => {
            let text = s.trim();
            let already_valid = if with_time {
                DateTime::parse_from_rfc3339(text).is_ok()
            } else {
                NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
            };
            if already_valid {
                return raw;
            }
            match text.parse::<i64>() {
                Ok(ms) => ms,
                Err(_) => return raw,
            }
        }
        Value::Number(n) => match n.as_i64() {
            Some(ms) => ms,
            None => return raw,
        },
        _ => return raw,
    };

    match DateTime::from_timestamp_millis(millis) {
        Some(dt) if with_time => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Some(dt) => Value::String(dt.date_naive().format("%Y-%m-%d").to_string()),
        None => raw,
    }
}

/// What happens to object keys the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    /// Keep undeclared keys.
    #[default]
    Passthrough,
    /// Remove undeclared keys from the validated value.
    Strip,
    /// Report undeclared keys as field issues.
    Reject,
}

impl fmt::Display for UnknownFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnknownFields::Passthrough => "passthrough",
            UnknownFields::Strip => "strip",
            UnknownFields::Reject => "reject",
        })
    }
}

impl FromStr for UnknownFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(UnknownFields::Passthrough),
            "strip" => Ok(UnknownFields::Strip),
            "reject" => Ok(UnknownFields::Reject),
            other => Err(format!(
                "unknown field policy '{other}' (expected passthrough, strip or reject)"
            )),
        }
    }
}

/// Remove undeclared keys, recursing through declared object and array shapes.
///
/// Objects whose shape declares no fields are free-form and left alone.
#[must_use]
pub fn strip_unknown(shape: &Shape, value: Value) -> Value {
    match (shape, value) {
        (Shape::Object(fields), Value::Object(map)) if !fields.is_empty() => {
            let stripped: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, v)| {
                    let field = fields.iter().find(|f| f.name == key)?;
                    Some((key, strip_unknown(&field.shape, v)))
                })
                .collect();
            Value::Object(stripped)
        }
        (Shape::Array(items), Value::Array(elements)) => Value::Array(
            elements
                .into_iter()
                .map(|e| strip_unknown(items, e))
                .collect(),
        ),
        (_, other) => other,
    }
}

/// Issues for every undeclared key in `value`, with JSON pointer paths.
#[must_use]
pub fn unknown_field_issues(shape: &Shape, value: &Value) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    collect_unknown(shape, value, &mut String::new(), &mut issues);
    issues
}

fn collect_unknown(shape: &Shape, value: &Value, path: &mut String, out: &mut Vec<FieldIssue>) {
    match (shape, value) {
        (Shape::Object(fields), Value::Object(map)) if !fields.is_empty() => {
            for (key, v) in map {
                let len = path.len();
                path.push('/');
                path.push_str(&escape_pointer(key));
                match fields.iter().find(|f| &f.name == key) {
                    Some(field) => collect_unknown(&field.shape, v, path, out),
                    None => out.push(FieldIssue::new(
                        path.clone(),
                        format!("unknown field \"{key}\" is not allowed"),
                    )),
                }
                path.truncate(len);
            }
        }
        (Shape::Array(items), Value::Array(elements)) => {
            for (i, e) in elements.iter().enumerate() {
                let len = path.len();
                path.push('/');
                path.push_str(&i.to_string());
                collect_unknown(items, e, path, out);
                path.truncate(len);
            }
        }
        _ => {}
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
