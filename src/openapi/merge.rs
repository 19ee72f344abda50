use crate::registry::OutputEntry;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Build the `responses` object for one operation.
///
/// Entries (the endpoint's own plus the common ones) are grouped by status.
/// Within a group:
///
/// - body schemas are combined with `anyOf`; an entry without a body counts
///   as `{"type": "object"}` so the union stays well-formed
/// - identical schemas collapse, and a union of one is emitted as the schema
///   itself
/// - descriptions are de-duplicated and joined with `" OR "`; a group with no
///   description gets `Response for status code <status>`
///
/// A single entry without a body produces a response with no `content`.
/// No entries at all produce `default: {description: "Default response"}`.
#[must_use]
pub fn merge_responses<'a, I>(entries: I) -> Value
where
    I: IntoIterator<Item = &'a OutputEntry>,
{
    let mut groups: BTreeMap<u16, Vec<&OutputEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.status).or_default().push(entry);
    }

    let mut responses = Map::new();
    if groups.is_empty() {
        responses.insert(
            "default".to_string(),
            json!({ "description": "Default response" }),
        );
        return Value::Object(responses);
    }

    for (status, group) in groups {
        let mut response = Map::new();
        response.insert(
            "description".to_string(),
            Value::String(merged_description(status, &group)),
        );
        if let Some(schema) = merged_schema(&group) {
            response.insert(
                "content".to_string(),
                json!({ "application/json": { "schema": schema } }),
            );
        }
        responses.insert(status.to_string(), Value::Object(response));
    }
    Value::Object(responses)
}

fn merged_description(status: u16, group: &[&OutputEntry]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for desc in group.iter().filter_map(|e| e.description.as_deref()) {
        if !seen.contains(&desc) {
            seen.push(desc);
        }
    }
    if seen.is_empty() {
        format!("Response for status code {status}")
    } else {
        seen.join(" OR ")
    }
}

fn merged_schema(group: &[&OutputEntry]) -> Option<Value> {
    if let [only] = group {
        return only.body.as_ref().map(|s| s.to_json_schema());
    }

    let mut variants: Vec<Value> = Vec::with_capacity(group.len());
    for entry in group {
        let schema = entry
            .body
            .as_ref()
            .map(|s| s.to_json_schema())
            .unwrap_or_else(|| json!({ "type": "object" }));
        if !variants.contains(&schema) {
            variants.push(schema);
        }
    }
    match variants.len() {
        1 => variants.pop(),
        _ => Some(json!({ "anyOf": variants })),
    }
}
