use super::merge::merge_responses;
use crate::method::HttpMethod;
use crate::registry::{EndpointDescriptor, OutputEntry};
use crate::schema::Schema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Version written to the `openapi` field.
pub const OPENAPI_VERSION: &str = "3.1.0";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder regex should be valid")
});

/// Inputs of [`generate`].
#[derive(Debug, Clone, Default)]
pub struct DocumentOptions {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    /// Server URLs, emitted in order.
    pub servers: Vec<String>,
    pub endpoints: Vec<Arc<EndpointDescriptor>>,
    /// Entries added to every endpoint's responses before merging.
    pub common_responses: Vec<OutputEntry>,
}

impl DocumentOptions {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        DocumentOptions {
            title: title.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn endpoints(mut self, endpoints: Vec<Arc<EndpointDescriptor>>) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.servers.push(url.into());
        self
    }

    #[must_use]
    pub fn common_response(mut self, entry: OutputEntry) -> Self {
        self.common_responses.push(entry);
        self
    }
}

/// `/users/:id` → `/users/{id}`.
#[must_use]
pub fn to_openapi_path(path: &str) -> String {
    PLACEHOLDER.replace_all(path, "{$1}").into_owned()
}

/// Build the OpenAPI document for `options.endpoints`.
///
/// Endpoints sharing a path share one path item. CONNECT operations have no
/// path-item key in OpenAPI and are left out.
#[must_use]
pub fn generate(options: &DocumentOptions) -> Value {
    let mut info = Map::new();
    info.insert("title".to_string(), Value::String(options.title.clone()));
    info.insert("version".to_string(), Value::String(options.version.clone()));
    if let Some(description) = &options.description {
        info.insert("description".to_string(), Value::String(description.clone()));
    }

    let mut paths = Map::new();
    for endpoint in &options.endpoints {
        if endpoint.method == HttpMethod::Connect {
            debug!(path = %endpoint.path, "Skipping CONNECT operation in document");
            continue;
        }
        let item = paths
            .entry(to_openapi_path(&endpoint.path))
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            item.insert(
                endpoint.method.openapi_key().to_string(),
                operation(endpoint, &options.common_responses),
            );
        }
    }

    let mut doc = Map::new();
    doc.insert("openapi".to_string(), json!(OPENAPI_VERSION));
    doc.insert("info".to_string(), Value::Object(info));
    if !options.servers.is_empty() {
        let servers: Vec<Value> = options.servers.iter().map(|url| json!({ "url": url })).collect();
        doc.insert("servers".to_string(), Value::Array(servers));
    }
    doc.insert("paths".to_string(), Value::Object(paths));
    Value::Object(doc)
}

fn operation(endpoint: &EndpointDescriptor, common: &[OutputEntry]) -> Value {
    let mut op = Map::new();
    if let Some(id) = &endpoint.operation_id {
        op.insert("operationId".to_string(), Value::String(id.clone()));
    }
    if let Some(summary) = &endpoint.summary {
        op.insert("summary".to_string(), Value::String(summary.clone()));
    }

    let parameters = parameters(endpoint);
    if !parameters.is_empty() {
        op.insert("parameters".to_string(), Value::Array(parameters));
    }

    if let Some(body) = endpoint.input_schema.as_ref().and_then(|i| i.body.as_ref()) {
        op.insert(
            "requestBody".to_string(),
            json!({
                "required": true,
                "content": { "application/json": { "schema": body.to_json_schema() } }
            }),
        );
    }

    op.insert(
        "responses".to_string(),
        merge_responses(endpoint.output_schema.iter().chain(common.iter())),
    );
    Value::Object(op)
}

/// Path parameters first, then query, then header parameters.
///
/// Placeholders with no declared params schema are still listed as required
/// string path parameters.
fn parameters(endpoint: &EndpointDescriptor) -> Vec<Value> {
    let input = endpoint.input_schema.as_ref();
    let mut out = Vec::new();

    let declared = slot_parameters(input.and_then(|i| i.params.as_ref()), "path");
    for name in PLACEHOLDER
        .captures_iter(&endpoint.path)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
    {
        if !declared.iter().any(|p| p["name"] == name) {
            out.push(json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": { "type": "string" }
            }));
        }
    }
    out.extend(declared);
    out.extend(slot_parameters(input.and_then(|i| i.query.as_ref()), "query"));
    out.extend(slot_parameters(input.and_then(|i| i.headers.as_ref()), "header"));
    out
}

fn slot_parameters(schema: Option<&Schema>, location: &str) -> Vec<Value> {
    let Some(schema) = schema else {
        return Vec::new();
    };
    let document = schema.to_json_schema();
    let properties = document.get("properties").and_then(Value::as_object);

    schema
        .shape()
        .fields()
        .iter()
        .map(|field| {
            let field_schema = properties
                .and_then(|p| p.get(&field.name))
                .cloned()
                .unwrap_or_else(|| json!({}));
            json!({
                "name": field.name,
                "in": location,
                "required": location == "path" || field.required,
                "schema": field_schema,
            })
        })
        .collect()
}
