//! # Endpoint Registry
//!
//! Append-only record of every registered route. The same descriptor drives
//! live validation (its schemas are installed into the route's chain) and
//! documentation (the OpenAPI generator and the introspection endpoint read
//! it back).
//!
//! Each [`crate::endpoints::Endpoints`] collection owns its own registry, so
//! sub-routers keep independent lists.

use crate::method::HttpMethod;
use crate::schema::Schema;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Schemas for the four request parts. Absent slots are not validated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Schema>,
}

impl InputSchema {
    #[must_use]
    pub fn query(mut self, schema: Schema) -> Self {
        self.query = Some(schema);
        self
    }

    #[must_use]
    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }

    #[must_use]
    pub fn params(mut self, schema: Schema) -> Self {
        self.params = Some(schema);
        self
    }

    #[must_use]
    pub fn headers(mut self, schema: Schema) -> Self {
        self.headers = Some(schema);
        self
    }

    /// True when no slot is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.body.is_none() && self.params.is_none() && self.headers.is_none()
    }
}

/// Declared response for one status code.
///
/// Several entries may share a status; they are merged only when the
/// document is generated.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEntry {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Schema>,
}

impl OutputEntry {
    #[must_use]
    pub fn new(status: u16) -> Self {
        OutputEntry {
            status,
            description: None,
            body: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(schema);
        self
    }
}

/// Registry record of one route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDescriptor {
    /// Full path including any collection prefix, `:name` placeholders.
    pub path: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<InputSchema>,
    pub output_schema: Vec<OutputEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl EndpointDescriptor {
    /// Output entries declared for `status`, in registration order.
    pub fn outputs_for(&self, status: u16) -> impl Iterator<Item = &OutputEntry> {
        self.output_schema.iter().filter(move |e| e.status == status)
    }
}

/// Ordered, append-only list of endpoint descriptors.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    descriptors: Vec<Arc<EndpointDescriptor>>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor and return the shared handle to it.
    pub fn register(&mut self, descriptor: EndpointDescriptor) -> Arc<EndpointDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.descriptors.push(Arc::clone(&descriptor));
        descriptor
    }

    /// Descriptors in registration order.
    #[must_use]
    pub fn list(&self) -> &[Arc<EndpointDescriptor>] {
        &self.descriptors
    }

    /// Owned copy of the current list; later registrations do not appear in it.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<EndpointDescriptor>> {
        self.descriptors.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Introspection form: one JSON object per descriptor.
    #[must_use]
    pub fn to_json(&self) -> Value {
        descriptors_json(&self.descriptors)
    }
}

/// Serialize a descriptor list for the introspection endpoint.
#[must_use]
pub fn descriptors_json(descriptors: &[Arc<EndpointDescriptor>]) -> Value {
    Value::Array(
        descriptors
            .iter()
            .filter_map(|d| serde_json::to_value(d.as_ref()).ok())
            .collect(),
    )
}
