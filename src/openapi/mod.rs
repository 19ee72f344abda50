//! # Document Generator
//!
//! Turns registry descriptors into an OpenAPI 3.1 document.
//!
//! - `:name` placeholders become `{name}` and every placeholder is listed as
//!   a required path parameter
//! - query, params and headers object schemas are flattened into
//!   `parameters`; the body schema becomes `requestBody`
//! - the endpoint's output entries plus the common responses are merged per
//!   status code (see [`merge_responses`])
//!
//! The document is a `serde_json::Value`; [`render_document`] writes it as
//! JSON or YAML and [`into_spec`] parses it into `oas3::OpenApiV3Spec`.

mod document;
mod merge;
mod render;

pub use document::{generate, to_openapi_path, DocumentOptions, OPENAPI_VERSION};
pub use merge::merge_responses;
pub use render::{
    document_step, introspection_step, into_spec, mount_docs, render_document, DocFormat,
    DocumentError, MountError,
};
