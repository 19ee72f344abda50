use super::document::{generate, DocumentOptions};
use crate::chain::{from_fn, HandlerChain, Step};
use crate::method::HttpMethod;
use crate::registry::{descriptors_json, EndpointDescriptor};
use crate::router::{RouteError, RouteSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Serialization of the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    #[default]
    Json,
    Yaml,
}

impl DocFormat {
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            DocFormat::Json => "application/json",
            DocFormat::Yaml => "application/yaml",
        }
    }
}

impl fmt::Display for DocFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocFormat::Json => "json",
            DocFormat::Yaml => "yaml",
        })
    }
}

impl FromStr for DocFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(DocFormat::Json),
            "yaml" | "yml" => Ok(DocFormat::Yaml),
            other => Err(format!("unknown document format '{other}' (expected json or yaml)")),
        }
    }
}

/// Document rendering or parsing failure.
#[derive(Debug)]
pub enum DocumentError {
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    /// The document does not parse as an OpenAPI 3.1 specification.
    Spec(serde_json::Error),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::Json(e) => write!(f, "failed to render JSON document: {e}"),
            DocumentError::Yaml(e) => write!(f, "failed to render YAML document: {e}"),
            DocumentError::Spec(e) => write!(f, "document is not a valid OpenAPI spec: {e}"),
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::Json(e) | DocumentError::Spec(e) => Some(e),
            DocumentError::Yaml(e) => Some(e),
        }
    }
}

/// Render `doc` as `(content type, text)`.
///
/// # Errors
///
/// Returns [`DocumentError`] when serialization fails.
pub fn render_document(
    doc: &Value,
    format: DocFormat,
) -> Result<(&'static str, String), DocumentError> {
    let text = match format {
        DocFormat::Json => serde_json::to_string_pretty(doc).map_err(DocumentError::Json)?,
        DocFormat::Yaml => serde_yaml::to_string(doc).map_err(DocumentError::Yaml)?,
    };
    Ok((format.content_type(), text))
}

/// Parse a generated document into the typed `oas3` model.
///
/// # Errors
///
/// Returns [`DocumentError::Spec`] when the document is not valid OpenAPI.
pub fn into_spec(doc: &Value) -> Result<oas3::OpenApiV3Spec, DocumentError> {
    serde_json::from_value(doc.clone()).map_err(DocumentError::Spec)
}

/// Step serving a pre-rendered document.
///
/// # Errors
///
/// Returns [`DocumentError`] when the document cannot be rendered.
pub fn document_step(doc: &Value, format: DocFormat) -> Result<Arc<dyn Step>, DocumentError> {
    let (content_type, text) = render_document(doc, format)?;
    Ok(from_fn(move |_req, res, _next| {
        res.set_header("content-type", content_type);
        res.send(text.clone());
        Ok(())
    }))
}

/// Step serving the descriptor list as JSON.
#[must_use]
pub fn introspection_step(endpoints: &[Arc<EndpointDescriptor>]) -> Arc<dyn Step> {
    let listing = descriptors_json(endpoints);
    from_fn(move |_req, res, _next| {
        res.json(listing.clone());
        Ok(())
    })
}

/// Register `GET docs_path` (document) and `GET endpoints_path`
/// (introspection) as plain routes on `sink`.
///
/// The routes bypass the registration pipeline and do not appear in the
/// document they serve.
///
/// Both bodies are rendered from `options.endpoints` at mount time. Mount
/// after the last registration; later routes are not served.
///
/// # Errors
///
/// Returns [`MountError`] when rendering or route registration fails.
pub fn mount_docs<S: RouteSink + ?Sized>(
    sink: &mut S,
    docs_path: &str,
    endpoints_path: &str,
    options: &DocumentOptions,
    format: DocFormat,
) -> Result<(), MountError> {
    let doc = generate(options);
    sink.add_route(
        HttpMethod::Get,
        docs_path,
        HandlerChain::new(vec![document_step(&doc, format).map_err(MountError::Document)?]),
    )
    .map_err(MountError::Route)?;
    sink.add_route(
        HttpMethod::Get,
        endpoints_path,
        HandlerChain::new(vec![introspection_step(&options.endpoints)]),
    )
    .map_err(MountError::Route)?;
    info!(
        docs_path = %docs_path,
        endpoints_path = %endpoints_path,
        format = %format,
        endpoints = options.endpoints.len(),
        "Documentation routes mounted"
    );
    Ok(())
}

/// Failure to mount the documentation routes.
#[derive(Debug)]
pub enum MountError {
    Document(DocumentError),
    Route(RouteError),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::Document(e) => write!(f, "{e}"),
            MountError::Route(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MountError {}
