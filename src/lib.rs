//! # routeguard
//!
//! **routeguard** puts a typed request/response contract around route handlers. Each route is
//! registered with schemas for its query, body, path params and headers, plus one schema per
//! response status. The same registration feeds an [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0)
//! document, so the contract that is enforced is the contract that is published.
//!
//! ## Architecture
//!
//! - **[`schema`]** - Schema adapter: opaque validate / describe-shape handle over JSON Schema
//! - **[`coerce`]** - Best-effort conversion of raw strings to declared primitive kinds
//! - **[`validate`]** - Input validator and output interceptor chain steps
//! - **[`registry`]** - Append-only list of endpoint descriptors
//! - **[`endpoints`]** - Registration pipeline composing the per-route handler chain
//! - **[`openapi`]** - Document generator with per-status response merging
//! - **[`router`]** - Reference host router (`:name` path matching, body parsing, error stage)
//! - **[`middleware`]** - JWT bearer verification, response cache and request span steps
//! - **[`typed`]** - Typed handler adapter
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Router
//!     participant Before as beforeInputValidation
//!     participant Input as InputValidator
//!     participant After as afterInputValidation
//!     participant Output as OutputInterceptor
//!     participant Handler
//!
//!     Client->>Router: RawRequest
//!     Router->>Router: match route, parse query/headers/body
//!     alt No Route Match
//!         Router-->>Client: 404 Not Found
//!     end
//!     Router->>Before: run chain
//!     Before->>Input: next
//!     Input->>Input: coerce + validate query, body, params, headers
//!     alt Validation Failed
//!         Input-->>Client: 400 {error: issues}
//!     end
//!     Input->>After: next
//!     After->>Output: next
//!     Output->>Output: wrap emitter
//!     Output->>Handler: next
//!     Handler->>Output: res.json(payload)
//!     Output->>Output: validate payload for status
//!     alt Contract Violation
//!         Output-->>Client: 500 Internal server error
//!     end
//!     Output-->>Client: payload
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use routeguard::endpoints::{EndpointArgs, Endpoints};
//! use routeguard::registry::{InputSchema, OutputEntry};
//! use routeguard::router::{RawRequest, Router};
//! use routeguard::schema::Schema;
//! use routeguard::HttpMethod;
//! use serde_json::json;
//!
//! let body = Schema::json(json!({
//!     "type": "object",
//!     "properties": { "a": { "type": "number" }, "b": { "type": "number" } },
//!     "required": ["a", "b"]
//! }))
//! .unwrap();
//! let result = Schema::json(json!({
//!     "type": "object",
//!     "properties": { "result": { "type": "number" } },
//!     "required": ["result"]
//! }))
//! .unwrap();
//!
//! let mut endpoints = Endpoints::new(Router::new());
//! endpoints
//!     .post(
//!         "/add",
//!         EndpointArgs::new()
//!             .input(InputSchema::default().body(body))
//!             .output(OutputEntry::new(200).body(result)),
//!         |req, res| {
//!             let a = req.body["a"].as_f64().unwrap_or_default();
//!             let b = req.body["b"].as_f64().unwrap_or_default();
//!             res.json(json!({ "result": a + b }));
//!             Ok(())
//!         },
//!     )
//!     .unwrap();
//! let (router, registry) = endpoints.into_parts();
//!
//! let ok = router.handle(RawRequest::new(HttpMethod::Post, "/add").json(&json!({ "a": 1, "b": 2 })));
//! assert_eq!(ok.status, 200);
//! let bad = router.handle(RawRequest::new(HttpMethod::Post, "/add").json(&json!({ "a": "x" })));
//! assert_eq!(bad.status, 400);
//! assert_eq!(registry.len(), 1);
//! ```
//!
//! ## Configuration and Logging
//!
//! [`config::GuardConfig`] is read from YAML or TOML with `ROUTEGUARD_*` overrides;
//! [`logging::init_logging`] installs a JSON or pretty `tracing` subscriber.

pub mod chain;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod demo;
pub mod endpoints;
pub mod ids;
pub mod logging;
pub mod method;
pub mod middleware;
pub mod openapi;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod schema;
pub mod typed;
pub mod validate;

pub use chain::{ChainError, HandlerChain, HandlerResult, Next, Step};
pub use coerce::UnknownFields;
pub use endpoints::{EndpointArgs, Endpoints, RegistrationError};
pub use ids::RequestId;
pub use method::HttpMethod;
pub use registry::{EndpointDescriptor, EndpointRegistry, InputSchema, OutputEntry};
pub use request::Request;
pub use response::{HttpResponse, Response};
pub use schema::{Schema, SchemaAdapter, Shape, ValidationError};
