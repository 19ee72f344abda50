//! # Registration Pipeline
//!
//! [`Endpoints`] is the entry point applications use to declare routes. One
//! registration call:
//!
//! 1. checks the path pattern
//! 2. appends an [`EndpointDescriptor`] to the collection's registry
//! 3. composes the route's handler chain
//! 4. registers the chain with the host router through [`RouteSink`]
//!
//! ## Chain order
//!
//! The composed chain is fixed:
//!
//! | # | Step                                      |
//! |---|-------------------------------------------|
//! | 1 | `before_input_validation` steps           |
//! | 2 | input validator (only with input schemas) |
//! | 3 | `after_input_validation` steps            |
//! | 4 | output interceptor install                |
//! | 5 | the handler                               |
//! | 6 | `before_response` steps                   |
//!
//! The interceptor is installed ahead of the handler and fires when the
//! handler emits. `before_response` steps run only when the handler returns
//! `Ok` and its payload satisfied the output contract.
//!
//! ## Example
//!
//! ```rust
//! use routeguard::endpoints::{EndpointArgs, Endpoints};
//! use routeguard::registry::{InputSchema, OutputEntry};
//! use routeguard::router::Router;
//! use routeguard::schema::Schema;
//! use serde_json::json;
//!
//! let mut api = Endpoints::new(Router::new());
//! let params = Schema::json(json!({
//!     "type": "object",
//!     "properties": {"id": {"type": "integer"}},
//!     "required": ["id"]
//! })).unwrap();
//!
//! api.get(
//!     "/items/:id",
//!     EndpointArgs::new()
//!         .input(InputSchema::default().params(params))
//!         .output(OutputEntry::new(200).description("The item")),
//!     |req, res| {
//!         res.json(json!({ "id": req.params["id"] }));
//!         Ok(())
//!     },
//! ).unwrap();
//!
//! assert_eq!(api.registry().len(), 1);
//! ```

use crate::chain::{HandlerChain, HandlerResult, Next, Step};
use crate::coerce::UnknownFields;
use crate::method::HttpMethod;
use crate::registry::{EndpointDescriptor, EndpointRegistry, InputSchema, OutputEntry};
use crate::request::Request;
use crate::response::Response;
use crate::router::{path_params, RouteError, RouteSink};
use crate::validate::{InputValidator, OutputInterceptor};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Registration failures. Raised at startup, never at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The path pattern is malformed; nothing was registered.
    InvalidPath { path: String, reason: String },
    /// The host router refused the chain.
    Route(RouteError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::InvalidPath { path, reason } => {
                write!(f, "cannot register '{path}': {reason}")
            }
            RegistrationError::Route(e) => write!(f, "router rejected route: {e}"),
        }
    }
}

impl std::error::Error for RegistrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistrationError::Route(e) => Some(e),
            RegistrationError::InvalidPath { .. } => None,
        }
    }
}

impl From<RouteError> for RegistrationError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::InvalidPath { path, reason } => {
                RegistrationError::InvalidPath { path, reason }
            }
            other => RegistrationError::Route(other),
        }
    }
}

/// Per-route registration arguments. Every field is optional.
#[derive(Default, Clone)]
pub struct EndpointArgs {
    pub input_schema: Option<InputSchema>,
    pub output_schema: Vec<OutputEntry>,
    pub summary: Option<String>,
    pub operation_id: Option<String>,
    pub before_input_validation: Vec<Arc<dyn Step>>,
    pub after_input_validation: Vec<Arc<dyn Step>>,
    pub before_response: Vec<Arc<dyn Step>>,
    /// Overrides the collection's unknown-field policy for this route.
    pub unknown_fields: Option<UnknownFields>,
}

impl EndpointArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn input(mut self, schema: InputSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn output(mut self, entry: OutputEntry) -> Self {
        self.output_schema.push(entry);
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn before_input_validation(mut self, step: Arc<dyn Step>) -> Self {
        self.before_input_validation.push(step);
        self
    }

    #[must_use]
    pub fn after_input_validation(mut self, step: Arc<dyn Step>) -> Self {
        self.after_input_validation.push(step);
        self
    }

    #[must_use]
    pub fn before_response(mut self, step: Arc<dyn Step>) -> Self {
        self.before_response.push(step);
        self
    }

    #[must_use]
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = Some(policy);
        self
    }
}

impl fmt::Debug for EndpointArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointArgs")
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .field("summary", &self.summary)
            .field("operation_id", &self.operation_id)
            .field("before_input_validation", &self.before_input_validation.len())
            .field("after_input_validation", &self.after_input_validation.len())
            .field("before_response", &self.before_response.len())
            .field("unknown_fields", &self.unknown_fields)
            .finish()
    }
}

struct HandlerStep<F>(F);

impl<F> Step for HandlerStep<F>
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync,
{
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        (self.0)(req, res)?;
        if res.is_halted() {
            debug!(
                request_id = %req.request_id,
                status = res.status_code(),
                "Response replaced by contract violation, skipping before_response steps"
            );
            return Ok(());
        }
        next.run(req, res)
    }
}

/// Route collection over a host router.
///
/// Each collection owns an independent [`EndpointRegistry`]; a nested
/// collection prefixes every path it registers.
pub struct Endpoints<S: RouteSink> {
    sink: S,
    prefix: String,
    registry: EndpointRegistry,
    unknown_fields: UnknownFields,
}

impl<S: RouteSink> Endpoints<S> {
    pub fn new(sink: S) -> Self {
        Self::nested(sink, "")
    }

    /// Collection whose paths are registered under `prefix`.
    pub fn nested(sink: S, prefix: &str) -> Self {
        Endpoints {
            sink,
            prefix: prefix.trim_end_matches('/').to_string(),
            registry: EndpointRegistry::new(),
            unknown_fields: UnknownFields::default(),
        }
    }

    /// Default unknown-field policy for routes registered afterwards.
    #[must_use]
    pub fn with_unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (S, EndpointRegistry) {
        (self.sink, self.registry)
    }

    fn full_path(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            path.to_string()
        } else if path == "/" {
            self.prefix.clone()
        } else {
            format!("{}{}", self.prefix, path)
        }
    }

    /// Register `handler` under `(method, path)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidPath`] before anything is recorded
    /// when the path is malformed, or [`RegistrationError::Route`] when the
    /// host router refuses the chain.
    pub fn register<F>(
        &mut self,
        method: HttpMethod,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        let full_path = self.full_path(path);
        path_params(path)?;
        path_params(&full_path)?;

        let EndpointArgs {
            input_schema,
            output_schema,
            summary,
            operation_id,
            before_input_validation,
            after_input_validation,
            before_response,
            unknown_fields,
        } = args;

        let descriptor = self.registry.register(EndpointDescriptor {
            path: full_path.clone(),
            method,
            input_schema,
            output_schema,
            summary,
            operation_id,
        });

        let mut steps: Vec<Arc<dyn Step>> = Vec::with_capacity(
            before_input_validation.len()
                + after_input_validation.len()
                + before_response.len()
                + 3,
        );
        steps.extend(before_input_validation);
        if let Some(input) = descriptor.input_schema.as_ref().filter(|i| !i.is_empty()) {
            steps.push(Arc::new(InputValidator::new(
                input.clone(),
                unknown_fields.unwrap_or(self.unknown_fields),
            )));
        }
        steps.extend(after_input_validation);
        steps.push(Arc::new(OutputInterceptor::new(Arc::clone(&descriptor))));
        steps.push(Arc::new(HandlerStep(handler)));
        steps.extend(before_response);

        info!(
            method = %method,
            path = %full_path,
            operation_id = descriptor.operation_id.as_deref().unwrap_or(""),
            validates_input = descriptor.input_schema.is_some(),
            output_entries = descriptor.output_schema.len(),
            chain_len = steps.len(),
            "Endpoint registered"
        );

        self.sink
            .add_route(method, &full_path, HandlerChain::new(steps))
            .map_err(RegistrationError::Route)?;
        Ok(descriptor)
    }

    /// Register a GET route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn get<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Get, path, args, handler)
    }

    /// Register a POST route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn post<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Post, path, args, handler)
    }

    /// Register a PUT route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn put<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Put, path, args, handler)
    }

    /// Register a DELETE route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn delete<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Delete, path, args, handler)
    }

    /// Register a PATCH route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn patch<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Patch, path, args, handler)
    }

    /// Register an OPTIONS route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn options<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Options, path, args, handler)
    }

    /// Register a HEAD route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn head<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Head, path, args, handler)
    }

    /// Register a TRACE route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn trace<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Trace, path, args, handler)
    }

    /// Register a CONNECT route.
    ///
    /// # Errors
    ///
    /// See [`Endpoints::register`].
    pub fn connect<F>(
        &mut self,
        path: &str,
        args: EndpointArgs,
        handler: F,
    ) -> Result<Arc<EndpointDescriptor>, RegistrationError>
    where
        F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HttpMethod::Connect, path, args, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::from_fn;
    use crate::router::{RawRequest, Router};
    use crate::schema::Schema;
    use serde_json::json;

    fn trace_step(tag: &'static str) -> Arc<dyn Step> {
        from_fn(move |req, res, next| {
            let mut seen = res.header("x-trace").unwrap_or_default().to_string();
            seen.push_str(tag);
            res.set_header("x-trace", seen);
            next.run(req, res)
        })
    }

    #[test]
    fn test_chain_order() {
        let mut api = Endpoints::new(Router::new());
        let args = EndpointArgs::new()
            .input(InputSchema::default().query(Schema::json(json!({"type": "object"})).unwrap()))
            .before_input_validation(trace_step("a"))
            .after_input_validation(trace_step("b"))
            .before_response(trace_step("d"));
        api.get("/order", args, |_req, res| {
            let mut seen = res.header("x-trace").unwrap_or_default().to_string();
            seen.push('c');
            res.set_header("x-trace", seen);
            res.send_status(204);
            Ok(())
        })
        .unwrap();
        let (router, _) = api.into_parts();
        let res = router.handle(RawRequest::new(HttpMethod::Get, "/order"));
        assert_eq!(res.header("x-trace"), Some("abcd"));
    }

    #[test]
    fn test_handler_error_skips_before_response() {
        let mut api = Endpoints::new(Router::new());
        let args = EndpointArgs::new().before_response(from_fn(|_req, _res, _next| {
            panic!("before_response must not run after a handler error")
        }));
        api.get("/fail", args, |_req, _res| Err(anyhow::anyhow!("nope").into()))
            .unwrap();
        let (router, _) = api.into_parts();
        let res = router.handle(RawRequest::new(HttpMethod::Get, "/fail"));
        assert_eq!(res.status, 500);
    }

    #[test]
    fn test_contract_violation_skips_before_response() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let runs = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&runs);
        let mut api = Endpoints::new(Router::new());
        let args = EndpointArgs::new()
            .output(OutputEntry::new(200).body(
                Schema::json(json!({
                    "type": "object",
                    "properties": {"id": {"type": "number"}},
                    "required": ["id"]
                }))
                .unwrap(),
            ))
            .before_response(from_fn(move |req, res, next| {
                seen.fetch_add(1, Ordering::SeqCst);
                res.set_header("x-after", "ran");
                next.run(req, res)
            }));
        api.get("/contract", args, |_req, res| {
            res.json(json!({"id": "not-a-number"}));
            Ok(())
        })
        .unwrap();
        let (router, _) = api.into_parts();

        let res = router.handle(RawRequest::new(HttpMethod::Get, "/contract"));
        assert_eq!(res.status, 500);
        assert_eq!(res.header("x-after"), None);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_path_is_not_recorded() {
        let mut api = Endpoints::new(Router::new());
        let err = api
            .post("no-slash", EndpointArgs::new(), |_req, _res| Ok(()))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPath { .. }));
        assert!(api.registry().is_empty());
    }

    #[test]
    fn test_every_verb_registers() {
        let mut api = Endpoints::new(Router::new());
        let noop = |_req: &mut Request, res: &mut Response| -> HandlerResult {
            res.send_status(204);
            Ok(())
        };
        api.get("/v", EndpointArgs::new(), noop).unwrap();
        api.post("/v", EndpointArgs::new(), noop).unwrap();
        api.put("/v", EndpointArgs::new(), noop).unwrap();
        api.delete("/v", EndpointArgs::new(), noop).unwrap();
        api.patch("/v", EndpointArgs::new(), noop).unwrap();
        api.options("/v", EndpointArgs::new(), noop).unwrap();
        api.head("/v", EndpointArgs::new(), noop).unwrap();
        api.trace("/v", EndpointArgs::new(), noop).unwrap();
        api.connect("/v", EndpointArgs::new(), noop).unwrap();
        let methods: Vec<HttpMethod> = api.registry().list().iter().map(|d| d.method).collect();
        assert_eq!(methods, HttpMethod::ALL.to_vec());
        assert_eq!(api.sink().len(), 9);
    }

    #[test]
    fn test_nested_prefix_and_independent_registries() {
        let mut root = Endpoints::new(Router::new());
        let mut v1 = Endpoints::nested(Router::new(), "/v1/");
        root.get("/health", EndpointArgs::new(), |_req, res| {
            res.send("ok");
            Ok(())
        })
        .unwrap();
        v1.get("/items/:id", EndpointArgs::new(), |req, res| {
            res.json(req.params.clone());
            Ok(())
        })
        .unwrap();
        assert_eq!(root.registry().list()[0].path, "/health");
        assert_eq!(v1.registry().list()[0].path, "/v1/items/:id");
        assert_eq!(root.registry().len(), 1);

        let (mut router, _) = root.into_parts();
        let (nested, _) = v1.into_parts();
        router.merge(nested);
        let res = router.handle(RawRequest::new(HttpMethod::Get, "/v1/items/5"));
        assert_eq!(res.body_json(), Some(json!({"id": "5"})));
    }
}
