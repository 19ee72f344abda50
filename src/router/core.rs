use super::error::{DefaultErrorHandler, ErrorHandler, RouteError};
use super::raw::{parse_body, parse_headers, parse_query, RawRequest};
use crate::chain::{ChainError, HandlerChain};
use crate::ids::RequestId;
use crate::method::HttpMethod;
use crate::request::Request;
use crate::response::{HttpResponse, Response};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Host-side contract consumed by the registration pipeline: register a
/// composed chain under `(method, path)`.
pub trait RouteSink {
    /// # Errors
    ///
    /// Returns [`RouteError`] when the path pattern cannot be compiled.
    fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        chain: HandlerChain,
    ) -> Result<(), RouteError>;
}

impl<S: RouteSink + ?Sized> RouteSink for &mut S {
    fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        chain: HandlerChain,
    ) -> Result<(), RouteError> {
        (**self).add_route(method, path, chain)
    }
}

#[derive(Clone)]
struct Route {
    method: HttpMethod,
    pattern: String,
    regex: Regex,
    param_names: Vec<String>,
    chain: HandlerChain,
}

/// Reference host router.
///
/// Routes are tried in registration order and the first match wins. A
/// `:name` segment captures one path segment, percent-decoded, into
/// `params.name`.
#[derive(Clone)]
pub struct Router {
    routes: Vec<Route>,
    error_handler: Arc<dyn ErrorHandler>,
    views: Option<Arc<minijinja::Environment<'static>>>,
    max_body_bytes: usize,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_table())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Router {
            routes: Vec::new(),
            error_handler: Arc::new(DefaultErrorHandler),
            views: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_error_handler<H: ErrorHandler + 'static>(mut self, handler: H) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Environment used to render views emitted with `Response::render`.
    #[must_use]
    pub fn with_views(mut self, env: minijinja::Environment<'static>) -> Self {
        self.views = Some(Arc::new(env));
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Append the routes of `other` after the routes of `self`.
    pub fn merge(&mut self, other: Router) {
        info!(
            merged_routes = other.routes.len(),
            total_routes = self.routes.len() + other.routes.len(),
            "Router merged"
        );
        self.routes.extend(other.routes);
    }

    /// `(method, pattern)` pairs in registration order.
    #[must_use]
    pub fn route_table(&self) -> Vec<(HttpMethod, String)> {
        self.routes
            .iter()
            .map(|r| (r.method, r.pattern.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the chain for `(method, path)` and its percent-decoded params.
    #[must_use]
    pub fn route(&self, method: HttpMethod, path: &str) -> Option<(&HandlerChain, Value)> {
        debug!(method = %method, path = %path, "Route match attempt");
        for route in self.routes.iter().filter(|r| r.method == method) {
            let Some(caps) = route.regex.captures(path) else {
                continue;
            };
            let mut params = Map::new();
            for (i, name) in route.param_names.iter().enumerate() {
                let raw = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                let decoded = urlencoding::decode(raw)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                params.insert(name.clone(), Value::String(decoded));
            }
            debug!(
                method = %method,
                path = %path,
                route_pattern = %route.pattern,
                "Route matched"
            );
            return Some((&route.chain, Value::Object(params)));
        }
        None
    }

    /// Run one request through the matching chain and finalize the response.
    pub fn handle(&self, raw: RawRequest) -> HttpResponse {
        let (path, query) = match raw.target.split_once('?') {
            Some((p, q)) => (p.to_string(), q),
            None => (raw.target.clone(), ""),
        };

        let Some((chain, params)) = self.route(raw.method, &path) else {
            warn!(method = %raw.method, path = %path, "No route matched");
            return HttpResponse::json(
                404,
                &json!({ "error": "Not Found", "method": raw.method.as_str(), "path": path }),
            );
        };

        let headers = parse_headers(&raw.headers);
        let request_id = RequestId::from_header_or_new(
            headers.get("x-request-id").and_then(Value::as_str),
        );
        let mut req = Request::new(raw.method, &raw.target)
            .with_params(params)
            .with_query(parse_query(query))
            .with_headers(headers);
        req.request_id = request_id;
        let mut res = Response::new();

        let outcome = if raw.body.len() > self.max_body_bytes {
            Err(ChainError::PayloadTooLarge {
                limit: self.max_body_bytes,
                actual: raw.body.len(),
            })
        } else {
            match parse_body(&raw.body, req.header("content-type")) {
                Ok(body) => {
                    req.body = body;
                    chain.run(&mut req, &mut res)
                }
                Err(e) => Err(e),
            }
        };

        if let Err(err) = outcome {
            self.error_handler.handle(&err, &req, &mut res);
        }

        let response = res.finalize(self.views.as_deref());
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            status = response.status,
            "Request handled"
        );
        response
    }
}

impl RouteSink for Router {
    fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        chain: HandlerChain,
    ) -> Result<(), RouteError> {
        let (regex, param_names) = path_to_regex(path)?;
        self.routes.push(Route {
            method,
            pattern: path.to_string(),
            regex,
            param_names,
            chain,
        });
        info!(
            method = %method,
            path = %path,
            total_routes = self.routes.len(),
            "Route registered"
        );
        Ok(())
    }
}

/// Check a `:name` path pattern and return its placeholder names in order.
///
/// # Errors
///
/// Returns [`RouteError::InvalidPath`] when the path does not start with `/`
/// or a placeholder name is empty or not an identifier.
pub fn path_params(path: &str) -> Result<Vec<String>, RouteError> {
    if !path.starts_with('/') {
        return Err(RouteError::InvalidPath {
            path: path.to_string(),
            reason: "must start with '/'".to_string(),
        });
    }
    let mut names = Vec::new();
    for segment in path.split('/') {
        let Some(name) = segment.strip_prefix(':') else {
            continue;
        };
        let mut chars = name.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(RouteError::InvalidPath {
                path: path.to_string(),
                reason: format!("invalid placeholder ':{name}'"),
            });
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Convert a `:name` pattern into an anchored regex plus placeholder names.
///
/// `/users/:id` becomes `^/users/([^/]+)$`; literal segments are escaped.
/// A trailing slash is optional.
///
/// # Errors
///
/// Returns [`RouteError`] for invalid patterns.
pub fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), RouteError> {
    let param_names = path_params(path)?;
    let mut pattern = String::with_capacity(path.len() + 8);
    pattern.push('^');
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        pattern.push('/');
        if segment.starts_with(':') {
            pattern.push_str("([^/]+)");
        } else {
            pattern.push_str(&regex::escape(segment));
        }
    }
    if param_names.is_empty() && pattern.len() == 1 {
        pattern.push('/');
    } else {
        pattern.push_str("/?");
    }
    pattern.push('$');
    let regex = Regex::new(&pattern).map_err(|e| RouteError::Pattern {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok((regex, param_names))
}
