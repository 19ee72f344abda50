//! # Router Module
//!
//! A small host router that gives the registration pipeline something
//! concrete to register into. It is not an HTTP server: callers hand it a
//! [`RawRequest`] and receive an [`crate::response::HttpResponse`].
//!
//! ## Responsibilities
//!
//! - Compile `:name` path patterns into anchored regexes at registration time
//! - Match requests in registration order (first match wins)
//! - Parse the query string, headers and JSON body into a [`crate::request::Request`]
//! - Enforce the body size limit
//! - Run the matched handler chain and pass chain errors to the
//!   [`ErrorHandler`] stage
//! - Render views for `Response::render` through a `minijinja` environment
//!
//! ## Example
//!
//! ```rust
//! use routeguard::chain::{from_fn, HandlerChain};
//! use routeguard::method::HttpMethod;
//! use routeguard::router::{RawRequest, RouteSink, Router};
//! use serde_json::json;
//!
//! let mut router = Router::new();
//! let hello = from_fn(|req, res, _next| {
//!     let name = req.params["name"].clone();
//!     res.json(json!({ "hello": name }));
//!     Ok(())
//! });
//! router
//!     .add_route(HttpMethod::Get, "/hello/:name", HandlerChain::new(vec![hello]))
//!     .unwrap();
//!
//! let response = router.handle(RawRequest::new(HttpMethod::Get, "/hello/ann"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body_json(), Some(json!({ "hello": "ann" })));
//! ```

mod core;
mod error;
mod raw;

pub use core::{path_params, path_to_regex, RouteSink, Router, DEFAULT_MAX_BODY_BYTES};
pub use error::{DefaultErrorHandler, ErrorHandler, RouteError};
pub use raw::{parse_body, parse_headers, parse_query, RawRequest};
