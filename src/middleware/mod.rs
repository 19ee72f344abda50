//! Policy steps that plug into a route's chain through `EndpointArgs`.
//!
//! None of these are required by the validation pipeline; they are ordinary
//! chain steps.

mod auth;
mod cache;
mod tracing;

pub use self::auth::{JwtClaims, JwtVerify};
pub use self::cache::{
    CacheLookup, CachePopulate, CacheStore, CachedBody, CachedResponse, LruCacheStore,
};
pub use self::tracing::RequestSpan;
