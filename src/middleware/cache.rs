//! Response cache keyed by original URL.
//!
//! Two steps share one [`CacheStore`]:
//!
//! - [`CacheLookup`] (register as `before_input_validation`) replays a cached
//!   response through the normal emission primitives and halts the chain
//! - [`CachePopulate`] (register as `before_response`) stores the finished
//!   response when its status is 2xx
//!
//! Only JSON, text and view emissions are cached. The store decides eviction.

use crate::chain::{HandlerResult, Next, Step};
use crate::request::Request;
use crate::response::{Response, Sent};
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Payload of a cached response.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedBody {
    Json(Value),
    Send(String),
    Render { view: String, context: Value },
}

/// Cached response: status plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub body: CachedBody,
}

/// Pluggable cache backend.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedResponse>;
    fn set(&self, key: &str, value: CachedResponse);
    fn del(&self, key: &str);
}

/// In-process LRU store.
pub struct LruCacheStore {
    inner: Mutex<LruCache<String, CachedResponse>>,
}

impl LruCacheStore {
    /// Store holding at most `capacity` responses (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        LruCacheStore {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl CacheStore for LruCacheStore {
    fn get(&self, key: &str) -> Option<CachedResponse> {
        self.inner.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: CachedResponse) {
        self.inner.lock().put(key.to_string(), value);
    }

    fn del(&self, key: &str) {
        self.inner.lock().pop(key);
    }
}

/// Replays a cached response when one exists for the request URL.
pub struct CacheLookup {
    store: Arc<dyn CacheStore>,
}

impl CacheLookup {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        CacheLookup { store }
    }
}

impl Step for CacheLookup {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        let Some(cached) = self.store.get(&req.original_url) else {
            return next.run(req, res);
        };
        debug!(
            request_id = %req.request_id,
            key = %req.original_url,
            status = cached.status,
            "Cache hit"
        );
        res.status(cached.status);
        match cached.body {
            CachedBody::Json(value) => res.json(value),
            CachedBody::Send(text) => res.send(text),
            CachedBody::Render { view, context } => res.render(&view, context),
        }
        Ok(())
    }
}

/// Stores finished 2xx responses under the request URL.
pub struct CachePopulate {
    store: Arc<dyn CacheStore>,
}

impl CachePopulate {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        CachePopulate { store }
    }
}

impl Step for CachePopulate {
    fn handle(&self, req: &mut Request, res: &mut Response, next: Next<'_>) -> HandlerResult {
        let status = res.status_code();
        if (200..300).contains(&status) {
            let body = match res.sent() {
                Some(Sent::Json(value)) => Some(CachedBody::Json(value.clone())),
                Some(Sent::Text(text)) => Some(CachedBody::Send(text.clone())),
                Some(Sent::View { name, context }) => Some(CachedBody::Render {
                    view: name.clone(),
                    context: context.clone(),
                }),
                _ => None,
            };
            if let Some(body) = body {
                debug!(request_id = %req.request_id, key = %req.original_url, "Cache store");
                self.store
                    .set(&req.original_url, CachedResponse { status, body });
            }
        }
        next.run(req, res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lru_evicts_oldest() {
        let store = LruCacheStore::new(1);
        let entry = |n: i64| CachedResponse {
            status: 200,
            body: CachedBody::Json(json!(n)),
        };
        store.set("/a", entry(1));
        store.set("/b", entry(2));
        assert!(store.get("/a").is_none());
        assert_eq!(store.get("/b"), Some(entry(2)));
        store.del("/b");
        assert!(store.is_empty());
    }
}
