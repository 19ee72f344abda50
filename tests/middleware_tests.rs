#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{body, get};
use jsonwebtoken::{encode, EncodingKey, Header};
use routeguard::chain::Step;
use routeguard::middleware::{
    CacheLookup, CachePopulate, CacheStore, CachedBody, CachedResponse, JwtClaims, JwtVerify,
    LruCacheStore, RequestSpan,
};
use routeguard::router::{RawRequest, Router};
use routeguard::{EndpointArgs, Endpoints, HttpMethod};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const SECRET: &str = "middleware-secret";

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

fn jwt_router() -> Router {
    jwt_router_with(JwtVerify::hs256(SECRET.as_bytes()).with_issuer("routeguard-tests"))
}

fn jwt_router_with(verify: JwtVerify) -> Router {
    let mut endpoints = Endpoints::new(Router::new());
    endpoints
        .get(
            "/me",
            EndpointArgs::new()
                .before_input_validation(Arc::new(RequestSpan))
                .before_input_validation(Arc::new(verify)),
            |req, res| {
                let sub = req
                    .extensions
                    .get::<JwtClaims>()
                    .map(|c| c.0["sub"].clone())
                    .unwrap_or_default();
                res.json(json!({ "sub": sub }));
                Ok(())
            },
        )
        .unwrap();
    endpoints.into_parts().0
}

fn call_with_auth(router: &Router, value: &str) -> routeguard::HttpResponse {
    router.handle(RawRequest::new(HttpMethod::Get, "/me").header("authorization", value))
}

#[test]
fn test_jwt_rejection_messages() {
    let router = jwt_router();

    let cases = [
        (None, "Missing Authorization Header"),
        (Some("Basic dXNlcjpwYXNz"), "Invalid Authorization Header"),
        (Some("Bearer"), "Missing Token in Authorization Header"),
        (Some("Bearer not.a.jwt"), "Unauthorized"),
    ];
    for (header, expected) in cases {
        let response = match header {
            Some(value) => call_with_auth(&router, value),
            None => get(&router, "/me"),
        };
        assert_eq!(response.status, 401, "header {header:?}");
        assert_eq!(body(&response), json!({ "error": expected }));
    }
}

#[test]
fn test_jwt_claims_reach_handler() {
    let router = jwt_router();
    let key = EncodingKey::from_secret(SECRET.as_bytes());

    let good = encode(
        &Header::default(),
        &json!({ "sub": "ada", "iss": "routeguard-tests", "exp": now() + 300 }),
        &key,
    )
    .unwrap();
    let response = call_with_auth(&router, &format!("Bearer {good}"));
    assert_eq!(response.status, 200);
    assert_eq!(body(&response), json!({ "sub": "ada" }));

    let expired = encode(
        &Header::default(),
        &json!({ "sub": "ada", "iss": "routeguard-tests", "exp": now() - 3600 }),
        &key,
    )
    .unwrap();
    assert_eq!(call_with_auth(&router, &format!("Bearer {expired}")).status, 401);

    let wrong_issuer = encode(
        &Header::default(),
        &json!({ "sub": "ada", "iss": "elsewhere", "exp": now() + 300 }),
        &key,
    )
    .unwrap();
    assert_eq!(call_with_auth(&router, &format!("Bearer {wrong_issuer}")).status, 401);

    let no_exp = encode(
        &Header::default(),
        &json!({ "sub": "ada", "iss": "routeguard-tests" }),
        &key,
    )
    .unwrap();
    assert_eq!(call_with_auth(&router, &format!("Bearer {no_exp}")).status, 401);
}

#[test]
fn test_jwt_exp_can_be_optional() {
    let router = jwt_router_with(JwtVerify::hs256(SECRET.as_bytes()).require_exp(false));
    let key = EncodingKey::from_secret(SECRET.as_bytes());

    let no_exp = encode(&Header::default(), &json!({ "sub": "ada" }), &key).unwrap();
    let response = call_with_auth(&router, &format!("Bearer {no_exp}"));
    assert_eq!(response.status, 200);
    assert_eq!(body(&response), json!({ "sub": "ada" }));

    // a present exp is still enforced
    let expired = encode(
        &Header::default(),
        &json!({ "sub": "ada", "exp": now() - 3600 }),
        &key,
    )
    .unwrap();
    assert_eq!(call_with_auth(&router, &format!("Bearer {expired}")).status, 401);
}

fn cached_router(store: Arc<dyn CacheStore>, calls: Arc<AtomicUsize>) -> Router {
    let lookup: Arc<dyn Step> = Arc::new(CacheLookup::new(Arc::clone(&store)));
    let populate: Arc<dyn Step> = Arc::new(CachePopulate::new(store));
    let mut endpoints = Endpoints::new(Router::new());
    endpoints
        .get(
            "/report/:kind",
            EndpointArgs::new()
                .before_input_validation(lookup)
                .before_response(populate),
            move |req, res| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                match req.param("kind").and_then(|v| v.as_str()).unwrap_or("") {
                    "json" => res.json(json!({ "n": n })),
                    "text" => res.send(format!("n={n}")),
                    _ => res.status(503).json(json!({ "n": n })),
                }
                Ok(())
            },
        )
        .unwrap();
    endpoints.into_parts().0
}

#[test]
fn test_cache_replays_successful_responses() {
    let store = Arc::new(LruCacheStore::new(8));
    let calls = Arc::new(AtomicUsize::new(0));
    let router = cached_router(Arc::clone(&store) as Arc<dyn CacheStore>, Arc::clone(&calls));

    let first = get(&router, "/report/json?x=1");
    let second = get(&router, "/report/json?x=1");
    assert_eq!(body(&first), json!({ "n": 1 }));
    assert_eq!(body(&second), json!({ "n": 1 }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // different query string is a different key
    assert_eq!(body(&get(&router, "/report/json?x=2")), json!({ "n": 2 }));

    let text = get(&router, "/report/text");
    assert_eq!(text.body_text(), "n=3");
    assert_eq!(get(&router, "/report/text").body_text(), "n=3");
    assert_eq!(
        get(&router, "/report/text").header("content-type"),
        Some("text/plain; charset=utf-8")
    );

    assert_eq!(get(&router, "/report/fail").status, 503);
    assert_eq!(body(&get(&router, "/report/fail")), json!({ "n": 5 }));
    assert_eq!(store.len(), 3);
}

#[test]
fn test_cache_store_entries_replay_views() {
    let store = Arc::new(LruCacheStore::new(8));
    store.set(
        "/report/any",
        CachedResponse {
            status: 201,
            body: CachedBody::Render {
                view: "card.html".to_string(),
                context: json!({ "title": "cached" }),
            },
        },
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = cached_router(Arc::clone(&store) as Arc<dyn CacheStore>, Arc::clone(&calls));
    let mut views = minijinja::Environment::new();
    views.add_template("card.html", "<p>{{ title }}</p>").unwrap();
    router = router.with_views(views);

    let response = get(&router, "/report/any");
    assert_eq!(response.status, 201);
    assert_eq!(response.body_text(), "<p>cached</p>");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    store.del("/report/any");
    assert_eq!(get(&router, "/report/any").status, 503);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
