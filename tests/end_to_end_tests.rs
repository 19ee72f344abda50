#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{body, get, post_json};
use jsonwebtoken::{encode, EncodingKey, Header};
use routeguard::config::GuardConfig;
use routeguard::demo::build_app;
use routeguard::openapi::DocFormat;
use routeguard::router::RawRequest;
use routeguard::{HttpMethod, UnknownFields};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

fn token(secret: &str, ttl_secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    encode(
        &Header::default(),
        &json!({ "sub": "tester", "exp": now + ttl_secs }),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_create_and_fetch_user() {
    let app = build_app(&GuardConfig::default()).unwrap();

    let created = post_json(
        &app.router,
        "/users",
        &json!({ "name": "Ada", "email": "ada@example.com" }),
    );
    assert_eq!(created.status, 200);
    assert_eq!(
        body(&created),
        json!({ "id": 1, "name": "Ada", "email": "ada@example.com" })
    );

    let fetched = get(&app.router, "/users/1");
    assert_eq!(fetched.status, 200);
    assert_eq!(body(&fetched)["name"], "Ada");

    let missing = get(&app.router, "/users/99");
    assert_eq!(missing.status, 404);
    assert_eq!(body(&missing), json!({ "error": "User not found" }));
}

#[test]
fn test_invalid_input_never_reaches_handler() {
    let app = build_app(&GuardConfig::default()).unwrap();

    let bad_email = post_json(
        &app.router,
        "/users",
        &json!({ "name": "Ada", "email": "not-an-email" }),
    );
    assert_eq!(bad_email.status, 400);
    assert_eq!(body(&bad_email)["error"][0]["path"], "/email");

    let missing_name = post_json(&app.router, "/users", &json!({ "email": "a@b.io" }));
    assert_eq!(missing_name.status, 400);

    let bad_id = get(&app.router, "/users/abc");
    assert_eq!(bad_id.status, 400);
    let zero_id = get(&app.router, "/users/0");
    assert_eq!(zero_id.status, 400);

    assert!(app.users.get(1).is_none());
}

#[test]
fn test_query_numbers_are_coerced() {
    let app = build_app(&GuardConfig::default()).unwrap();
    let sum = get(&app.router, "/add?a=2&b=40");
    assert_eq!(sum.status, 200);
    assert_eq!(body(&sum)["result"].as_f64(), Some(42.0));

    let bad = get(&app.router, "/add?a=2&b=forty");
    assert_eq!(bad.status, 400);
    assert_eq!(body(&bad)["error"][0]["path"], "/b");

    let missing = get(&app.router, "/add?a=2");
    assert_eq!(missing.status, 400);
}

#[test]
fn test_user_card_renders_view() {
    let app = build_app(&GuardConfig::default()).unwrap();
    post_json(
        &app.router,
        "/users",
        &json!({ "name": "Grace", "email": "grace@example.com" }),
    );

    let card = get(&app.router, "/users/1/card");
    assert_eq!(card.status, 200);
    assert_eq!(card.header("content-type"), Some("text/html; charset=utf-8"));
    assert!(card.body_text().contains("<h1>Grace</h1>"));

    let missing = get(&app.router, "/users/7/card");
    assert_eq!(missing.status, 404);
}

#[test]
fn test_only_successful_lookups_are_cached() {
    let app = build_app(&GuardConfig::default()).unwrap();

    assert_eq!(get(&app.router, "/users/1").status, 404);
    post_json(
        &app.router,
        "/users",
        &json!({ "name": "Linus", "email": "linus@example.com" }),
    );
    let first = get(&app.router, "/users/1");
    assert_eq!(first.status, 200);
    let second = get(&app.router, "/users/1");
    assert_eq!(second.status, 200);
    assert_eq!(first.body, second.body);
}

#[test]
fn test_jwt_guards_user_lookup() {
    let config = GuardConfig {
        auth: routeguard::config::AuthConfig {
            jwt_secret: Some("s3cret".to_string()),
        },
        ..GuardConfig::default()
    };
    let app = build_app(&config).unwrap();
    post_json(
        &app.router,
        "/users",
        &json!({ "name": "Ada", "email": "ada@example.com" }),
    );

    let anonymous = get(&app.router, "/users/1");
    assert_eq!(anonymous.status, 401);
    assert_eq!(
        body(&anonymous),
        json!({ "error": "Missing Authorization Header" })
    );

    let authed = app.router.handle(
        RawRequest::new(HttpMethod::Get, "/users/1")
            .header("Authorization", &format!("Bearer {}", token("s3cret", 600))),
    );
    assert_eq!(authed.status, 200);

    // cached response must not leak past the auth step
    let forged = app.router.handle(
        RawRequest::new(HttpMethod::Get, "/users/1")
            .header("Authorization", &format!("Bearer {}", token("other", 600))),
    );
    assert_eq!(forged.status, 401);
    assert_eq!(body(&forged), json!({ "error": "Unauthorized" }));
}

#[test]
fn test_body_limit_and_malformed_json() {
    let mut config = GuardConfig::default();
    config.http.max_body_bytes = 32;
    let app = build_app(&config).unwrap();

    let big = post_json(
        &app.router,
        "/users",
        &json!({ "name": "A".repeat(64), "email": "a@b.io" }),
    );
    assert_eq!(big.status, 413);
    assert_eq!(body(&big), json!({ "error": "Payload Too Large" }));

    let malformed = app.router.handle(
        RawRequest::new(HttpMethod::Post, "/users")
            .header("content-type", "application/json")
            .body("{\"name\":"),
    );
    assert_eq!(malformed.status, 400);
}

#[test]
fn test_unknown_route_is_404() {
    let app = build_app(&GuardConfig::default()).unwrap();
    let response = app.router.handle(RawRequest::new(HttpMethod::Delete, "/users/1"));
    assert_eq!(response.status, 404);
    assert_eq!(
        body(&response),
        json!({ "error": "Not Found", "method": "DELETE", "path": "/users/1" })
    );
}

#[test]
fn test_strip_policy_from_config() {
    let mut config = GuardConfig::default();
    config.validation.unknown_fields = UnknownFields::Strip;
    let app = build_app(&config).unwrap();

    let created = post_json(
        &app.router,
        "/users",
        &json!({ "name": "Ada", "email": "ada@example.com", "admin": true }),
    );
    assert_eq!(created.status, 200);
    assert!(body(&created).get("admin").is_none());

    config.validation.unknown_fields = UnknownFields::Reject;
    let app = build_app(&config).unwrap();
    let rejected = post_json(
        &app.router,
        "/users",
        &json!({ "name": "Ada", "email": "ada@example.com", "admin": true }),
    );
    assert_eq!(rejected.status, 400);
}

#[test]
fn test_document_and_introspection_routes() {
    let mut config = GuardConfig::default();
    config.docs.title = "Users".to_string();
    config.docs.format = DocFormat::Yaml;
    let app = build_app(&config).unwrap();

    let doc = get(&app.router, "/openapi");
    assert_eq!(doc.status, 200);
    assert_eq!(doc.header("content-type"), Some("application/yaml"));
    let parsed: Value = serde_yaml::from_str(&doc.body_text()).unwrap();
    assert_eq!(parsed["info"]["title"], "Users");

    let listing = body(&get(&app.router, "/endpoints"));
    let routes: Vec<String> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|d| format!("{} {}", d["method"].as_str().unwrap(), d["path"].as_str().unwrap()))
        .collect();
    assert_eq!(
        routes,
        vec!["post /users", "get /users/:id", "get /users/:id/card", "get /add"]
    );
}
