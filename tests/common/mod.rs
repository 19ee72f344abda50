#![allow(dead_code)]

use routeguard::router::{RawRequest, Router};
use routeguard::schema::Schema;
use routeguard::{HttpMethod, HttpResponse};
use serde_json::Value;

pub fn schema(doc: Value) -> Schema {
    Schema::json(doc).expect("test schema should compile")
}

pub fn get(router: &Router, target: &str) -> HttpResponse {
    router.handle(RawRequest::new(HttpMethod::Get, target))
}

pub fn post_json(router: &Router, target: &str, body: &Value) -> HttpResponse {
    router.handle(RawRequest::new(HttpMethod::Post, target).json(body))
}

pub fn body(response: &HttpResponse) -> Value {
    response
        .body_json()
        .unwrap_or_else(|| panic!("expected JSON body, got {:?}", response.body_text()))
}
