#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{body, get, post_json, schema};
use routeguard::router::{RawRequest, Router};
use routeguard::{EndpointArgs, Endpoints, HttpMethod, InputSchema, OutputEntry, UnknownFields};
use serde_json::json;

fn echo_router(input: InputSchema, policy: UnknownFields) -> Router {
    let mut endpoints = Endpoints::new(Router::new()).with_unknown_fields(policy);
    endpoints
        .post(
            "/echo/:id",
            EndpointArgs::new().input(input),
            |req, res| {
                res.json(json!({
                    "query": req.query.clone(),
                    "body": req.body.clone(),
                    "params": req.params.clone(),
                    "limit_value": req.headers.get("x-limit").cloned(),
                }));
                Ok(())
            },
        )
        .unwrap();
    endpoints.into_parts().0
}

#[test]
fn test_query_params_and_headers_are_coerced() {
    let router = echo_router(
        InputSchema::default()
            .query(schema(json!({
                "type": "object",
                "properties": {
                    "page": { "type": "integer" },
                    "active": { "type": "boolean" },
                    "since": { "type": "string", "format": "date-time" },
                    "tags": { "type": "array", "items": { "type": "number" } }
                },
                "required": ["page"]
            })))
            .params(schema(json!({
                "type": "object",
                "properties": { "id": { "type": "integer" } },
                "required": ["id"]
            })))
            .headers(schema(json!({
                "type": "object",
                "properties": { "x-limit": { "type": "integer", "maximum": 100 } }
            }))),
        UnknownFields::Passthrough,
    );

    let response = router.handle(
        RawRequest::new(
            HttpMethod::Post,
            "/echo/7?page=2&active=TRUE&since=1700000000000&tags=1&tags=2.5",
        )
        .header("X-Limit", "50")
        .json(&json!({})),
    );
    assert_eq!(response.status, 200);
    let echoed = body(&response);
    assert_eq!(
        echoed["query"],
        json!({
            "page": 2,
            "active": true,
            "since": "2023-11-14T22:13:20.000Z",
            "tags": [1, 2.5]
        })
    );
    assert_eq!(echoed["params"], json!({ "id": 7 }));
    assert_eq!(echoed["limit_value"], json!(50));
}

#[test]
fn test_unconvertible_value_is_rejected_with_field_detail() {
    let router = echo_router(
        InputSchema::default().query(schema(json!({
            "type": "object",
            "properties": { "page": { "type": "integer" } }
        }))),
        UnknownFields::Passthrough,
    );
    let response = router.handle(RawRequest::new(HttpMethod::Post, "/echo/1?page=two"));
    assert_eq!(response.status, 400);
    let error = body(&response)["error"].clone();
    let issues = error.as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["path"], "/page");
}

#[test]
fn test_first_failing_part_short_circuits() {
    let router = echo_router(
        InputSchema::default()
            .query(schema(json!({
                "type": "object",
                "properties": { "a": { "type": "number" } },
                "required": ["a"]
            })))
            .body(schema(json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }))),
        UnknownFields::Passthrough,
    );

    let response = post_json(&router, "/echo/1?a=nope", &json!({}));
    assert_eq!(response.status, 400);
    let issues = body(&response)["error"].as_array().unwrap().clone();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["path"], "/a");

    let response = post_json(&router, "/echo/1?a=1", &json!({}));
    assert_eq!(response.status, 400);
    let message = body(&response)["error"][0]["message"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("name"), "unexpected message: {message}");
}

#[test]
fn test_empty_input_schema_installs_no_validator() {
    let router = echo_router(InputSchema::default(), UnknownFields::Reject);
    let response = post_json(&router, "/echo/x?anything=1", &json!({ "free": true }));
    assert_eq!(response.status, 200);
    assert_eq!(body(&response)["params"], json!({ "id": "x" }));
}

#[test]
fn test_strip_policy_removes_undeclared_keys() {
    let router = echo_router(
        InputSchema::default().body(schema(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "address": {
                    "type": "object",
                    "properties": { "city": { "type": "string" } }
                }
            }
        }))),
        UnknownFields::Strip,
    );
    let response = post_json(
        &router,
        "/echo/1",
        &json!({ "name": "a", "admin": true, "address": { "city": "Oslo", "zip": "0150" } }),
    );
    assert_eq!(response.status, 200);
    assert_eq!(
        body(&response)["body"],
        json!({ "name": "a", "address": { "city": "Oslo" } })
    );
}

#[test]
fn test_route_policy_overrides_collection_default() {
    let mut endpoints = Endpoints::new(Router::new());
    endpoints
        .post(
            "/strict",
            EndpointArgs::new()
                .unknown_fields(UnknownFields::Reject)
                .input(InputSchema::default().body(schema(json!({
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                })))),
            |_req, res| {
                res.send_status(204);
                Ok(())
            },
        )
        .unwrap();
    let router = endpoints.into_parts().0;

    let response = post_json(&router, "/strict", &json!({ "name": "a", "role": "admin" }));
    assert_eq!(response.status, 400);
    assert_eq!(body(&response)["error"][0]["path"], "/role");

    let response = post_json(&router, "/strict", &json!({ "name": "a" }));
    assert_eq!(response.status, 204);
}

fn contract_router() -> Router {
    let mut endpoints = Endpoints::new(Router::new());
    endpoints
        .get(
            "/items/:kind",
            EndpointArgs::new()
                .output(OutputEntry::new(200).body(schema(json!({
                    "type": "object",
                    "properties": { "id": { "type": "integer" } },
                    "required": ["id"]
                }))))
                .output(OutputEntry::new(200).body(schema(json!({
                    "type": "object",
                    "properties": { "code": { "type": "string" } },
                    "required": ["code"]
                }))))
                .output(OutputEntry::new(204).description("Nothing"))
                .output(OutputEntry::new(202).body(schema(json!({ "type": "string" })))),
            |req, res| {
                match req.param("kind").and_then(|v| v.as_str()).unwrap_or("") {
                    "id" => res.json(json!({ "id": 1 })),
                    "code" => res.json(json!({ "code": "A1" })),
                    "bad" => res.json(json!({ "id": "one" })),
                    "empty" => res.send_status(204),
                    "text" => res.status(202).send("queued"),
                    "bytes" => res.status(202).send(vec![0_u8, 1, 2]),
                    "undeclared" => res.status(409).json(json!({ "anything": [1, 2] })),
                    _ => res.send_status(404),
                }
                Ok(())
            },
        )
        .unwrap();
    endpoints.into_parts().0
}

#[test]
fn test_payload_matching_any_entry_is_sent() {
    let router = contract_router();
    let response = get(&router, "/items/id");
    assert_eq!(response.status, 200);
    assert_eq!(body(&response), json!({ "id": 1 }));

    let response = get(&router, "/items/code");
    assert_eq!(response.status, 200);
    assert_eq!(body(&response), json!({ "code": "A1" }));
}

#[test]
fn test_contract_violation_is_opaque_500() {
    let router = contract_router();
    let response = get(&router, "/items/bad");
    assert_eq!(response.status, 500);
    assert_eq!(body(&response), json!({ "error": "Internal server error" }));
    assert_eq!(response.header("content-type"), Some("application/json"));
}

#[test]
fn test_other_primitives_are_checked() {
    let router = contract_router();

    let response = get(&router, "/items/empty");
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());

    let response = get(&router, "/items/text");
    assert_eq!(response.status, 202);
    assert_eq!(response.body_text(), "queued");

    let response = get(&router, "/items/bytes");
    assert_eq!(response.status, 500);
}

#[test]
fn test_undeclared_status_is_not_checked() {
    let router = contract_router();
    let response = get(&router, "/items/undeclared");
    assert_eq!(response.status, 409);
    assert_eq!(body(&response), json!({ "anything": [1, 2] }));

    let response = get(&router, "/items/other");
    assert_eq!(response.status, 404);
}
