//! Users API wired through the registration pipeline.
//!
//! | Route                 | Input                              | Outputs            |
//! |-----------------------|------------------------------------|--------------------|
//! | `POST /users`         | body `{name, email}`               | 200 user           |
//! | `GET /users/:id`      | params `{id: integer >= 1}`        | 200 user, 404      |
//! | `GET /users/:id/card` | params `{id}`                      | 200 (HTML view)    |
//! | `GET /add`            | query `{a: number, b: number}`     | 200 `{result}`     |
//! | `GET /openapi`        | document (JSON or YAML per config) |                    |
//! | `GET /endpoints`      | registry listing                   |                    |
//!
//! When `auth.jwt_secret` is configured, `GET /users/:id` requires a bearer
//! token. User lookups are cached by URL.

use crate::chain::Step;
use crate::config::GuardConfig;
use crate::endpoints::{EndpointArgs, Endpoints};
use crate::middleware::{CacheLookup, CachePopulate, CacheStore, JwtVerify, LruCacheStore, RequestSpan};
use crate::openapi::{generate, mount_docs, DocumentOptions};
use crate::registry::{EndpointRegistry, InputSchema, OutputEntry};
use crate::router::Router;
use crate::schema::Schema;
use crate::typed::{typed, Reply, TypedRequest};
use anyhow::Context;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

const USER_CARD: &str = "<article class=\"user\"><h1>{{ name }}</h1><a href=\"mailto:{{ email }}\">{{ email }}</a></article>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct NewUser {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UserPath {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct AddQuery {
    a: f64,
    b: f64,
}

#[derive(Debug, Serialize)]
struct AddResult {
    result: f64,
}

/// In-memory user table; ids start at 1.
#[derive(Debug, Default)]
pub struct UserStore {
    users: Mutex<Vec<User>>,
}

impl UserStore {
    pub fn insert(&self, name: String, email: String) -> User {
        let mut users = self.users.lock();
        let user = User {
            id: users.len() as u64 + 1,
            name,
            email,
        };
        users.push(user.clone());
        user
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<User> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.users.lock().get(index).cloned()
    }
}

/// The assembled demo: router, registry and the generated document.
#[derive(Debug)]
pub struct DemoApp {
    pub router: Router,
    pub registry: EndpointRegistry,
    pub document: Value,
    pub users: Arc<UserStore>,
}

fn user_schema() -> anyhow::Result<Schema> {
    Schema::json(json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer" },
            "name": { "type": "string" },
            "email": { "type": "string", "format": "email" }
        },
        "required": ["id", "name", "email"]
    }))
    .context("user schema")
}

fn error_schema() -> anyhow::Result<Schema> {
    Schema::json(json!({
        "type": "object",
        "properties": { "error": { "type": "string" } },
        "required": ["error"]
    }))
    .context("error schema")
}

fn id_params() -> anyhow::Result<Schema> {
    Schema::json(json!({
        "type": "object",
        "properties": { "id": { "type": "integer", "minimum": 1 } },
        "required": ["id"]
    }))
    .context("id params schema")
}

fn views() -> anyhow::Result<minijinja::Environment<'static>> {
    let mut env = minijinja::Environment::new();
    env.add_template("user_card.html", USER_CARD)
        .context("user card template")?;
    Ok(env)
}

/// Build the demo application from `config`.
///
/// # Errors
///
/// Fails when a schema does not compile or a route cannot be registered.
pub fn build_app(config: &GuardConfig) -> anyhow::Result<DemoApp> {
    let users = Arc::new(UserStore::default());
    let cache: Arc<dyn CacheStore> = Arc::new(LruCacheStore::new(256));
    let span: Arc<dyn Step> = Arc::new(RequestSpan);

    let router = Router::new()
        .with_max_body_bytes(config.http.max_body_bytes)
        .with_views(views()?);
    let mut endpoints =
        Endpoints::new(router).with_unknown_fields(config.validation.unknown_fields);

    let store = Arc::clone(&users);
    endpoints.post(
        "/users",
        EndpointArgs::new()
            .summary("Create a new user")
            .operation_id("createUser")
            .before_input_validation(Arc::clone(&span))
            .input(InputSchema::default().body(Schema::json(json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "email": { "type": "string", "format": "email" }
                },
                "required": ["name", "email"]
            }))?))
            .output(
                OutputEntry::new(200)
                    .description("Created user")
                    .body(user_schema()?),
            ),
        typed(move |req: TypedRequest<NewUser>| -> anyhow::Result<Reply<User>> {
            Ok(Reply::ok(store.insert(req.body.name, req.body.email)))
        }),
    )?;

    let mut get_user = EndpointArgs::new()
        .summary("Fetch a user by id")
        .operation_id("getUser")
        .before_input_validation(Arc::clone(&span));
    if let Some(secret) = &config.auth.jwt_secret {
        get_user = get_user.before_input_validation(Arc::new(JwtVerify::hs256(secret.as_bytes())));
    }
    let store = Arc::clone(&users);
    endpoints.get(
        "/users/:id",
        get_user
            .before_input_validation(Arc::new(CacheLookup::new(Arc::clone(&cache))))
            .input(InputSchema::default().params(id_params()?))
            .output(OutputEntry::new(200).description("The user").body(user_schema()?))
            .output(
                OutputEntry::new(404)
                    .description("No such user")
                    .body(error_schema()?),
            )
            .before_response(Arc::new(CachePopulate::new(Arc::clone(&cache)))),
        typed(
            move |req: TypedRequest<Value, Value, UserPath>| -> anyhow::Result<Reply<Value>> {
                Ok(match store.get(req.params.id) {
                    Some(user) => Reply::ok(serde_json::to_value(user)?),
                    None => Reply::with_status(404, json!({ "error": "User not found" })),
                })
            },
        ),
    )?;

    let store = Arc::clone(&users);
    endpoints.get(
        "/users/:id/card",
        EndpointArgs::new()
            .summary("Render a user card")
            .operation_id("userCard")
            .before_input_validation(Arc::clone(&span))
            .input(InputSchema::default().params(id_params()?))
            .output(OutputEntry::new(200).description("HTML card"))
            .output(
                OutputEntry::new(404)
                    .description("No such user")
                    .body(error_schema()?),
            ),
        move |req, res| {
            let id: UserPath = req.params_as()?;
            match store.get(id.id) {
                Some(user) => res.render("user_card.html", serde_json::to_value(user)?),
                None => res.status(404).json(json!({ "error": "User not found" })),
            }
            Ok(())
        },
    )?;

    endpoints.get(
        "/add",
        EndpointArgs::new()
            .summary("Add two numbers")
            .operation_id("add")
            .before_input_validation(span)
            .input(InputSchema::default().query(Schema::json(json!({
                "type": "object",
                "properties": {
                    "a": { "type": "number" },
                    "b": { "type": "number" }
                },
                "required": ["a", "b"]
            }))?))
            .output(OutputEntry::new(200).body(Schema::json(json!({
                "type": "object",
                "properties": { "result": { "type": "number" } },
                "required": ["result"]
            }))?)),
        typed(
            |req: TypedRequest<Value, AddQuery>| -> anyhow::Result<Reply<AddResult>> {
                Ok(Reply::ok(AddResult {
                    result: req.query.a + req.query.b,
                }))
            },
        ),
    )?;

    let (mut router, registry) = endpoints.into_parts();

    let mut options = DocumentOptions::new(&config.docs.title, &config.docs.version)
        .endpoints(registry.snapshot())
        .common_response(
            OutputEntry::new(500)
                .description("Internal server error")
                .body(error_schema()?),
        );
    for server in &config.docs.servers {
        options = options.server(server);
    }
    mount_docs(
        &mut router,
        "/openapi",
        "/endpoints",
        &options,
        config.docs.format,
    )?;
    let document = generate(&options);

    Ok(DemoApp {
        router,
        registry,
        document,
        users,
    })
}
