//! # CLI Module
//!
//! Command-line access to the demo users API.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List the registered endpoints in registration order:
//!
//! ```bash
//! routeguard routes
//! routeguard routes --json
//! ```
//!
//! ### `openapi`
//!
//! Print the generated OpenAPI document:
//!
//! ```bash
//! routeguard openapi --format yaml
//! routeguard openapi --output openapi.json
//! ```
//!
//! ### `call`
//!
//! Run one request through the full chain and print the response:
//!
//! ```bash
//! routeguard call POST /users --body '{"name":"Ada","email":"ada@example.com"}'
//! routeguard call GET '/add?a=1&b=2'
//! routeguard call GET /users/1 -H 'authorization: Bearer <token>'
//! ```
//!
//! Every command accepts `--config <FILE>` (YAML or TOML, also
//! `ROUTEGUARD_CONFIG`); `ROUTEGUARD_*` variables override the file.

mod commands;


pub use commands::{run_cli, Cli, Commands};
