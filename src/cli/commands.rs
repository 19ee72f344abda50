use crate::config::GuardConfig;
use crate::demo::build_app;
use crate::method::HttpMethod;
use crate::openapi::{render_document, DocFormat};
use crate::router::RawRequest;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Command-line interface for routeguard
#[derive(Parser, Debug)]
#[command(name = "routeguard")]
#[command(about = "Schema-validated route chains and OpenAPI documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(short, long, global = true, env = "ROUTEGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered endpoints in registration order
    Routes {
        /// Print the introspection JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the generated OpenAPI document
    Openapi {
        /// json or yaml (defaults to docs.format from the config)
        #[arg(short, long)]
        format: Option<DocFormat>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run one request through the router and print the response
    Call {
        /// HTTP method (GET, POST, ...)
        method: HttpMethod,

        /// Path plus optional query string
        target: String,

        /// Request body, sent as application/json unless a content-type header is given
        #[arg(short, long)]
        body: Option<String>,

        /// Request header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

pub(super) fn parse_header(raw: &str) -> anyhow::Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("invalid header '{raw}' (expected 'name: value')");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("invalid header '{raw}' (empty name)");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Execute `cli`, writing command output to `out`.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be loaded
/// - The demo application fails to build
/// - A `--header` argument is malformed
/// - Writing the output fails
pub fn run_cli(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let config = GuardConfig::resolve(cli.config.as_deref()).context("loading configuration")?;
    let app = build_app(&config)?;

    match &cli.command {
        Commands::Routes { json } => {
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&app.registry.to_json())?)?;
            } else {
                for descriptor in app.registry.list() {
                    writeln!(
                        out,
                        "{:<8} {:<20} {}",
                        descriptor.method.as_str(),
                        descriptor.path,
                        descriptor.summary.as_deref().unwrap_or("")
                    )?;
                }
            }
        }
        Commands::Openapi { format, output } => {
            let format = format.unwrap_or(config.docs.format);
            let (_, text) = render_document(&app.document, format)?;
            match output {
                Some(path) => std::fs::write(path, text)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => writeln!(out, "{}", text.trim_end())?,
            }
        }
        Commands::Call {
            method,
            target,
            body,
            headers,
        } => {
            let mut raw = RawRequest::new(*method, target.as_str());
            for header in headers {
                let (name, value) = parse_header(header)?;
                raw = raw.header(&name, &value);
            }
            if let Some(body) = body {
                if !raw
                    .headers
                    .iter()
                    .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                {
                    raw = raw.header("content-type", "application/json");
                }
                raw = raw.body(body.as_bytes().to_vec());
            }
            let response = app.router.handle(raw);
            writeln!(out, "HTTP {}", response.status)?;
            for (name, value) in &response.headers {
                writeln!(out, "{name}: {value}")?;
            }
            writeln!(out)?;
            writeln!(out, "{}", response.body_text())?;
        }
    }
    Ok(())
}
