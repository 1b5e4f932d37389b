//! Bleemeo command-line client
//!
//! Thin wrapper over `bleemeo-client`:
//! 1. Loads the TOML config and secrets
//! 2. Runs one CRUD or list command against the API
//! 3. Revokes the session's refresh token before exiting

mod cli;
mod config;
mod metrics;

use anyhow::{Context, Result};
use bleemeo_client::{ApiResponse, Client};
use futures_util::TryStreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, USAGE};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = Cli::parse(&args)?;
    init_tracing(cli.json_logs);
    let prometheus = if cli.metrics {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    if cli.command == Command::Help {
        print!("{USAGE}");
        return Ok(());
    }

    let (config_path, explicit) = Config::resolve_path(cli.config_path.as_deref());
    debug!(path = %config_path.display(), explicit, "loading configuration");
    let config = if explicit {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    }
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let client =
        Client::new(config.into_client_config()).context("failed to configure Bleemeo client")?;
    info!(api_url = %client.api_url(), "configuration loaded");

    // `tokens` hands the refresh token to the caller, so it must stay valid
    let keep_session = cli.command == Command::Tokens;
    let outcome = run(&client, cli.command).await;

    if !keep_session {
        if let Err(e) = client.logout().await {
            warn!(error = %e, "failed to revoke refresh token");
        }
    }
    if let Some(handle) = prometheus {
        eprint!("{}", handle.render());
    }
    outcome
}

/// Initialize tracing on stderr with LOG_LEVEL / RUST_LOG support.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (json_layer, text_layer) = if json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        (Some(layer), None)
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(client: &Client, command: Command) -> Result<()> {
    match command {
        Command::List {
            resource,
            params,
            limit,
        } => {
            let mut records = client.iterate(resource, &params);
            let mut printed = 0usize;
            while limit.is_none_or(|max| printed < max) {
                let Some(record) = records
                    .try_next()
                    .await
                    .with_context(|| format!("failed to list {}", resource.name()))?
                else {
                    break;
                };
                println!("{}", serde_json::to_string(&record)?);
                printed += 1;
            }
            debug!(resource = resource.name(), printed, "list complete");
        }
        Command::Get {
            resource,
            id,
            fields,
        } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            let response = client
                .get(resource, &id, &fields)
                .await
                .with_context(|| format!("failed to get {} {id}", resource.name()))?;
            print_body(&response);
        }
        Command::Count { resource, params } => {
            let count = client
                .count(resource, &params)
                .await
                .with_context(|| format!("failed to count {}", resource.name()))?;
            println!("{count}");
        }
        Command::Create { resource, body } => {
            let response = client
                .create(resource, &body, &[])
                .await
                .with_context(|| format!("failed to create {}", resource.name()))?;
            print_body(&response);
        }
        Command::Update { resource, id, body } => {
            let response = client
                .update(resource, &id, &body, &[])
                .await
                .with_context(|| format!("failed to update {} {id}", resource.name()))?;
            print_body(&response);
        }
        Command::Delete { resource, id } => {
            client
                .delete(resource, &id)
                .await
                .with_context(|| format!("failed to delete {} {id}", resource.name()))?;
            info!(resource = resource.name(), id = %id, "deleted");
        }
        Command::Tokens => {
            let tokens = client.tokens().await.context("failed to authenticate")?;
            let out = serde_json::json!({
                "access_token": tokens.access_token,
                "refresh_token": tokens.refresh_token,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Help => print!("{USAGE}"),
    }
    Ok(())
}

fn print_body(response: &ApiResponse) {
    if let Some(body) = render_body(response) {
        println!("{body}");
    }
}

/// Pretty JSON when the body parses, raw text otherwise; `None` when empty.
fn render_body(response: &ApiResponse) -> Option<String> {
    if response.body().is_empty() {
        return None;
    }
    match response.json::<Value>() {
        Ok(value) => serde_json::to_string_pretty(&value).ok(),
        Err(_) => Some(response.text()),
    }
}
