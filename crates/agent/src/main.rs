//! stratus entry point.
//!
//! Boots the cache agent over stdio: install and activate run first, then
//! each line read from stdin is treated as a request (`URL` or
//! `METHOD URL`) and run through fetch interception, with one result line
//! written to stdout. Logging goes to stderr so stdout stays
//! machine-readable.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use stratus_agent::{CacheAgent, FetchOutcome, LoggingClients};
use stratus_client::fetch::{FetchConfig, HttpNetwork, WebRequest};
use stratus_core::{AppConfig, CacheDb};

fn parse_request(line: &str) -> Option<WebRequest> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(url), None, _) => Some(WebRequest::get(url)),
        (Some(method), Some(url), None) => Some(WebRequest::new(method, url)),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        generation = %config.cache_version,
        scope = %config.scope,
        db = %config.db_path.display(),
        "starting stratus"
    );

    let db = CacheDb::open(&config.db_path)
        .await
        .context("failed to open cache database")?;
    let network = Arc::new(HttpNetwork::new(FetchConfig::from_app(&config))?);
    let agent = CacheAgent::new(config, db, network, Arc::new(LoggingClients))?;

    if let Err(e) = agent.handle_install().await {
        // Reported only; a failed install must not crash the host.
        tracing::error!(error = %e, "install failed");
        return Ok(());
    }
    agent.handle_activate().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(request) = parse_request(line) else {
            tracing::warn!(%line, "unparseable request line");
            continue;
        };

        let output = match agent.handle_fetch(&request).await {
            FetchOutcome::PassThrough => format!("pass-through {line}\n"),
            FetchOutcome::Served(response) => format!(
                "{} {} {} {}\n",
                response.status,
                response.source,
                response.body.len(),
                request.url
            ),
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
