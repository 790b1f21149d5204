//! Recloser catalog MCP server.
//! Exposes service trees, firmware comparisons, screen layouts and catalog edits
//! as MCP tools over stdio.

mod handlers;
mod params;
mod server;
mod tools;

use anyhow::Result;
use rmcp::ServiceExt;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::server::CatalogServer;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let project_root = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => std::env::current_dir()?,
    };

    let server = CatalogServer::new(project_root)?;
    tracing::info!(
        root = %server.project_root.display(),
        schema = %server.catalog.variant(),
        "recloser MCP server starting"
    );

    let service = server
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("serve error: {e}"))
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    service.waiting().await?;

    Ok(())
}
