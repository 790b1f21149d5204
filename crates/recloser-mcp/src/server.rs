//! `CatalogServer` struct definition, non-tool methods, and `ServerHandler` impl.

use anyhow::{Context, Result};
use recloser_core::config::RecloserConfig;
use recloser_core::sqlite::SqliteCatalog;
use rmcp::{ServerHandler, model::ServerInfo, tool_handler};
use std::path::PathBuf;
use std::sync::Arc;

use crate::handlers::ReadOptions;

/// The recloser catalog MCP server state.
#[derive(Clone)]
pub(crate) struct CatalogServer {
    pub(crate) project_root: PathBuf,
    pub(crate) catalog: Arc<SqliteCatalog>,
    pub(crate) read_options: ReadOptions,
    pub(crate) tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

impl std::fmt::Debug for CatalogServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogServer")
            .field("project_root", &self.project_root)
            .field("schema", &self.catalog.variant())
            .field("read_options", &self.read_options)
            .finish_non_exhaustive()
    }
}

impl CatalogServer {
    /// Load config from `project_root` and open (migrating if needed) its catalog.
    pub(crate) fn new(project_root: PathBuf) -> Result<Self> {
        let config = RecloserConfig::load(&project_root)?;
        let catalog = SqliteCatalog::open_configured(&config, &project_root).with_context(|| {
            format!(
                "failed to open catalog at {}",
                config.database_path(&project_root).display()
            )
        })?;
        Ok(Self::with_catalog(project_root, &config, catalog))
    }

    pub(crate) fn with_catalog(project_root: PathBuf, config: &RecloserConfig, catalog: SqliteCatalog) -> Self {
        Self {
            project_root,
            catalog: Arc::new(catalog),
            read_options: ReadOptions {
                snapshot_reads: config.store.snapshot_reads,
                default_language: config.display.default_language.clone(),
            },
            tool_router: Self::create_tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for CatalogServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(include_str!("prompts/server_instructions.md").into()),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
