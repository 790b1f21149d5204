//! Catalog configuration.
//!
//! Load order: `.recloser/config.toml` → environment variables → defaults.

use crate::schema::SchemaVariant;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level catalog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecloserConfig {
    pub store: StoreConfig,
    pub display: DisplayConfig,
}

/// Where the catalog lives and how it is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file, relative to the project root unless absolute.
    pub path: PathBuf,
    /// Storage shape the database was (or will be) created with.
    pub schema: SchemaVariant,
    /// Serve each derived read from one read transaction.
    pub snapshot_reads: bool,
}

/// Output defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Language used when rendering trees and layouts as text.
    pub default_language: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("management.db"),
            schema: SchemaVariant::default(),
            snapshot_reads: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_language: "enUs".to_string(),
        }
    }
}

fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(parsed) = v.parse()
    {
        *target = parsed;
    }
}

impl RecloserConfig {
    /// Load config from `.recloser/config.toml` in the project root, with env
    /// var overrides. Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".recloser").join("config.toml");

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", config_path.display()))?
        } else {
            Self::default()
        };

        env_override("RECLOSER_DB_PATH", &mut config.store.path);
        env_override("RECLOSER_SCHEMA", &mut config.store.schema);
        env_override("RECLOSER_SNAPSHOT_READS", &mut config.store.snapshot_reads);
        env_override("RECLOSER_LANGUAGE", &mut config.display.default_language);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.path.as_os_str().is_empty() {
            anyhow::bail!("store.path must not be empty");
        }
        if self.display.default_language.trim().is_empty() {
            anyhow::bail!("display.default_language must not be empty");
        }
        Ok(())
    }

    /// The database path resolved against the project root.
    pub fn database_path(&self, project_root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            project_root.join(&self.store.path)
        }
    }
}
