//! CLI command implementations.

pub mod categorize;
pub mod config;
pub mod documents;
pub mod ingest;
pub mod parse;
pub mod rules;
pub mod transactions;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use finscan_core::models::config::FinscanConfig;
use finscan_core::models::document::MediaType;
use finscan_core::{Store, User};

/// User that owns records when `--user` is not given.
pub const DEFAULT_USER: &str = "me@localhost";

/// Global options shared by every command.
pub struct Context {
    pub config_path: Option<String>,
    pub user_email: String,
}

impl Context {
    /// Load the explicit config file, else the default one if it exists, else defaults.
    pub fn load_config(&self) -> anyhow::Result<FinscanConfig> {
        if let Some(path) = &self.config_path {
            return Ok(FinscanConfig::from_file(Path::new(path))?);
        }

        let default_path = default_config_path();
        if default_path.exists() {
            debug!("Using config at {}", default_path.display());
            Ok(FinscanConfig::from_file(&default_path)?)
        } else {
            Ok(FinscanConfig::default())
        }
    }

    /// Open the configured database, creating its directory if needed.
    pub fn open_store(&self, config: &FinscanConfig) -> anyhow::Result<Arc<Store>> {
        let path = &config.storage.database_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Arc::new(Store::open(path)?))
    }

    /// The user named by `--user`, created on first use.
    pub fn current_user(&self, store: &Store) -> anyhow::Result<User> {
        Ok(store.ensure_user(&self.user_email, "")?)
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finscan")
        .join("config.json")
}

/// Guess the MIME type of a file from its extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(MediaType::from_extension)
        .map(|m| m.mime())
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}
