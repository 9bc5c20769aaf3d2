//! # Application Configuration
//!
//! Terminal-level settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CAJA_*`)
//! 2. Defaults (this file)
//!
//! Sync settings live in their own file (`sync.toml`) and are loaded by
//! `caja_sync::SyncConfig`; this struct only records where that file is.
//!
//! Read-only after initialization, so no lock.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Default license file name, relative to the working directory.
pub const DEFAULT_LICENSE_FILE: &str = "license.key";

const DATABASE_FILE: &str = "caja.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Store name (displayed on receipts)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Explicit database file. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,

    pub license_path: PathBuf,

    /// Explicit `sync.toml`. `None` uses the platform config directory.
    pub sync_config_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            store_name: "Caja POS".to_string(),
            currency_symbol: "$".to_string(),
            database_path: None,
            license_path: PathBuf::from(DEFAULT_LICENSE_FILE),
            sync_config_path: None,
        }
    }
}

impl AppConfig {
    /// Defaults with `CAJA_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = var("CAJA_STORE_NAME") {
            self.store_name = name;
        }
        if let Some(symbol) = var("CAJA_CURRENCY_SYMBOL") {
            self.currency_symbol = symbol;
        }
        if let Some(path) = var("CAJA_DB_PATH") {
            debug!(%path, "Overriding database path from environment");
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var("CAJA_LICENSE_PATH") {
            self.license_path = PathBuf::from(path);
        }
        if let Some(path) = var("CAJA_SYNC_CONFIG") {
            self.sync_config_path = Some(PathBuf::from(path));
        }
    }

    /// Resolves the database file, creating the data directory if needed.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.caja.pos/caja.db`
    /// - **Windows**: `%APPDATA%\caja\pos\data\caja.db`
    /// - **Linux**: `~/.local/share/pos/caja.db`
    pub fn resolve_database_path(&self) -> AppResult<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "caja", "pos")
            .ok_or_else(|| AppError::internal("Could not determine app data directory"))?;

        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join(DATABASE_FILE))
    }
}
