//! # Sync Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAJA_SYNC_MODE=manual                                              │
//! │     CAJA_SERVER_IP=192.168.1.20                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/sync.toml (Linux)                                    │
//! │     ~/Library/Application Support/com.caja.pos/sync.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     SyncMode::Automatic, generated terminal id, 127.0.0.1:5000         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [terminal]
//! id = "caja-01"
//! name = "Caja 1"
//!
//! [server]
//! ip = "192.168.1.20"
//! port = 5000
//! api_token = "s3cret"       # optional
//!
//! [sync]
//! mode = "automatic"         # automatic | manual | offline
//! interval_secs = 300
//! initial_delay_secs = 10
//! request_timeout_secs = 30
//! requested_types = ["productos", "precios", "clientes"]
//! push_enabled = true
//! push_batch_size = 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Sync Mode
// =============================================================================

/// How sync rounds are triggered on this terminal.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        Sync Mode Behavior                               │
/// │                                                                         │
/// │  AUTOMATIC (Default)                                                   │
/// │  • Scheduler runs a round every interval after an initial delay        │
/// │  • Manual triggers still work and share the same guard                 │
/// │                                                                         │
/// │  MANUAL                                                                │
/// │  • No scheduler; rounds run only when the operator asks                │
/// │                                                                         │
/// │  OFFLINE                                                               │
/// │  • Sync disabled completely, local sales only                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Automatic,
    Manual,
    Offline,
}

impl SyncMode {
    pub fn is_sync_enabled(&self) -> bool {
        !matches!(self, SyncMode::Offline)
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, SyncMode::Automatic)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Automatic => write!(f, "automatic"),
            SyncMode::Manual => write!(f, "manual"),
            SyncMode::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "automatic" | "auto" => Ok(SyncMode::Automatic),
            "manual" => Ok(SyncMode::Manual),
            "offline" | "disabled" => Ok(SyncMode::Offline),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: automatic, manual, offline",
                other
            ))),
        }
    }
}

// =============================================================================
// Terminal Configuration
// =============================================================================

/// Identity this terminal presents to the store server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Sent as `terminalId` and used as the key of the local sync cursor.
    /// Generated on first run if not provided.
    #[serde(default = "default_terminal_id")]
    pub id: String,

    #[serde(default = "default_terminal_name")]
    pub name: String,
}

fn default_terminal_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("caja-{}", &simple[..8])
}

fn declares_terminal_id(contents: &str) -> bool {
    contents
        .parse::<toml::Table>()
        .ok()
        .and_then(|table| table.get("terminal")?.get("id").cloned())
        .is_some()
}

fn default_terminal_name() -> String {
    "Caja".to_string()
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            id: default_terminal_id(),
            name: default_terminal_name(),
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Where the store server lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_ip")]
    pub ip: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Sent as `Authorization: Bearer <token>` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

fn default_server_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            ip: default_server_ip(),
            port: default_server_port(),
            api_token: None,
        }
    }
}

impl ServerConfig {
    /// `http://{ip}:{port}`
    pub fn base_url(&self) -> SyncResult<Url> {
        let raw = format!("http://{}:{}", self.ip.trim(), self.port);
        Url::parse(&raw).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", raw, e)))
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub mode: SyncMode,

    /// Seconds between scheduled rounds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Seconds to wait after startup before the first scheduled round.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Entity kinds requested from the server (`tiposRequeridos`).
    #[serde(default = "default_requested_types")]
    pub requested_types: Vec<String>,

    /// Push pending local changes after each successful pull.
    #[serde(default = "default_true")]
    pub push_enabled: bool,

    /// Maximum outbox entries sent per push.
    #[serde(default = "default_push_batch_size")]
    pub push_batch_size: u32,
}

fn default_interval() -> u64 {
    300
}
fn default_initial_delay() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    30
}
fn default_requested_types() -> Vec<String> {
    vec![
        "productos".to_string(),
        "precios".to_string(),
        "clientes".to_string(),
    ]
}
fn default_true() -> bool {
    true
}
fn default_push_batch_size() -> u32 {
    100
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            interval_secs: default_interval(),
            initial_delay_secs: default_initial_delay(),
            request_timeout_secs: default_request_timeout(),
            requested_types: default_requested_types(),
            push_enabled: true,
            push_batch_size: default_push_batch_size(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
///
/// Built once at startup and handed to [`crate::SyncAgent`]; nothing reads
/// configuration from globals afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    ///
    /// A terminal ID generated here (no file, or a file without
    /// `terminal.id`) is written back before env overrides apply, so the
    /// sync cursor keyed by it survives restarts.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;

                if !declares_terminal_id(&contents) {
                    info!(terminal_id = %config.terminal.id, "Persisting generated terminal ID");
                    config.save(Some(path))?;
                }
            } else {
                debug!(?path, "Config file not found, writing defaults");
                config.save(Some(path))?;
            }
        } else {
            warn!(terminal_id = %config.terminal.id, "No config path, terminal ID will not persist");
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> SyncResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        caja_core::validation::validate_terminal_id(&self.terminal.id)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        if self.server.ip.trim().is_empty() {
            return Err(SyncError::InvalidConfig("server.ip is required".into()));
        }
        if self.server.port == 0 {
            return Err(SyncError::InvalidConfig(
                "server.port must be greater than 0".into(),
            ));
        }
        self.server.base_url()?;

        if self.sync.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }
        if self.sync.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.sync.push_batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "push_batch_size must be greater than 0".into(),
            ));
        }
        if self.sync.requested_types.iter().any(|t| t.trim().is_empty()) {
            return Err(SyncError::InvalidConfig(
                "requested_types must not contain empty names".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("CAJA_TERMINAL_ID") {
            debug!(terminal_id = %id, "Overriding terminal ID from environment");
            self.terminal.id = id;
        }

        if let Ok(name) = std::env::var("CAJA_TERMINAL_NAME") {
            self.terminal.name = name;
        }

        if let Ok(ip) = std::env::var("CAJA_SERVER_IP") {
            debug!(ip = %ip, "Overriding server IP from environment");
            self.server.ip = ip;
        }

        if let Ok(port) = std::env::var("CAJA_SERVER_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(port = %port, "Ignoring invalid CAJA_SERVER_PORT"),
            }
        }

        if let Ok(token) = std::env::var("CAJA_API_TOKEN") {
            self.server.api_token = Some(token).filter(|t| !t.is_empty());
        }

        if let Ok(mode) = std::env::var("CAJA_SYNC_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding sync mode from environment");
                    self.sync.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown sync mode in environment"),
            }
        }

        if let Ok(secs) = std::env::var("CAJA_SYNC_INTERVAL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.sync.interval_secs = s;
            }
        }
    }

    /// `sync.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "caja", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn terminal_id(&self) -> &str {
        &self.terminal.id
    }

    pub fn mode(&self) -> SyncMode {
        self.sync.mode
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync.mode.is_sync_enabled()
    }

    pub fn base_url(&self) -> SyncResult<Url> {
        self.server.base_url()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.sync.initial_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout_secs)
    }
}
