//! # Caja Terminal Library
//!
//! Headless terminal process for Caja POS: startup sequence, shared state
//! and the commands a presentation layer drives.
//!
//! ## Module Organization
//! ```text
//! caja_terminal/
//! ├── lib.rs          ◄─── You are here (startup, shutdown, exit codes)
//! ├── license.rs      ◄─── License gate (key file)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── AppConfig
//! │   ├── checkout.rs ◄─── Open sale (Arc<Mutex<Sale>>)
//! │   └── sync.rs     ◄─── Sync agent + status mirror
//! ├── commands/
//! │   ├── checkout.rs ◄─── Sale commands
//! │   ├── license.rs  ◄─── License commands
//! │   └── sync.rs     ◄─── Sync commands
//! └── error.rs        ◄─── AppError, ErrorKind, exit codes
//! ```
//!
//! ## Exit Codes
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Normal shutdown (Ctrl+C)                       |
//! | 1    | Startup failure, including licensing           |
//! | 2    | Fatal failure (panic caught at the top level)  |

pub mod commands;
pub mod error;
pub mod license;
pub mod state;

use chrono::Local;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use caja_core::LicenseStatus;
use caja_db::{Database, DbConfig};
use caja_sync::SyncConfig;

use error::{AppResult, EXIT_FATAL, EXIT_OK};
use license::LicenseGate;
use state::{AppConfig, CheckoutState, SyncState};

/// Everything a running terminal holds.
pub struct Terminal {
    pub config: AppConfig,
    pub license_gate: LicenseGate,
    pub license: LicenseStatus,
    pub db: Database,
    pub checkout: CheckoutState,
    pub sync: SyncState,
}

impl Terminal {
    /// Runs the startup sequence.
    ///
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │  1. License Gate ─────────────────────────────────────────────────────► │
    /// │     • license.key must decode and be unexpired                          │
    /// │     • a failing key file is deleted                                     │
    /// │                                                                         │
    /// │  2. Database ─────────────────────────────────────────────────────────► │
    /// │     • CAJA_DB_PATH or platform data dir / caja.db                       │
    /// │     • migrations applied on connect                                     │
    /// │                                                                         │
    /// │  3. Sync Agent ───────────────────────────────────────────────────────► │
    /// │     • sync.toml + CAJA_* overrides, validated                           │
    /// │     • scheduler started in automatic mode only                          │
    /// │                                                                         │
    /// │  4. Checkout ─────────────────────────────────────────────────────────► │
    /// │     • empty open sale                                                   │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn start(config: AppConfig) -> AppResult<Self> {
        let license_gate = LicenseGate::new(config.license_path.clone());
        let license = license_gate.require_valid(Local::now().date_naive())?;

        let db_path = config.resolve_database_path()?;
        info!(?db_path, "Database path determined");
        let db = Database::new(DbConfig::new(db_path)).await?;
        info!("Database connected and migrations applied");

        let sync_config = SyncConfig::load(config.sync_config_path.clone())?;
        let sync = SyncState::new(sync_config, db.clone())?;
        sync.start().await?;

        info!(
            store = %config.store_name,
            company = ?license.company_name,
            "Terminal ready"
        );

        Ok(Terminal {
            config,
            license_gate,
            license,
            db,
            checkout: CheckoutState::new(),
            sync,
        })
    }

    /// Stops the scheduler (abandoning any round in flight) and closes the
    /// database.
    pub async fn shutdown(self) {
        info!("Shutting down");
        self.sync.stop().await;
        self.db.close().await;
    }
}

/// Process entry point. Returns the exit code.
pub fn run() -> ExitCode {
    init_tracing();
    install_panic_hook();

    info!("Starting Caja POS terminal");

    let result = panic::catch_unwind(AssertUnwindSafe(|| -> AppResult<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(serve(AppConfig::from_env()))
    }));

    match result {
        Ok(Ok(())) => {
            info!("Terminal stopped");
            ExitCode::from(EXIT_OK)
        }
        Ok(Err(e)) => {
            error!(kind = ?e.kind, error = %e.message, "Startup failed");
            ExitCode::from(e.exit_code())
        }
        Err(_) => ExitCode::from(EXIT_FATAL),
    }
}

async fn serve(config: AppConfig) -> AppResult<()> {
    let terminal = Terminal::start(config).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Could not listen for Ctrl+C, shutting down");
    }

    terminal.shutdown().await;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=caja=trace` - Show trace for caja crates only
/// - Default: `info,caja=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        error!(panic = %info, "Fatal error");
    }));
}
