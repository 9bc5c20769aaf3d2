//! # caja-sync: Sync Client for Caja POS
//!
//! Keeps a terminal's catalog view and sales history in step with the
//! shared store server over plain HTTP. Sales are always written locally
//! first; sync only ever runs behind them.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Client Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncAgent (agent.rs)                        │  │
//! │  │                                                                  │  │
//! │  │  sync_now()  - one round, dropped if a round is in flight        │  │
//! │  │  start/stop  - periodic scheduler (automatic mode)               │  │
//! │  └───────────┬──────────────────────┬───────────────────────────────┘  │
//! │              │                      │                                   │
//! │              ▼                      ▼                                   │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌─────────────────┐   │
//! │  │  SyncHttpClient    │  │  SyncSlot          │  │  caja-db        │   │
//! │  │  (client.rs)       │  │  (guard.rs)        │  │                 │   │
//! │  │                    │  │                    │  │  sync_state     │   │
//! │  │  ping / cambios /  │  │  Semaphore(1),     │  │  (cursor)       │   │
//! │  │  recibir-cambios   │  │  non-blocking      │  │  sync_outbox    │   │
//! │  │  bearer token      │  │  acquire           │  │  (push queue)   │   │
//! │  └────────────────────┘  └────────────────────┘  └─────────────────┘   │
//! │                                                                         │
//! │  EVENTS (SyncEventEmitter):                                            │
//! │  • status    - phase changes (Idle / Syncing)                          │
//! │  • completed - round report (changes pulled, push outcome)             │
//! │  • error     - round failed (connectivity, protocol, database)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_sync::{SyncAgent, SyncConfig};
//!
//! let config = SyncConfig::load(None)?;
//! let agent = SyncAgent::new(config, database)?;
//!
//! if agent.config().mode().is_scheduled() {
//!     agent.start().await?;
//! }
//!
//! // Operator pressed "sync"
//! match agent.sync_now().await? {
//!     SyncOutcome::Completed(report) => println!("{} changes", report.total_changes),
//!     SyncOutcome::Skipped => println!("already syncing"),
//! }
//!
//! agent.stop().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod protocol;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{
    NoOpEmitter, PushOutcome, SyncAgent, SyncEventEmitter, SyncOutcome, SyncPhase, SyncReport,
    SyncStatus,
};
pub use client::SyncHttpClient;
pub use config::{ServerConfig, SyncConfig, SyncMode, SyncSettings, TerminalConfig};
pub use error::{SyncError, SyncResult};
pub use guard::{SyncPermit, SyncSlot};
pub use protocol::{ChangeRequest, ChangeResponse, LocalChange, PushRequest, PushResponse};
