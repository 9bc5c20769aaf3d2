//! # State Module
//!
//! Separate state types, one per concern. Commands take only the state
//! they need.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │  AppConfig   │  │  Database    │  │ CheckoutState│  │ SyncState  │  │
//! │  │              │  │  (caja-db)   │  │              │  │            │  │
//! │  │  store name  │  │  SQLite pool │  │  Arc<Mutex<  │  │  SyncAgent │  │
//! │  │  paths       │  │              │  │    Sale      │  │  + status  │  │
//! │  │              │  │              │  │  >>          │  │            │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • AppConfig: read-only after startup                                  │
//! │  • Database: internal connection pool                                  │
//! │  • CheckoutState: Arc<Mutex<T>> for exclusive access                   │
//! │  • SyncState: agent is Clone + Send, status behind RwLock              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod checkout;
mod config;
mod sync;

pub use checkout::CheckoutState;
pub use config::{AppConfig, DEFAULT_LICENSE_FILE};
pub use sync::{LoggingSyncEmitter, SyncState, SyncStatusDto};
