//! # Repository Module
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller                         Repository                Table        │
//! │  ──────                         ──────────                ─────        │
//! │  finalize_sale command ───────► SaleRepository ─────────► sales,       │
//! │                                                           sale_lines,  │
//! │                                                           sync_outbox  │
//! │  commission settings ─────────► CommissionRepository ───► commission_  │
//! │                                                           config       │
//! │  sync agent (pull) ───────────► SyncStateRepository ────► sync_state   │
//! │  sync agent (push) ───────────► SyncOutboxRepository ───► sync_outbox  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All SQL lives in these files. Queries use the runtime `query`/`query_as`
//! API with positional binds.

pub mod commission;
pub mod sale;
pub mod sync;
