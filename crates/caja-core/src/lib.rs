//! # caja-core: Pure Business Logic for Caja POS
//!
//! Every rule a terminal applies at the counter lives here as plain
//! functions and value types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               caja-terminal (startup, checkout commands)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │commission │  │   sale    │  │  license  │  │   │
//! │  │   │ LineAmts  │  │ Breakdown │  │ Aggregate │  │  Tiers    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │   money   │  │   types   │  │   role    │                 │   │
//! │  │   │   Money   │  │ Rate, Qty │  │Capability │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            caja-db (SQLite)  /  caja-sync (HTTP)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Rates, quantities, payment method, sale status
//! - [`pricing`] - Line subtotal/tax/total
//! - [`commission`] - Card processing commission
//! - [`sale`] - Sale aggregate and finalized snapshot
//! - [`role`] - Roles mapped to explicit permission sets
//! - [`license`] - License tiers, decoding and expiry rules
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::pricing::compute_line;
//! use caja_core::types::{Quantity, Rate};
//!
//! let amounts = compute_line(
//!     Quantity::from_units(3),
//!     Money::from_cents(1000),
//!     Money::from_cents(500),
//!     Rate::from_percent(16),
//! );
//!
//! assert_eq!(amounts.subtotal.cents(), 2500);
//! assert_eq!(amounts.tax.cents(), 400);
//! assert_eq!(amounts.total.cents(), 2900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commission;
pub mod error;
pub mod license;
pub mod money;
pub mod pricing;
pub mod role;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use commission::{CommissionBreakdown, CommissionConfig};
pub use error::{CoreError, CoreResult, ValidationError};
pub use license::{LicenseClaims, LicenseError, LicenseStatus, LicenseTier};
pub use money::Money;
pub use pricing::LineAmounts;
pub use role::{CapabilitySet, Permission, Role, Session};
pub use sale::{Sale, SaleLine, SaleSnapshot, SaleTotals, SnapshotLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single sale.
///
/// Keeps a runaway scan loop from building an unbounded ticket.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity on a single line, in whole units.
pub const MAX_LINE_UNITS: i64 = 9_999;

/// Entity type recorded in the outbox for finalized sales.
pub const OUTBOX_ENTITY_SALE: &str = "SALE";
