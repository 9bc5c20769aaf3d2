//! # Checkout Commands
//!
//! Operations the presentation layer calls while ringing up a sale.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│  Lines   │────►│  Charge  │────►│ Finalized│       │
//! │  │  Sale    │     │          │     │          │     │ + Outbox │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                 │              │
//! │                   add_line                          finalize_sale      │
//! │                   update_quantity                        │              │
//! │                   apply_discount                         ▼              │
//! │                   remove_line                      new empty sale      │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   void_sale ───────────────────────► new empty sale    │
//! │                                                                         │
//! │  finalize_sale holds the sale in Finalizing while it is stored; edits  │
//! │  and voids are rejected until it completes or is reopened.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command checks the operator's role first.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use caja_core::commission::compute_commission;
use caja_core::{
    CommissionBreakdown, Money, PaymentMethod, Permission, Quantity, Rate, Sale, SaleLine,
    SaleSnapshot, SaleTotals, Session,
};
use caja_db::{Database, OutboxEntry, StoredSale};

use crate::error::AppResult;
use crate::state::{AppConfig, CheckoutState};

/// Current sale with its totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub sale: Sale,
    pub totals: SaleTotals,
}

impl From<&Sale> for CheckoutResponse {
    fn from(sale: &Sale) -> Self {
        CheckoutResponse {
            sale: sale.clone(),
            totals: sale.totals(),
        }
    }
}

/// A product scanned or picked by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLineRequest {
    pub product_id: String,
    pub name: String,
    pub unit: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub tax_rate: Rate,
}

/// Result of a successful finalization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub store_name: String,
    pub sale: StoredSale,
    pub outbox_id: String,
    /// Total formatted with the configured currency symbol
    pub total_display: String,
}

// =============================================================================
// Read
// =============================================================================

pub fn get_sale(checkout: &CheckoutState) -> CheckoutResponse {
    checkout.with_sale(|sale| CheckoutResponse::from(sale))
}

// =============================================================================
// Lines
// =============================================================================

/// Adds a line, merging into an existing line for the same product.
pub fn add_line(
    session: &Session,
    checkout: &CheckoutState,
    request: AddLineRequest,
) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesRegister)?;
    debug!(product_id = %request.product_id, quantity = %request.quantity, "add_line command");

    let line = SaleLine::new(
        request.product_id,
        request.name,
        request.unit,
        request.quantity,
        request.unit_price,
        request.tax_rate,
    );

    checkout.with_sale_mut(|sale| -> AppResult<CheckoutResponse> {
        sale.add_line(line)?;
        Ok(CheckoutResponse::from(&*sale))
    })
}

pub fn update_quantity(
    session: &Session,
    checkout: &CheckoutState,
    product_id: &str,
    quantity: Quantity,
) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesRegister)?;
    debug!(%product_id, %quantity, "update_quantity command");

    checkout.with_sale_mut(|sale| -> AppResult<CheckoutResponse> {
        sale.update_line_quantity(product_id, quantity)?;
        Ok(CheckoutResponse::from(&*sale))
    })
}

pub fn remove_line(
    session: &Session,
    checkout: &CheckoutState,
    product_id: &str,
) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesRegister)?;
    debug!(%product_id, "remove_line command");

    checkout.with_sale_mut(|sale| -> AppResult<CheckoutResponse> {
        sale.remove_line(product_id)?;
        Ok(CheckoutResponse::from(&*sale))
    })
}

/// Fixed-amount discount on one line.
pub fn apply_discount(
    session: &Session,
    checkout: &CheckoutState,
    product_id: &str,
    discount: Money,
) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesDiscount)?;
    debug!(%product_id, %discount, "apply_discount command");

    checkout.with_sale_mut(|sale| -> AppResult<CheckoutResponse> {
        sale.apply_line_discount(product_id, discount)?;
        Ok(CheckoutResponse::from(&*sale))
    })
}

/// Percentage discount on one line.
pub fn apply_discount_percent(
    session: &Session,
    checkout: &CheckoutState,
    product_id: &str,
    percent: Rate,
) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesDiscount)?;
    debug!(%product_id, %percent, "apply_discount_percent command");

    checkout.with_sale_mut(|sale| -> AppResult<CheckoutResponse> {
        sale.apply_line_discount_percent(product_id, percent)?;
        Ok(CheckoutResponse::from(&*sale))
    })
}

// =============================================================================
// Header
// =============================================================================

pub fn set_customer(
    session: &Session,
    checkout: &CheckoutState,
    label: Option<String>,
) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesRegister)?;

    checkout.with_sale_mut(|sale| -> AppResult<CheckoutResponse> {
        sale.set_customer_label(label)?;
        Ok(CheckoutResponse::from(&*sale))
    })
}

pub fn set_payment_method(
    session: &Session,
    checkout: &CheckoutState,
    method: PaymentMethod,
) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesRegister)?;

    checkout.with_sale_mut(|sale| -> AppResult<CheckoutResponse> {
        sale.set_payment_method(method)?;
        Ok(CheckoutResponse::from(&*sale))
    })
}

/// Discards the open sale and starts a new one.
pub fn void_sale(session: &Session, checkout: &CheckoutState) -> AppResult<CheckoutResponse> {
    session.require(Permission::SalesVoid)?;

    let voided = checkout.discard()?;
    info!(sale_id = %voided.id, lines = voided.lines.len(), user = %session.username, "Sale voided");

    Ok(get_sale(checkout))
}

// =============================================================================
// Finalize
// =============================================================================

/// Finalizes the open sale, stores it with its outbox entry, and starts a
/// new sale.
///
/// ```text
/// 1. Under the lock: validate, snapshot, mark the sale Finalizing
/// 2. Commission: card payments only, from the active configuration
/// 3. INSERT sale + lines + outbox entry in one transaction
/// 4. Stored  → Finalized, replaced with a new empty sale
///    Failed  → reopened with its lines intact
/// ```
///
/// While the sale is `Finalizing` every edit, void or second finalize is
/// rejected.
pub async fn finalize_sale(
    session: &Session,
    checkout: &CheckoutState,
    db: &Database,
    config: &AppConfig,
) -> AppResult<FinalizeResponse> {
    session.require(Permission::SalesRegister)?;
    debug!("finalize_sale command");

    let snapshot = checkout.with_sale_mut(|sale| sale.begin_finalize(Utc::now()))?;
    let sale_id = snapshot.sale_id.clone();

    let (stored, outbox) = match store_snapshot(db, snapshot).await {
        Ok(stored) => stored,
        Err(e) => {
            checkout.with_sale_mut(|sale| {
                if sale.id == sale_id {
                    if let Err(err) = sale.cancel_finalize() {
                        warn!(sale_id = %sale_id, error = %err, "Could not reopen sale");
                    }
                }
            });
            warn!(sale_id = %sale_id, error = %e.message, "Finalize failed, sale reopened");
            return Err(e);
        }
    };

    checkout.with_sale_mut(|sale| {
        if sale.id == sale_id && sale.complete_finalize().is_ok() {
            *sale = Sale::new();
        }
    });

    info!(
        sale_id = %sale_id,
        total = %stored.snapshot.totals.total,
        commission = %stored.commission.total,
        payment_method = %stored.snapshot.payment_method,
        user = %session.username,
        "Sale finalized"
    );

    Ok(FinalizeResponse {
        store_name: config.store_name.clone(),
        total_display: stored.snapshot.totals.total.format_with(&config.currency_symbol),
        outbox_id: outbox.id,
        sale: stored,
    })
}

async fn store_snapshot(
    db: &Database,
    snapshot: SaleSnapshot,
) -> AppResult<(StoredSale, OutboxEntry)> {
    let commission = if snapshot.payment_method.incurs_commission() {
        let commission_config = db.commissions().active_or_disabled().await?;
        compute_commission(snapshot.totals.total, &commission_config)
    } else {
        CommissionBreakdown::zero()
    };

    let stored = StoredSale::new(snapshot, commission);
    let outbox = db.sales().insert_finalized(&stored).await?;
    Ok((stored, outbox))
}
