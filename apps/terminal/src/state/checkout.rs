//! # Checkout State
//!
//! Holds the sale currently being rung up.
//!
//! ## Checkout Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator Action          Command                 Sale Change           │
//! │  ───────────────          ───────                 ───────────           │
//! │                                                                         │
//! │  Scan product ──────────► add_line() ───────────► merge or push line   │
//! │  Change quantity ───────► update_quantity() ────► line.quantity = q    │
//! │  Discount ──────────────► apply_discount() ─────► line.discount = d    │
//! │  Remove ────────────────► remove_line() ────────► lines.remove(i)      │
//! │  Void ──────────────────► void_sale() ──────────► discard open sale    │
//! │  Charge ────────────────► finalize_sale() ──────► Finalizing, store,   │
//! │                                                   then new sale         │
//! │                                                                         │
//! │  All operations take the lock exclusively and release it before any   │
//! │  await point.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use caja_core::{CoreError, CoreResult, Sale};

/// The open sale, shared between command handlers.
#[derive(Debug, Clone, Default)]
pub struct CheckoutState {
    sale: Arc<Mutex<Sale>>,
}

impl CheckoutState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with read access to the current sale.
    pub fn with_sale<T>(&self, f: impl FnOnce(&Sale) -> T) -> T {
        f(&self.lock())
    }

    /// Runs `f` with write access to the current sale.
    pub fn with_sale_mut<T>(&self, f: impl FnOnce(&mut Sale) -> T) -> T {
        f(&mut self.lock())
    }

    /// Replaces the open sale with an empty one and returns it. A sale
    /// that is being finalized cannot be discarded.
    pub fn discard(&self) -> CoreResult<Sale> {
        let mut sale = self.lock();
        if !sale.is_open() {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale.id.clone(),
                current_status: sale.status().to_string(),
            });
        }
        Ok(std::mem::take(&mut *sale))
    }

    // A panic while holding the lock leaves a sale that is still
    // structurally valid, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Sale> {
        self.sale.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::{Money, Quantity, Rate, SaleLine};

    #[test]
    fn test_discard_starts_a_fresh_sale() {
        let state = CheckoutState::new();
        let first_id = state.with_sale(|s| s.id.clone());

        state
            .with_sale_mut(|s| {
                s.add_line(SaleLine::new(
                    "p-1",
                    "Refresco",
                    "pz",
                    Quantity::from_units(1),
                    Money::from_cents(1_500),
                    Rate::from_percent(16),
                ))
            })
            .unwrap();

        let old = state.discard().unwrap();
        assert_eq!(old.id, first_id);
        assert_eq!(old.lines.len(), 1);

        state.with_sale(|s| {
            assert_ne!(s.id, first_id);
            assert!(s.is_empty());
            assert!(s.is_open());
        });
    }

    #[test]
    fn test_finalizing_sale_cannot_be_discarded() {
        let state = CheckoutState::new();
        state
            .with_sale_mut(|s| {
                s.add_line(SaleLine::new(
                    "p-1",
                    "Refresco",
                    "pz",
                    Quantity::from_units(1),
                    Money::from_cents(1_500),
                    Rate::from_percent(16),
                ))
            })
            .unwrap();
        let id = state
            .with_sale_mut(|s| s.begin_finalize(chrono::Utc::now()))
            .unwrap()
            .sale_id;

        assert!(matches!(
            state.discard(),
            Err(CoreError::InvalidSaleStatus { .. })
        ));
        assert_eq!(state.with_sale(|s| s.id.clone()), id);
    }

    #[test]
    fn test_clones_share_the_sale() {
        let state = CheckoutState::new();
        let other = state.clone();
        other
            .with_sale_mut(|s| s.set_customer_label(Some("Mostrador".into())))
            .unwrap();
        assert_eq!(
            state.with_sale(|s| s.customer_label.clone()).as_deref(),
            Some("Mostrador")
        );
    }
}
