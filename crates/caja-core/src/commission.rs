//! # Commission Calculator
//!
//! Card processors charge a percentage of each payment, and in some
//! jurisdictions tax is charged again on that commission.
//!
//! ```text
//! amount ──► × percent_rate ──► base
//!                                 │
//!               charges_tax_on_commission?
//!                 ├── yes: base × tax_rate ──► tax_on_commission
//!                 └── no:  0
//!                                 │
//!             base + tax_on_commission ──► total
//!
//! net_received = amount - total
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Rate;
use crate::validation::{validate_percent_rate, ValidationResult};

// =============================================================================
// Configuration
// =============================================================================

/// The commission configuration a terminal applies to card payments.
///
/// Only one configuration is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommissionConfig {
    pub percent_rate: Rate,
    pub charges_tax_on_commission: bool,
    pub tax_rate: Rate,
    pub active: bool,
}

impl CommissionConfig {
    /// An active configuration.
    pub fn new(percent_rate: Rate, charges_tax_on_commission: bool, tax_rate: Rate) -> Self {
        CommissionConfig {
            percent_rate,
            charges_tax_on_commission,
            tax_rate,
            active: true,
        }
    }

    /// No commission at all. Used when nothing is stored.
    pub fn disabled() -> Self {
        CommissionConfig {
            percent_rate: Rate::zero(),
            charges_tax_on_commission: false,
            tax_rate: Rate::zero(),
            active: false,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_percent_rate("percent_rate", self.percent_rate)?;
        validate_percent_rate("tax_rate", self.tax_rate)?;
        Ok(())
    }
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

// =============================================================================
// Breakdown
// =============================================================================

/// Result of a commission computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBreakdown {
    pub base: Money,
    pub tax_on_commission: Money,
    pub total: Money,
}

impl CommissionBreakdown {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Computes the commission charged on `amount`.
///
/// Non-positive amounts and inactive configurations yield a zero-filled
/// breakdown.
///
/// ```rust
/// use caja_core::commission::{compute_commission, CommissionConfig};
/// use caja_core::money::Money;
/// use caja_core::types::Rate;
///
/// let cfg = CommissionConfig::new(Rate::from_bps(350), true, Rate::from_percent(16));
/// let c = compute_commission(Money::from_cents(100_000), &cfg);
/// assert_eq!(c.base.cents(), 3_500);
/// assert_eq!(c.tax_on_commission.cents(), 560);
/// assert_eq!(c.total.cents(), 4_060);
/// ```
pub fn compute_commission(amount: Money, config: &CommissionConfig) -> CommissionBreakdown {
    if !amount.is_positive() || !config.active {
        return CommissionBreakdown::zero();
    }

    let base = amount.apply_rate(config.percent_rate);
    let tax_on_commission = if config.charges_tax_on_commission {
        base.apply_rate(config.tax_rate)
    } else {
        Money::zero()
    };

    CommissionBreakdown {
        base,
        tax_on_commission,
        total: base + tax_on_commission,
    }
}

/// The rate actually paid on a payment, tax on commission included.
pub fn effective_rate(config: &CommissionConfig) -> Rate {
    if !config.active {
        return Rate::zero();
    }
    if config.charges_tax_on_commission {
        config.percent_rate.compounded_with(config.tax_rate)
    } else {
        config.percent_rate
    }
}

/// What the business keeps after the processor takes its commission.
pub fn net_received(amount: Money, config: &CommissionConfig) -> Money {
    amount - compute_commission(amount, config).total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxed_config() -> CommissionConfig {
        CommissionConfig::new(Rate::from_bps(350), true, Rate::from_percent(16))
    }

    #[test]
    fn test_reference_commission() {
        let amount = Money::from_cents(100_000);
        let c = compute_commission(amount, &taxed_config());

        assert_eq!(c.base, Money::from_cents(3_500));
        assert_eq!(c.tax_on_commission, Money::from_cents(560));
        assert_eq!(c.total, Money::from_cents(4_060));
        assert_eq!(net_received(amount, &taxed_config()), Money::from_cents(95_940));
    }

    #[test]
    fn test_zero_and_negative_amounts() {
        assert_eq!(compute_commission(Money::zero(), &taxed_config()).total, Money::zero());
        assert_eq!(
            compute_commission(Money::from_cents(-500), &taxed_config()),
            CommissionBreakdown::zero()
        );
    }

    #[test]
    fn test_untaxed_total_equals_base() {
        let cfg = CommissionConfig::new(Rate::from_bps(290), false, Rate::from_percent(16));
        let c = compute_commission(Money::from_cents(12_345), &cfg);
        assert!(c.tax_on_commission.is_zero());
        assert_eq!(c.total, c.base);
        assert_eq!(effective_rate(&cfg), Rate::from_bps(290));
    }

    #[test]
    fn test_inactive_config_yields_zero() {
        let mut cfg = taxed_config();
        cfg.active = false;
        assert_eq!(compute_commission(Money::from_cents(100_000), &cfg).total, Money::zero());
        assert_eq!(effective_rate(&cfg), Rate::zero());
        assert_eq!(net_received(Money::from_cents(100), &cfg), Money::from_cents(100));
    }

    #[test]
    fn test_effective_rate_with_tax() {
        assert_eq!(effective_rate(&taxed_config()).bps(), 406);
    }

    #[test]
    fn test_validate_rejects_rate_over_100_percent() {
        let cfg = CommissionConfig::new(Rate::from_bps(10_500), false, Rate::zero());
        assert!(cfg.validate().is_err());
        assert!(taxed_config().validate().is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(taxed_config()).unwrap();
        assert_eq!(json["percentRate"], 350);
        assert_eq!(json["chargesTaxOnCommission"], true);
    }
}
