//! # License Rules
//!
//! Decoding and expiry rules for the key that gates terminal startup. File
//! handling lives in the terminal crate; this module only decides.
//!
//! ## Key Format
//! ```text
//! CAJA-<TIER>-<YYYYMMDD|0>-<company>
//!
//! CAJA-ANNUAL-20271231-Abarrotes La Esquina
//! CAJA-LIFETIME-0-Papeleria Sol
//!       │        │   └── company name (may contain '-')
//!       │        └────── expiration date, 0 = none
//!       └─────────────── trial | monthly | annual | lifetime
//! ```
//!
//! Time-boxed tiers are valid through their expiration date inclusive.
//! This is a weak trust boundary: there is no signature and no server check.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Tier
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LicenseTier {
    Trial,
    Monthly,
    Annual,
    Lifetime,
}

impl LicenseTier {
    /// Everything but `Lifetime` expires.
    pub const fn is_time_boxed(&self) -> bool {
        !matches!(self, LicenseTier::Lifetime)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            LicenseTier::Trial => "trial",
            LicenseTier::Monthly => "monthly",
            LicenseTier::Annual => "annual",
            LicenseTier::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for LicenseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseTier {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trial" => Ok(LicenseTier::Trial),
            "monthly" => Ok(LicenseTier::Monthly),
            "annual" => Ok(LicenseTier::Annual),
            "lifetime" => Ok(LicenseTier::Lifetime),
            other => Err(LicenseError::UnknownTier(other.to_string())),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Why a key could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LicenseError {
    #[error("License key is empty")]
    Empty,

    #[error("License key is malformed: {0}")]
    Malformed(String),

    #[error("Unknown license type: {0}")]
    UnknownTier(String),

    #[error("Invalid expiration date: {0}")]
    InvalidDate(String),

    #[error("A {0} license requires an expiration date")]
    MissingExpiration(LicenseTier),

    #[error("License key has no company name")]
    MissingCompany,
}

// =============================================================================
// Claims & Status
// =============================================================================

/// What a decoded key asserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseClaims {
    pub key: String,
    pub tier: LicenseTier,
    pub expires_on: Option<NaiveDate>,
    pub company_name: String,
}

/// Outcome of a license validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatus {
    pub is_valid: bool,
    #[serde(rename = "type")]
    pub tier: Option<LicenseTier>,
    #[ts(type = "string | null")]
    pub expiration_date: Option<NaiveDate>,
    pub company_name: Option<String>,
    pub message: String,
}

impl LicenseStatus {
    /// No key file is stored.
    pub fn not_found() -> Self {
        LicenseStatus {
            is_valid: false,
            tier: None,
            expiration_date: None,
            company_name: None,
            message: "License not found".to_string(),
        }
    }

    pub fn invalid(reason: impl fmt::Display) -> Self {
        LicenseStatus {
            is_valid: false,
            tier: None,
            expiration_date: None,
            company_name: None,
            message: format!("Invalid license: {}", reason),
        }
    }

    fn from_claims(claims: &LicenseClaims, is_valid: bool, message: String) -> Self {
        LicenseStatus {
            is_valid,
            tier: Some(claims.tier),
            expiration_date: claims.expires_on,
            company_name: Some(claims.company_name.clone()),
            message,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Turns key text into claims. Swappable so a signed format can replace
/// the bundled plain-text one.
pub trait LicenseKeyDecoder: Send + Sync {
    fn decode(&self, key_text: &str) -> Result<LicenseClaims, LicenseError>;
}

/// Decoder for `CAJA-<TIER>-<YYYYMMDD|0>-<company>` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedKeyDecoder;

impl DelimitedKeyDecoder {
    pub const PREFIX: &'static str = "CAJA";
}

impl LicenseKeyDecoder for DelimitedKeyDecoder {
    fn decode(&self, key_text: &str) -> Result<LicenseClaims, LicenseError> {
        let key = key_text.trim();
        if key.is_empty() {
            return Err(LicenseError::Empty);
        }

        let parts: Vec<&str> = key.splitn(4, '-').collect();
        let [prefix, tier, date, company] = parts.as_slice() else {
            return Err(LicenseError::Malformed(
                "expected 4 dash-separated fields".to_string(),
            ));
        };

        if !prefix.eq_ignore_ascii_case(Self::PREFIX) {
            return Err(LicenseError::Malformed(format!(
                "unknown prefix '{}'",
                prefix
            )));
        }

        let tier: LicenseTier = tier.parse()?;

        let expires_on = match date.trim() {
            "0" | "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y%m%d")
                    .map_err(|_| LicenseError::InvalidDate(raw.to_string()))?,
            ),
        };

        if tier.is_time_boxed() && expires_on.is_none() {
            return Err(LicenseError::MissingExpiration(tier));
        }

        let company_name = company.trim();
        if company_name.is_empty() {
            return Err(LicenseError::MissingCompany);
        }

        Ok(LicenseClaims {
            key: key.to_string(),
            tier,
            expires_on,
            company_name: company_name.to_string(),
        })
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Applies the expiry rule to decoded claims.
pub fn evaluate(claims: &LicenseClaims, today: NaiveDate) -> LicenseStatus {
    match (claims.tier.is_time_boxed(), claims.expires_on) {
        (true, Some(expires_on)) if today > expires_on => LicenseStatus::from_claims(
            claims,
            false,
            format!("License expired on {}", expires_on),
        ),
        (true, Some(expires_on)) => LicenseStatus::from_claims(
            claims,
            true,
            format!("{} license valid until {}", claims.tier, expires_on),
        ),
        (true, None) => {
            LicenseStatus::invalid(LicenseError::MissingExpiration(claims.tier))
        }
        (false, _) => {
            LicenseStatus::from_claims(claims, true, "Lifetime license".to_string())
        }
    }
}

/// Decodes and evaluates key text in one step.
///
/// ```rust
/// use caja_core::license::{validate_key, DelimitedKeyDecoder, LicenseTier};
/// use chrono::NaiveDate;
///
/// let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
/// let status = validate_key(&DelimitedKeyDecoder, "CAJA-ANNUAL-20261231-Tienda Uno", today);
/// assert!(status.is_valid);
/// assert_eq!(status.tier, Some(LicenseTier::Annual));
/// assert_eq!(status.company_name.as_deref(), Some("Tienda Uno"));
/// ```
pub fn validate_key(
    decoder: &dyn LicenseKeyDecoder,
    key_text: &str,
    today: NaiveDate,
) -> LicenseStatus {
    match decoder.decode(key_text) {
        Ok(claims) => evaluate(&claims, today),
        Err(e) => LicenseStatus::invalid(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_decode_keeps_dashes_in_company() {
        let claims = DelimitedKeyDecoder
            .decode("CAJA-MONTHLY-20261115-Farmacia San-Jose")
            .unwrap();
        assert_eq!(claims.tier, LicenseTier::Monthly);
        assert_eq!(claims.expires_on, Some(date(2026, 11, 15)));
        assert_eq!(claims.company_name, "Farmacia San-Jose");
    }

    #[test]
    fn test_decode_errors() {
        let d = DelimitedKeyDecoder;
        assert_eq!(d.decode("  "), Err(LicenseError::Empty));
        assert!(matches!(d.decode("CAJA-ANNUAL"), Err(LicenseError::Malformed(_))));
        assert!(matches!(d.decode("XYZ-ANNUAL-20261231-Co"), Err(LicenseError::Malformed(_))));
        assert!(matches!(d.decode("CAJA-WEEKLY-20261231-Co"), Err(LicenseError::UnknownTier(_))));
        assert!(matches!(d.decode("CAJA-ANNUAL-20261340-Co"), Err(LicenseError::InvalidDate(_))));
        assert_eq!(
            d.decode("CAJA-TRIAL-0-Co"),
            Err(LicenseError::MissingExpiration(LicenseTier::Trial))
        );
        assert_eq!(d.decode("CAJA-LIFETIME-0- "), Err(LicenseError::MissingCompany));
    }

    #[test]
    fn test_time_boxed_valid_through_expiration_day() {
        let key = "CAJA-TRIAL-20260301-Co";
        assert!(validate_key(&DelimitedKeyDecoder, key, date(2026, 3, 1)).is_valid);

        let status = validate_key(&DelimitedKeyDecoder, key, date(2026, 3, 2));
        assert!(!status.is_valid);
        assert!(status.message.contains("expired"));
        assert_eq!(status.tier, Some(LicenseTier::Trial));
    }

    #[test]
    fn test_lifetime_never_expires() {
        let status = validate_key(&DelimitedKeyDecoder, "CAJA-LIFETIME-0-Co", date(2999, 1, 1));
        assert!(status.is_valid);
        assert!(status.expiration_date.is_none());

        // a date on a lifetime key is carried but ignored
        let status = validate_key(&DelimitedKeyDecoder, "CAJA-LIFETIME-20200101-Co", date(2030, 1, 1));
        assert!(status.is_valid);
    }

    #[test]
    fn test_invalid_key_has_no_partial_claims() {
        let status = validate_key(&DelimitedKeyDecoder, "garbage", date(2026, 1, 1));
        assert!(!status.is_valid);
        assert!(status.tier.is_none());
        assert!(status.company_name.is_none());
    }

    #[test]
    fn test_not_found_message() {
        assert!(LicenseStatus::not_found().message.contains("not found"));
    }
}
