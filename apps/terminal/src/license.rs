//! # License Gate
//!
//! Checks the stored key file at startup and activates new keys.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_stored()                                                      │
//! │                                                                         │
//! │  license.key missing ─────────────────────────► "License not found"     │
//! │  license.key present ── decode + evaluate ──┬─► valid: keep file        │
//! │                                             └─► invalid: delete file    │
//! │                                                                         │
//! │  activate(key)                                                          │
//! │                                                                         │
//! │  decode + evaluate ──┬─► valid: write license.key                       │
//! │                      └─► invalid: nothing stored                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The key file is plain text. Anyone who can write it can license the
//! terminal; the gate only keeps honest installations honest.

use chrono::NaiveDate;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use caja_core::license::{validate_key, DelimitedKeyDecoder, LicenseKeyDecoder};
use caja_core::LicenseStatus;

use crate::error::{AppError, AppResult};

pub struct LicenseGate {
    path: PathBuf,
    decoder: Box<dyn LicenseKeyDecoder>,
}

impl LicenseGate {
    /// Gate over `path` using the bundled `CAJA-...` key format.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_decoder(path, Box::new(DelimitedKeyDecoder))
    }

    pub fn with_decoder(path: impl Into<PathBuf>, decoder: Box<dyn LicenseKeyDecoder>) -> Self {
        LicenseGate {
            path: path.into(),
            decoder,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates the stored key. A key that fails is deleted, so the next
    /// check reports "not found".
    pub fn validate_stored(&self, today: NaiveDate) -> LicenseStatus {
        let key_text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                info!(path = ?self.path, "No license file");
                return LicenseStatus::not_found();
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "License file unreadable");
                self.discard();
                return LicenseStatus::invalid(e);
            }
        };

        let status = validate_key(self.decoder.as_ref(), &key_text, today);
        if status.is_valid {
            info!(
                tier = ?status.tier,
                company = ?status.company_name,
                "License valid"
            );
        } else {
            warn!(message = %status.message, "Stored license rejected");
            self.discard();
        }
        status
    }

    /// Like [`validate_stored`](Self::validate_stored), but an invalid
    /// license is an error.
    pub fn require_valid(&self, today: NaiveDate) -> AppResult<LicenseStatus> {
        let status = self.validate_stored(today);
        if status.is_valid {
            Ok(status)
        } else {
            Err(AppError::licensing(status.message))
        }
    }

    /// Validates a new key and stores it only when valid. An invalid key
    /// leaves any existing file alone.
    pub fn activate(&self, key_text: &str, today: NaiveDate) -> AppResult<LicenseStatus> {
        let status = validate_key(self.decoder.as_ref(), key_text, today);
        if !status.is_valid {
            warn!(message = %status.message, "License activation rejected");
            return Ok(status);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, format!("{}\n", key_text.trim()))?;

        info!(path = ?self.path, tier = ?status.tier, "License activated");
        Ok(status)
    }

    fn discard(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = ?self.path, "License file removed"),
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "Could not remove license file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use caja_core::LicenseTier;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn gate(dir: &TempDir) -> LicenseGate {
        LicenseGate::new(dir.path().join("license.key"))
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let status = gate(&dir).validate_stored(today());
        assert!(!status.is_valid);
        assert_eq!(status.message, "License not found");
    }

    #[test]
    fn test_valid_stored_key_is_kept() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        std::fs::write(gate.path(), "CAJA-LIFETIME-0-Tienda Uno\n").unwrap();

        let status = gate.validate_stored(today());
        assert!(status.is_valid);
        assert_eq!(status.tier, Some(LicenseTier::Lifetime));
        assert!(gate.path().exists());
    }

    #[test]
    fn test_expired_key_is_deleted() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        std::fs::write(gate.path(), "CAJA-MONTHLY-20260501-Tienda Uno").unwrap();

        let status = gate.validate_stored(today());
        assert!(!status.is_valid);
        assert!(status.message.contains("expired"));
        assert!(!gate.path().exists());

        let status = gate.validate_stored(today());
        assert_eq!(status.message, "License not found");
    }

    #[test]
    fn test_garbage_key_is_deleted() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        std::fs::write(gate.path(), "not a key").unwrap();

        assert!(!gate.validate_stored(today()).is_valid);
        assert!(!gate.path().exists());
    }

    #[test]
    fn test_require_valid_maps_to_licensing_error() {
        let dir = TempDir::new().unwrap();
        let err = gate(&dir).require_valid(today()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Licensing);
    }

    #[test]
    fn test_activate_stores_only_valid_keys() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        let status = gate.activate("CAJA-TRIAL-20260101-Tienda Uno", today()).unwrap();
        assert!(!status.is_valid);
        assert!(!gate.path().exists());

        let status = gate
            .activate("  CAJA-ANNUAL-20261231-Tienda Uno  ", today())
            .unwrap();
        assert!(status.is_valid);
        assert_eq!(
            std::fs::read_to_string(gate.path()).unwrap(),
            "CAJA-ANNUAL-20261231-Tienda Uno\n"
        );
        assert!(gate.validate_stored(today()).is_valid);
    }
}
