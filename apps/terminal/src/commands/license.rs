//! # License Commands

use chrono::Local;

use caja_core::{LicenseStatus, Permission, Session};

use crate::error::AppResult;
use crate::license::LicenseGate;

/// Re-checks the stored key against today's date.
pub fn get_license_status(gate: &LicenseGate) -> LicenseStatus {
    gate.validate_stored(Local::now().date_naive())
}

/// Activates a new key. Invalid keys are reported, not stored.
pub fn activate_license(
    session: &Session,
    gate: &LicenseGate,
    key_text: &str,
) -> AppResult<LicenseStatus> {
    session.require(Permission::SettingsEdit)?;
    gate.activate(key_text, Local::now().date_naive())
}
