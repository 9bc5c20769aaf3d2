//! # Application Error Type
//!
//! Unified error type for terminal commands and startup.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Caja POS                               │
//! │                                                                         │
//! │  caja-core ── CoreError ──────┐                                         │
//! │  caja-db ──── DbError ────────┼──► AppError { kind, message }           │
//! │  caja-sync ── SyncError ──────┤         │                               │
//! │  license ──── LicenseStatus ──┘         │                               │
//! │                                         ▼                               │
//! │                          presentation layer (kind → dialog)             │
//! │                          startup (kind → exit code 1)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation errors are shown to the operator as-is. Persistence errors
//! are logged in full and surfaced with a generic message.

use serde::Serialize;
use std::fmt;

use caja_core::CoreError;
use caja_db::DbError;
use caja_sync::SyncError;

/// Exit code for a normal shutdown.
pub const EXIT_OK: u8 = 0;

/// Exit code when startup fails (configuration, license, database).
pub const EXIT_STARTUP_FAILURE: u8 = 1;

/// Exit code when a panic reaches the top-level handler.
pub const EXIT_FATAL: u8 = 2;

/// Error returned from terminal commands.
///
/// ## Serialization
/// ```json
/// {
///   "kind": "VALIDATION",
///   "message": "Quantity 1000 exceeds maximum allowed (999)"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Error categories the presentation layer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad operator input or a rule violation on the sale.
    Validation,

    /// The store server could not be reached or answered badly.
    Connectivity,

    /// Local storage failed.
    Persistence,

    /// Missing, invalid or expired license.
    Licensing,

    Internal,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        AppError {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::Validation, message)
    }

    pub fn licensing(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::Licensing, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::Internal, message)
    }

    /// Process exit code when this error aborts startup.
    pub fn exit_code(&self) -> u8 {
        EXIT_STARTUP_FAILURE
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

// =============================================================================
// Conversions
// =============================================================================

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        // Everything the sale aggregate rejects is the operator's to fix
        AppError::validation(err.to_string())
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. }
            | DbError::UniqueViolation { .. }
            | DbError::CheckViolation { .. } => AppError::validation(err.to_string()),
            err if err.is_unavailable() => {
                tracing::error!(error = %err, "Database unavailable");
                AppError::new(ErrorKind::Persistence, "Database unavailable")
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                AppError::new(ErrorKind::Persistence, "Database operation failed")
            }
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let kind = if err.is_connectivity() || err.is_protocol_error() {
            ErrorKind::Connectivity
        } else if err.is_config_error() {
            ErrorKind::Validation
        } else if matches!(err, SyncError::DatabaseError(_)) {
            ErrorKind::Persistence
        } else {
            ErrorKind::Internal
        };
        AppError::new(kind, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
