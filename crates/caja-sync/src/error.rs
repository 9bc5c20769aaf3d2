//! # Sync Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  Connectivity   │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Unreachable    │  │  SerializationFailed    │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  DeserializationFailed  │ │
//! │  │  ConfigLoad/Save│  │  HttpStatus     │  │                         │ │
//! │  │  SyncDisabled   │  │  RequestFailed  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │    Internal     │                              │
//! │  │  DatabaseError  │  │  Internal       │                              │
//! │  │                 │  │  ShuttingDown   │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is retried. A failed round surfaces its error and the next
//! scheduler tick starts a fresh one.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Server address doesn't form a usable base URL.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// The terminal is configured for offline operation.
    #[error("Sync is disabled (offline mode)")]
    SyncDisabled,

    // =========================================================================
    // Connectivity Errors
    // =========================================================================
    /// Server could not be reached (DNS, refused, reset).
    #[error("Server unreachable: {0}")]
    ServerUnreachable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server answered with a non-2xx status.
    #[error("Server returned HTTP {status} for {endpoint}")]
    HttpStatus { status: u16, endpoint: String },

    /// Any other transport-level failure.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Response body didn't match the expected shape.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Sync agent is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<caja_db::DbError> for SyncError {
    fn from(err: caja_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

/// ## Error Mapping
/// ```text
/// is_timeout()  → SyncError::Timeout
/// is_connect()  → SyncError::ServerUnreachable
/// is_status()   → SyncError::HttpStatus
/// is_decode()   → SyncError::DeserializationFailed
/// Other         → SyncError::RequestFailed
/// ```
impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "unknown endpoint".to_string());

        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else if err.is_connect() {
            SyncError::ServerUnreachable(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::HttpStatus {
                status: status.as_u16(),
                endpoint,
            }
        } else if err.is_decode() {
            SyncError::DeserializationFailed(err.to_string())
        } else {
            SyncError::RequestFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// True when the store server couldn't be reached or refused the call.
    ///
    /// The terminal keeps selling through these; they only delay the next
    /// successful round.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            SyncError::ServerUnreachable(_)
                | SyncError::Timeout(_)
                | SyncError::HttpStatus { .. }
                | SyncError::RequestFailed(_)
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
                | SyncError::SyncDisabled
        )
    }

    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            SyncError::SerializationFailed(_) | SyncError::DeserializationFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(SyncError::ServerUnreachable("refused".into()).is_connectivity());
        assert!(SyncError::Timeout("30s".into()).is_connectivity());
        assert!(SyncError::HttpStatus {
            status: 503,
            endpoint: "/api/sync/ping".into()
        }
        .is_connectivity());

        assert!(!SyncError::InvalidConfig("test".into()).is_connectivity());
        assert!(SyncError::InvalidConfig("test".into()).is_config_error());
        assert!(SyncError::SyncDisabled.is_config_error());

        assert!(SyncError::DeserializationFailed("missing field".into()).is_protocol_error());
        assert!(!SyncError::DeserializationFailed("x".into()).is_connectivity());
    }

    #[test]
    fn test_http_status_message() {
        let err = SyncError::HttpStatus {
            status: 401,
            endpoint: "/api/sync/cambios".into(),
        };
        assert_eq!(err.to_string(), "Server returned HTTP 401 for /api/sync/cambios");
    }

    #[test]
    fn test_db_error_conversion() {
        let err: SyncError = caja_db::DbError::PoolExhausted.into();
        assert!(matches!(err, SyncError::DatabaseError(_)));
    }
}
