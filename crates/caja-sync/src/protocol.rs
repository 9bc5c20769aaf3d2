//! # Sync Protocol Messages
//!
//! JSON bodies exchanged with the store server.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Sync Round                                     │
//! │                                                                         │
//! │  1. CONNECTIVITY                                                       │
//! │     Terminal ───► GET  /api/sync/ping                                  │
//! │     Server   ◄─── 2xx (anything else aborts the round)                 │
//! │                                                                         │
//! │  2. PULL                                                               │
//! │     Terminal ───► POST /api/sync/cambios                               │
//! │                   { terminalId, lastSyncedAt, tiposRequeridos }        │
//! │     Server   ◄─── { totalCambios, cursor?, ...change sets }            │
//! │                                                                         │
//! │  3. PUSH (optional, only with pending outbox entries)                  │
//! │     Terminal ───► POST /api/sync/recibir-cambios                       │
//! │                   { terminalId, cambios: [...] }                       │
//! │     Server   ◄─── { exitosa, mensaje? }                                │
//! │                                                                         │
//! │  INFORMATIONAL                                                         │
//! │     GET /api/sync/estadisticas, GET /api/sync/health                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names on the wire are the server's (Spanish) ones; the Rust side
//! uses English names with explicit serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use caja_db::OutboxEntry;

use crate::error::SyncResult;

// =============================================================================
// Endpoints
// =============================================================================

pub const PING_PATH: &str = "/api/sync/ping";
pub const CHANGES_PATH: &str = "/api/sync/cambios";
pub const PUSH_PATH: &str = "/api/sync/recibir-cambios";
pub const STATISTICS_PATH: &str = "/api/sync/estadisticas";
pub const HEALTH_PATH: &str = "/api/sync/health";

// =============================================================================
// Pull
// =============================================================================

/// Body of `POST /api/sync/cambios`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    #[serde(rename = "terminalId")]
    pub terminal_id: String,

    /// `null` on the very first round.
    #[serde(rename = "lastSyncedAt")]
    pub last_synced_at: Option<DateTime<Utc>>,

    #[serde(rename = "tiposRequeridos")]
    pub requested_types: Vec<String>,
}

/// Response of `POST /api/sync/cambios`.
///
/// Only the change count and the optional cursor are interpreted here; the
/// change sets themselves are kept as raw JSON in [`ChangeResponse::changes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeResponse {
    #[serde(rename = "totalCambios")]
    pub total_changes: i64,

    /// Server-side cursor. When present it replaces the local clock as the
    /// next `lastSyncedAt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub changes: Map<String, Value>,
}

// =============================================================================
// Push
// =============================================================================

/// One outbox entry as sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalChange {
    pub id: String,

    #[serde(rename = "tipo")]
    pub entity_type: String,

    #[serde(rename = "entidadId")]
    pub entity_id: String,

    #[serde(rename = "datos")]
    pub payload: Value,

    #[serde(rename = "creadoEn")]
    pub created_at: DateTime<Utc>,
}

impl LocalChange {
    /// Fails when the stored payload isn't valid JSON.
    pub fn from_outbox(entry: &OutboxEntry) -> SyncResult<Self> {
        Ok(LocalChange {
            id: entry.id.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id.clone(),
            payload: entry.payload_json()?,
            created_at: entry.created_at,
        })
    }
}

/// Body of `POST /api/sync/recibir-cambios`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    #[serde(rename = "terminalId")]
    pub terminal_id: String,

    #[serde(rename = "cambios")]
    pub changes: Vec<LocalChange>,
}

impl PushRequest {
    pub fn ids(&self) -> Vec<String> {
        self.changes.iter().map(|c| c.id.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    #[serde(rename = "exitosa")]
    pub accepted: bool,

    #[serde(rename = "mensaje", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
