//! # Sync State
//!
//! Owns the sync agent for the terminal and mirrors its status for the
//! presentation layer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SyncState                                                              │
//! │                                                                         │
//! │  ┌─────────────────┐  events   ┌──────────────────────────────────┐    │
//! │  │  SyncAgent      │ ────────► │  LoggingSyncEmitter              │    │
//! │  │  (scheduler,    │           │  • logs status / completed /     │    │
//! │  │   sync_now)     │           │    error via tracing             │    │
//! │  └─────────────────┘           │  • writes latest SyncStatusDto   │    │
//! │                                └──────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

use caja_db::Database;
use caja_sync::{
    SyncAgent, SyncConfig, SyncError, SyncEventEmitter, SyncPhase, SyncReport, SyncResult,
    SyncStatus,
};

/// Sync agent plus the last status it reported.
#[derive(Clone)]
pub struct SyncState {
    agent: SyncAgent,
    status: Arc<RwLock<SyncStatusDto>>,
}

impl SyncState {
    /// Builds the agent with a logging emitter. Does not start the scheduler.
    pub fn new(config: SyncConfig, db: Database) -> SyncResult<Self> {
        let status = Arc::new(RwLock::new(SyncStatusDto::default()));
        let emitter = Arc::new(LoggingSyncEmitter::new(status.clone()));
        let agent = SyncAgent::with_emitter(config, db, emitter)?;

        Ok(SyncState { agent, status })
    }

    pub fn agent(&self) -> &SyncAgent {
        &self.agent
    }

    /// Last status pushed by the agent.
    pub fn last_status(&self) -> SyncStatusDto {
        self.status
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Loads cursor and pending count from the database, starting the
    /// scheduler when the mode calls for it.
    pub async fn start(&self) -> SyncResult<()> {
        let status = self.agent.refresh_status().await?;
        self.store(SyncStatusDto::from(&status));

        if self.agent.config().mode().is_scheduled() {
            self.agent.start().await?;
        } else {
            info!(mode = %self.agent.config().mode(), "Sync scheduler not started");
        }
        Ok(())
    }

    pub async fn stop(&self) {
        self.agent.stop().await;
    }

    fn store(&self, dto: SyncStatusDto) {
        if let Ok(mut s) = self.status.write() {
            *s = dto;
        }
    }
}

/// Sync status as the presentation layer shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusDto {
    /// "idle" or "syncing"
    pub phase: String,

    pub sync_mode: String,

    /// RFC 3339
    pub last_sync_at: Option<String>,

    pub last_change_count: i64,
    pub pending_outbox_count: i64,
    pub scheduler_running: bool,
    pub error_message: Option<String>,
}

impl Default for SyncStatusDto {
    fn default() -> Self {
        SyncStatusDto {
            phase: "idle".to_string(),
            sync_mode: "offline".to_string(),
            last_sync_at: None,
            last_change_count: 0,
            pending_outbox_count: 0,
            scheduler_running: false,
            error_message: None,
        }
    }
}

impl From<&SyncStatus> for SyncStatusDto {
    fn from(status: &SyncStatus) -> Self {
        let phase = match status.phase {
            SyncPhase::Idle => "idle",
            SyncPhase::Syncing => "syncing",
        };

        SyncStatusDto {
            phase: phase.to_string(),
            sync_mode: status.mode.to_string(),
            last_sync_at: status.last_synced_at.map(|t| t.to_rfc3339()),
            last_change_count: status.last_change_count,
            pending_outbox_count: status.pending_outbox,
            scheduler_running: status.scheduler_running,
            error_message: status.last_error.clone(),
        }
    }
}

/// Logs sync events and keeps the latest status.
pub struct LoggingSyncEmitter {
    status: Arc<RwLock<SyncStatusDto>>,
}

impl LoggingSyncEmitter {
    pub fn new(status: Arc<RwLock<SyncStatusDto>>) -> Self {
        LoggingSyncEmitter { status }
    }
}

impl SyncEventEmitter for LoggingSyncEmitter {
    fn emit_status(&self, status: &SyncStatus) {
        let dto = SyncStatusDto::from(status);
        debug!(phase = %dto.phase, pending = dto.pending_outbox_count, "sync:status");

        if let Ok(mut s) = self.status.write() {
            *s = dto;
        }
    }

    fn emit_completed(&self, report: &SyncReport) {
        info!(
            total_changes = report.total_changes,
            synced_at = %report.synced_at,
            push = ?report.push,
            "sync:completed"
        );
    }

    fn emit_error(&self, err: &SyncError) {
        error!(error = %err, connectivity = err.is_connectivity(), "sync:error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_db::DbConfig;
    use caja_sync::SyncMode;

    async fn state(mode: SyncMode) -> SyncState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = SyncConfig::default();
        config.terminal.id = "caja-01".to_string();
        config.sync.mode = mode;
        SyncState::new(config, db).unwrap()
    }

    #[tokio::test]
    async fn test_manual_mode_does_not_schedule() {
        let state = state(SyncMode::Manual).await;
        state.start().await.unwrap();

        assert!(!state.agent().is_running().await);
        let dto = state.last_status();
        assert_eq!(dto.sync_mode, "manual");
        assert_eq!(dto.phase, "idle");
        assert_eq!(dto.pending_outbox_count, 0);
    }

    #[tokio::test]
    async fn test_automatic_mode_schedules_and_stops() {
        let state = state(SyncMode::Automatic).await;
        state.start().await.unwrap();
        assert!(state.agent().is_running().await);

        state.stop().await;
        assert!(!state.agent().is_running().await);
    }

    #[test]
    fn test_dto_default_is_idle() {
        let dto = SyncStatusDto::default();
        assert_eq!(dto.phase, "idle");
        assert!(dto.last_sync_at.is_none());
    }
}
