//! # Sync Commands
//!
//! Status queries and the operator's "sync now" button.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use caja_core::{Permission, Session};
use caja_sync::{PushOutcome, SyncOutcome};

use crate::error::AppResult;
use crate::state::{SyncState, SyncStatusDto};

/// Live status from the agent.
pub async fn get_sync_status(sync: &SyncState) -> SyncStatusDto {
    SyncStatusDto::from(&sync.agent().status().await)
}

/// Outbox entries waiting for the server.
pub async fn get_pending_sync_count(sync: &SyncState) -> AppResult<i64> {
    let status = sync.agent().refresh_status().await?;
    Ok(status.pending_outbox)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncNowResponse {
    /// False when a round was already in flight and this trigger was dropped.
    pub ran: bool,
    pub total_changes: i64,
    pub push: Option<PushOutcome>,
    pub status: SyncStatusDto,
}

/// Runs one round immediately.
pub async fn sync_now(session: &Session, sync: &SyncState) -> AppResult<SyncNowResponse> {
    session.require(Permission::SyncRun)?;
    info!(user = %session.username, "Manual sync requested");

    let outcome = sync.agent().sync_now().await?;
    let status = get_sync_status(sync).await;

    Ok(match outcome {
        SyncOutcome::Completed(report) => SyncNowResponse {
            ran: true,
            total_changes: report.total_changes,
            push: Some(report.push),
            status,
        },
        SyncOutcome::Skipped => SyncNowResponse {
            ran: false,
            total_changes: 0,
            push: None,
            status,
        },
    })
}

pub async fn server_statistics(session: &Session, sync: &SyncState) -> AppResult<Value> {
    session.require(Permission::ReportsView)?;
    Ok(sync.agent().server_statistics().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use caja_core::Role;
    use caja_db::{Database, DbConfig};
    use caja_sync::{SyncConfig, SyncMode};

    async fn state(mode: SyncMode) -> SyncState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = SyncConfig::default();
        config.terminal.id = "caja-01".to_string();
        config.sync.mode = mode;
        SyncState::new(config, db).unwrap()
    }

    #[tokio::test]
    async fn test_cashier_cannot_sync() {
        let sync = state(SyncMode::Manual).await;
        let cashier = Session::new("u-1", "ana", Role::Cashier);

        let err = sync_now(&cashier, &sync).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_offline_sync_is_refused() {
        let sync = state(SyncMode::Offline).await;
        let admin = Session::new("u-0", "root", Role::Administrator);

        let err = sync_now(&admin, &sync).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("disabled"));
    }

    #[tokio::test]
    async fn test_pending_count_reads_outbox() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.sync_outbox()
            .queue_for_sync("SALE", "sale-1", "{}")
            .await
            .unwrap();

        let mut config = SyncConfig::default();
        config.terminal.id = "caja-01".to_string();
        config.sync.mode = SyncMode::Manual;
        let sync = SyncState::new(config, db).unwrap();

        assert_eq!(get_pending_sync_count(&sync).await.unwrap(), 1);
        assert_eq!(get_sync_status(&sync).await.pending_outbox_count, 1);
    }
}
