//! # Sync Agent
//!
//! Runs sync rounds against the store server, either on demand or from a
//! periodic scheduler.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncAgent Architecture                           │
//! │                                                                         │
//! │   scheduler task ──┐        ┌──────────────────────────────────────┐   │
//! │   (automatic mode) │        │             SyncAgent                │   │
//! │                    ├──────► │                                      │   │
//! │   sync_now()  ─────┘        │  SyncSlot ── one round at a time     │   │
//! │   (operator)                │                                      │   │
//! │                             │  round:                              │   │
//! │                             │    ping ─► pull ─► record cursor     │   │
//! │                             │                 └► push outbox       │   │
//! │                             └───────┬───────────────────┬──────────┘   │
//! │                                     │                   │              │
//! │                                     ▼                   ▼              │
//! │                              SyncHttpClient       caja-db (cursor,     │
//! │                              (reqwest)            outbox)              │
//! │                                                                         │
//! │  STATE MACHINE:  Idle ──► Syncing ──► Idle   (success or failure)      │
//! │  A trigger while Syncing returns SyncOutcome::Skipped immediately.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use caja_db::{Database, SyncOutboxRepository};

use crate::client::SyncHttpClient;
use crate::config::{SyncConfig, SyncMode};
use crate::error::{SyncError, SyncResult};
use crate::guard::SyncSlot;
use crate::protocol::{ChangeRequest, LocalChange, PushRequest};

// =============================================================================
// Sync Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Syncing,
}

/// Current sync status for external queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub mode: SyncMode,
    pub terminal_id: String,
    pub scheduler_running: bool,

    /// Cursor sent as `lastSyncedAt` on the next round.
    pub last_synced_at: Option<DateTime<Utc>>,

    /// `totalCambios` of the last successful pull.
    pub last_change_count: i64,

    /// Outbox entries not yet accepted by the server.
    pub pending_outbox: i64,

    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SyncStatus {
    fn new(config: &SyncConfig) -> Self {
        SyncStatus {
            phase: SyncPhase::Idle,
            mode: config.mode(),
            terminal_id: config.terminal_id().to_string(),
            scheduler_running: false,
            last_synced_at: None,
            last_change_count: 0,
            pending_outbox: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.phase == SyncPhase::Syncing
    }
}

// =============================================================================
// Round Results
// =============================================================================

/// What happened to the outbox during a round.
///
/// Reported next to the pull result; a failed push never undoes a pull.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    Disabled,
    NothingPending,
    Accepted { count: u64 },
    Rejected { count: usize, message: String },
    Failed { count: usize, error: String },
}

impl PushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PushOutcome::Rejected { .. } | PushOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_changes: i64,

    /// New cursor: the server's `cursor` when sent, otherwise the local
    /// time the pull completed.
    pub synced_at: DateTime<Utc>,

    /// Change sets as returned by the server.
    pub changes: Map<String, Value>,

    pub push: PushOutcome,
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Completed(SyncReport),

    /// Another round was already running; nothing was sent.
    Skipped,
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            SyncOutcome::Skipped => None,
        }
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives sync events (the terminal logs them; a UI could render them).
pub trait SyncEventEmitter: Send + Sync {
    fn emit_status(&self, status: &SyncStatus);

    fn emit_completed(&self, report: &SyncReport);

    fn emit_error(&self, error: &SyncError);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_completed(&self, _report: &SyncReport) {}
    fn emit_error(&self, _error: &SyncError) {}
}

// =============================================================================
// Sync Agent
// =============================================================================

/// Cheap to clone; clones share the slot, status and scheduler.
#[derive(Clone)]
pub struct SyncAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    config: SyncConfig,
    client: SyncHttpClient,
    db: Database,
    slot: SyncSlot,
    status: RwLock<SyncStatus>,
    emitter: Arc<dyn SyncEventEmitter>,
    scheduler: Mutex<Option<Scheduler>>,
}

struct Scheduler {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncAgent {
    pub fn new(config: SyncConfig, db: Database) -> SyncResult<Self> {
        Self::with_emitter(config, db, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        config: SyncConfig,
        db: Database,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let client = SyncHttpClient::new(&config)?;

        Ok(SyncAgent {
            inner: Arc::new(AgentInner {
                status: RwLock::new(SyncStatus::new(&config)),
                config,
                client,
                db,
                slot: SyncSlot::new(),
                emitter,
                scheduler: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub async fn status(&self) -> SyncStatus {
        self.inner.status.read().await.clone()
    }

    /// Reloads the cursor and outbox count from the database into the status.
    pub async fn refresh_status(&self) -> SyncResult<SyncStatus> {
        let terminal_id = self.inner.config.terminal_id();
        let record = self.inner.db.sync_state().get(terminal_id).await?;
        let pending = self.inner.db.sync_outbox().count_pending().await?;

        Ok(self
            .update_status(|s| {
                if let Some(record) = record {
                    s.last_synced_at = record.last_synced_at;
                    s.last_change_count = record.last_change_count;
                }
                s.pending_outbox = pending;
            })
            .await)
    }

    pub async fn set_token(&self, token: Option<String>) {
        self.inner.client.set_token(token).await;
    }

    // =========================================================================
    // Sync Round
    // =========================================================================

    /// Runs one round now.
    ///
    /// Returns [`SyncOutcome::Skipped`] without touching the network when a
    /// round is already in flight.
    pub async fn sync_now(&self) -> SyncResult<SyncOutcome> {
        if !self.inner.config.is_sync_enabled() {
            return Err(SyncError::SyncDisabled);
        }

        let Some(_permit) = self.inner.slot.try_acquire() else {
            debug!("Sync already in progress, dropping trigger");
            return Ok(SyncOutcome::Skipped);
        };

        self.update_status(|s| {
            s.phase = SyncPhase::Syncing;
            s.last_attempt_at = Some(Utc::now());
        })
        .await;

        let result = self.run_round().await;
        let pending = self.inner.db.sync_outbox().count_pending().await;

        match result {
            Ok(report) => {
                self.update_status(|s| {
                    s.phase = SyncPhase::Idle;
                    s.last_synced_at = Some(report.synced_at);
                    s.last_change_count = report.total_changes;
                    s.last_error = match &report.push {
                        PushOutcome::Rejected { message, .. } => Some(message.clone()),
                        PushOutcome::Failed { error, .. } => Some(error.clone()),
                        _ => None,
                    };
                    if let Ok(pending) = pending {
                        s.pending_outbox = pending;
                    }
                })
                .await;
                self.inner.emitter.emit_completed(&report);
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                warn!(error = %e, connectivity = e.is_connectivity(), "Sync round failed");
                self.update_status(|s| {
                    s.phase = SyncPhase::Idle;
                    s.last_error = Some(e.to_string());
                    if let Ok(pending) = pending {
                        s.pending_outbox = pending;
                    }
                })
                .await;
                self.inner.emitter.emit_error(&e);
                Err(e)
            }
        }
    }

    async fn run_round(&self) -> SyncResult<SyncReport> {
        let inner = &self.inner;
        let started_at = Utc::now();
        let terminal_id = inner.config.terminal_id();

        inner.client.ping().await?;

        let state = inner.db.sync_state();
        let last_synced_at = state.last_synced_at(terminal_id).await?;

        let request = ChangeRequest {
            terminal_id: terminal_id.to_string(),
            last_synced_at,
            requested_types: inner.config.sync.requested_types.clone(),
        };
        let response = inner.client.fetch_changes(&request).await?;

        let synced_at = response.cursor.unwrap_or_else(Utc::now);
        state
            .record_success(terminal_id, synced_at, response.total_changes)
            .await?;

        info!(
            terminal_id = %terminal_id,
            total_changes = response.total_changes,
            previous = ?last_synced_at,
            synced_at = %synced_at,
            "Pulled changes from server"
        );

        let push = if inner.config.sync.push_enabled {
            self.push_pending().await
        } else {
            PushOutcome::Disabled
        };

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            total_changes: response.total_changes,
            synced_at,
            changes: response.changes,
            push,
        })
    }

    /// Pushes one batch of pending outbox entries.
    async fn push_pending(&self) -> PushOutcome {
        let inner = &self.inner;
        let outbox = inner.db.sync_outbox();

        let entries = match outbox.get_pending(inner.config.sync.push_batch_size).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Could not read sync outbox");
                return PushOutcome::Failed {
                    count: 0,
                    error: e.to_string(),
                };
            }
        };

        if entries.is_empty() {
            return PushOutcome::NothingPending;
        }

        // An unreadable payload is recorded on its own entry and left out
        // of the batch.
        let mut changes = Vec::with_capacity(entries.len());
        for entry in &entries {
            match LocalChange::from_outbox(entry) {
                Ok(change) => changes.push(change),
                Err(e) => {
                    warn!(outbox_id = %entry.id, error = %e, "Skipping unreadable outbox entry");
                    record_failure(&outbox, &[entry.id.clone()], &e.to_string()).await;
                }
            }
        }

        if changes.is_empty() {
            return PushOutcome::Failed {
                count: entries.len(),
                error: "No readable outbox entries".to_string(),
            };
        }

        let request = PushRequest {
            terminal_id: inner.config.terminal_id().to_string(),
            changes,
        };
        let ids = request.ids();
        let count = ids.len();

        match inner.client.push_changes(&request).await {
            Ok(response) if response.accepted => match outbox.mark_synced(&ids).await {
                Ok(marked) => {
                    info!(count = marked, "Pushed local changes");
                    PushOutcome::Accepted { count: marked }
                }
                Err(e) => {
                    error!(error = %e, "Server accepted push but outbox update failed");
                    PushOutcome::Failed {
                        count,
                        error: e.to_string(),
                    }
                }
            },
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Push rejected by server".to_string());
                warn!(count, message = %message, "Server rejected pushed changes");
                record_failure(&outbox, &ids, &message).await;
                PushOutcome::Rejected { count, message }
            }
            Err(e) => {
                warn!(count, error = %e, "Push failed");
                let error = e.to_string();
                record_failure(&outbox, &ids, &error).await;
                PushOutcome::Failed { count, error }
            }
        }
    }

    // =========================================================================
    // Scheduler
    // =========================================================================

    /// Starts the periodic scheduler (automatic mode only).
    ///
    /// The first round runs after `initial_delay_secs`, then every
    /// `interval_secs`. Starting an already running scheduler is a no-op.
    pub async fn start(&self) -> SyncResult<()> {
        let config = &self.inner.config;

        if !config.is_sync_enabled() {
            return Err(SyncError::SyncDisabled);
        }
        if !config.mode().is_scheduled() {
            return Err(SyncError::InvalidConfig(format!(
                "Scheduler requires automatic mode (configured: {})",
                config.mode()
            )));
        }

        let mut scheduler = self.inner.scheduler.lock().await;
        if scheduler.is_some() {
            debug!("Sync scheduler already running");
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.clone().run_scheduler(shutdown_rx));
        *scheduler = Some(Scheduler { shutdown_tx, task });
        drop(scheduler);

        self.update_status(|s| s.scheduler_running = true).await;

        info!(
            terminal_id = %config.terminal_id(),
            interval_secs = config.sync.interval_secs,
            initial_delay_secs = config.sync.initial_delay_secs,
            "Sync scheduler started"
        );
        Ok(())
    }

    /// Stops the scheduler. A round started by the scheduler is abandoned.
    pub async fn stop(&self) {
        let scheduler = self.inner.scheduler.lock().await.take();

        if let Some(Scheduler { shutdown_tx, task }) = scheduler {
            let _ = shutdown_tx.send(()).await;
            if let Err(e) = task.await {
                warn!(error = %e, "Sync scheduler task ended abnormally");
            }
            info!("Sync scheduler stopped");
        }

        self.update_status(|s| s.scheduler_running = false).await;
    }

    pub async fn is_running(&self) -> bool {
        self.inner.scheduler.lock().await.is_some()
    }

    async fn run_scheduler(self, mut shutdown_rx: mpsc::Receiver<()>) {
        tokio::select! {
            _ = tokio::time::sleep(self.inner.config.initial_delay()) => {}
            _ = shutdown_rx.recv() => return,
        }

        let mut ticker = tokio::time::interval(self.inner.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        result = self.sync_now() => match result {
                            Ok(SyncOutcome::Completed(report)) => debug!(
                                total_changes = report.total_changes,
                                "Scheduled sync completed"
                            ),
                            Ok(SyncOutcome::Skipped) => debug!("Scheduled sync skipped, round in progress"),
                            // Already logged and emitted by sync_now
                            Err(_) => {}
                        },
                        _ = shutdown_rx.recv() => {
                            info!("Shutdown during sync round, abandoning it");
                            self.update_status(|s| s.phase = SyncPhase::Idle).await;
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }

    // =========================================================================
    // Informational Queries
    // =========================================================================

    /// Server-side sync statistics (best effort, not part of a round).
    pub async fn server_statistics(&self) -> SyncResult<Value> {
        if !self.inner.config.is_sync_enabled() {
            return Err(SyncError::SyncDisabled);
        }
        self.inner.client.statistics().await
    }

    pub async fn server_health(&self) -> SyncResult<Value> {
        if !self.inner.config.is_sync_enabled() {
            return Err(SyncError::SyncDisabled);
        }
        self.inner.client.health().await
    }

    async fn update_status(&self, apply: impl FnOnce(&mut SyncStatus)) -> SyncStatus {
        let snapshot = {
            let mut status = self.inner.status.write().await;
            apply(&mut status);
            status.clone()
        };
        self.inner.emitter.emit_status(&snapshot);
        snapshot
    }
}

async fn record_failure(outbox: &SyncOutboxRepository, ids: &[String], error: &str) {
    if let Err(e) = outbox.mark_failed(ids, error).await {
        error!(error = %e, "Could not record push failure on outbox entries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_db::DbConfig;

    async fn agent_with_mode(mode: SyncMode) -> SyncAgent {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = SyncConfig::default();
        config.terminal.id = "caja-test".into();
        config.sync.mode = mode;
        SyncAgent::new(config, db).unwrap()
    }

    #[tokio::test]
    async fn test_initial_status() {
        let agent = agent_with_mode(SyncMode::Automatic).await;
        let status = agent.status().await;

        assert_eq!(status.phase, SyncPhase::Idle);
        assert_eq!(status.terminal_id, "caja-test");
        assert!(!status.scheduler_running);
        assert!(status.last_synced_at.is_none());
    }

    #[tokio::test]
    async fn test_offline_mode_refuses_to_sync() {
        let agent = agent_with_mode(SyncMode::Offline).await;

        assert!(matches!(agent.sync_now().await, Err(SyncError::SyncDisabled)));
        assert!(matches!(agent.start().await, Err(SyncError::SyncDisabled)));
        assert!(!agent.is_running().await);
    }

    #[tokio::test]
    async fn test_manual_mode_has_no_scheduler() {
        let agent = agent_with_mode(SyncMode::Manual).await;

        let err = agent.start().await.unwrap_err();
        assert!(err.is_config_error());
        assert!(!agent.is_running().await);
    }

    #[tokio::test]
    async fn test_refresh_status_reads_database() {
        let agent = agent_with_mode(SyncMode::Manual).await;
        let db = agent.inner.db.clone();

        db.sync_outbox()
            .queue_for_sync("SALE", "sale-1", "{}")
            .await
            .unwrap();
        db.sync_state()
            .record_success("caja-test", Utc::now(), 4)
            .await
            .unwrap();

        let status = agent.refresh_status().await.unwrap();
        assert_eq!(status.pending_outbox, 1);
        assert_eq!(status.last_change_count, 4);
        assert!(status.last_synced_at.is_some());
    }

    #[test]
    fn test_push_outcome_failure() {
        assert!(!PushOutcome::NothingPending.is_failure());
        assert!(!PushOutcome::Accepted { count: 2 }.is_failure());
        assert!(PushOutcome::Rejected {
            count: 1,
            message: "no".into()
        }
        .is_failure());
    }
}
