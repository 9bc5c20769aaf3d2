//! # Sync Repositories
//!
//! The sync cursor and the outbox of local changes pending push.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  finalize sale                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. INSERT INTO sales / sale_lines                              │   │
//! │  │  2. INSERT INTO sync_outbox ('SALE', id, <snapshot JSON>)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            SYNC ROUND (push step)                               │   │
//! │  │  get_pending(batch) ──► POST recibir-cambios                    │   │
//! │  │     exitosa = true  ──► mark_synced(ids)                        │   │
//! │  │     exitosa = false ──► mark_failed(ids, mensaje)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

// =============================================================================
// Sync State
// =============================================================================

/// Persisted sync cursor for one terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateRecord {
    pub terminal_id: String,
    /// Cursor sent as `lastSyncedAt`; `None` before the first successful pull.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// `totalCambios` of the last successful pull.
    pub last_change_count: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SyncStateRepository {
    pool: SqlitePool,
}

impl SyncStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SyncStateRepository { pool }
    }

    pub async fn get(&self, terminal_id: &str) -> DbResult<Option<SyncStateRecord>> {
        let record = sqlx::query_as::<_, SyncStateRecord>(
            r#"
            SELECT terminal_id, last_synced_at, last_change_count, updated_at
            FROM sync_state
            WHERE terminal_id = ?1
            "#,
        )
        .bind(terminal_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// The cursor for a terminal, `None` if it never synced.
    pub async fn last_synced_at(&self, terminal_id: &str) -> DbResult<Option<DateTime<Utc>>> {
        Ok(self
            .get(terminal_id)
            .await?
            .and_then(|record| record.last_synced_at))
    }

    /// Advances the cursor after a successful pull.
    pub async fn record_success(
        &self,
        terminal_id: &str,
        synced_at: DateTime<Utc>,
        change_count: i64,
    ) -> DbResult<()> {
        debug!(
            terminal_id = %terminal_id,
            synced_at = %synced_at,
            change_count,
            "Recording sync cursor"
        );

        sqlx::query(
            r#"
            INSERT INTO sync_state (terminal_id, last_synced_at, last_change_count, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (terminal_id) DO UPDATE SET
                last_synced_at = excluded.last_synced_at,
                last_change_count = excluded.last_change_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(terminal_id)
        .bind(synced_at)
        .bind(change_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Outbox
// =============================================================================

/// A local change waiting to be pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub id: String,
    /// "SALE", ...
    pub entity_type: String,
    pub entity_id: String,
    /// JSON document pushed verbatim.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Parses the stored payload.
    pub fn payload_json(&self) -> DbResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Inserts an outbox entry on an existing connection, so callers can
/// enqueue inside their own transaction.
pub(crate) async fn insert_outbox_entry(
    conn: &mut SqliteConnection,
    entity_type: &str,
    entity_id: &str,
    payload: &str,
) -> DbResult<OutboxEntry> {
    let entry = OutboxEntry {
        id: Uuid::new_v4().to_string(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        payload: payload.to_string(),
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
        attempted_at: None,
        synced_at: None,
    };

    debug!(
        entity_type = %entity_type,
        entity_id = %entity_id,
        "Queuing for sync"
    );

    sqlx::query(
        r#"
        INSERT INTO sync_outbox (id, entity_type, entity_id, payload, attempts, created_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.payload)
    .bind(entry.created_at)
    .execute(conn)
    .await?;

    Ok(entry)
}

/// Repository for sync outbox operations.
#[derive(Debug, Clone)]
pub struct SyncOutboxRepository {
    pool: SqlitePool,
}

impl SyncOutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SyncOutboxRepository { pool }
    }

    /// Queues an entity for the next push.
    ///
    /// ```rust,ignore
    /// let payload = serde_json::to_string(&snapshot)?;
    /// db.sync_outbox().queue_for_sync("SALE", &snapshot.sale_id, &payload).await?;
    /// ```
    pub async fn queue_for_sync(
        &self,
        entity_type: &str,
        entity_id: &str,
        payload: &str,
    ) -> DbResult<OutboxEntry> {
        let mut conn = self.pool.acquire().await?;
        insert_outbox_entry(&mut *conn, entity_type, entity_id, payload).await
    }

    /// Pending entries, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT id, entity_type, entity_id, payload, attempts, last_error,
                   created_at, attempted_at, synced_at
            FROM sync_outbox
            WHERE synced_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<OutboxEntry>> {
        let entry = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT id, entity_type, entity_id, payload, attempts, last_error,
                   created_at, attempted_at, synced_at
            FROM sync_outbox
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Marks a pushed batch as synced, all or nothing.
    pub async fn mark_synced(&self, ids: &[String]) -> DbResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for id in ids {
            updated += sqlx::query(
                r#"
                UPDATE sync_outbox SET
                    synced_at = ?2,
                    attempted_at = ?2
                WHERE id = ?1 AND synced_at IS NULL
                "#,
            )
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Records a failed push attempt for a batch.
    pub async fn mark_failed(&self, ids: &[String], error: &str) -> DbResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for id in ids {
            sqlx::query(
                r#"
                UPDATE sync_outbox SET
                    attempts = attempts + 1,
                    last_error = ?2,
                    attempted_at = ?3
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .bind(error)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox WHERE synced_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries synced before `cutoff`. Returns the number deleted.
    pub async fn cleanup_synced_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sync_outbox
            WHERE synced_at IS NOT NULL AND synced_at < ?1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_sync_state_starts_empty() {
        let db = db().await;
        assert!(db.sync_state().get("caja-01").await.unwrap().is_none());
        assert!(db.sync_state().last_synced_at("caja-01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_success_upserts() {
        let db = db().await;
        let repo = db.sync_state();
        let t0 = Utc::now() - Duration::hours(1);
        let t1 = Utc::now();

        repo.record_success("caja-01", t0, 3).await.unwrap();
        repo.record_success("caja-01", t1, 7).await.unwrap();

        let record = repo.get("caja-01").await.unwrap().unwrap();
        assert_eq!(
            record.last_synced_at.map(|t| t.timestamp_millis()),
            Some(t1.timestamp_millis())
        );
        assert_eq!(record.last_change_count, 7);

        assert!(repo.get("caja-02").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_outbox_lifecycle() {
        let db = db().await;
        let outbox = db.sync_outbox();

        let a = outbox.queue_for_sync("SALE", "s-1", r#"{"saleId":"s-1"}"#).await.unwrap();
        let b = outbox.queue_for_sync("SALE", "s-2", r#"{"saleId":"s-2"}"#).await.unwrap();
        assert_eq!(outbox.count_pending().await.unwrap(), 2);

        outbox.mark_failed(&[a.id.clone()], "server down").await.unwrap();
        let failed = outbox.get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.last_error.as_deref(), Some("server down"));
        assert!(failed.synced_at.is_none());

        let synced = outbox.mark_synced(&[a.id.clone(), b.id.clone()]).await.unwrap();
        assert_eq!(synced, 2);
        assert_eq!(outbox.count_pending().await.unwrap(), 0);
        assert!(outbox.get_pending(10).await.unwrap().is_empty());

        // already synced entries are not counted twice
        assert_eq!(outbox.mark_synced(&[a.id]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_pending_respects_limit() {
        let db = db().await;
        let outbox = db.sync_outbox();
        for i in 0..5 {
            outbox
                .queue_for_sync("SALE", &format!("s-{}", i), "{}")
                .await
                .unwrap();
        }

        let pending = outbox.get_pending(3).await.unwrap();
        assert_eq!(pending.len(), 3);
        assert!(pending[0].payload_json().unwrap().is_object());
    }

    #[tokio::test]
    async fn test_cleanup_only_removes_synced() {
        let db = db().await;
        let outbox = db.sync_outbox();
        let a = outbox.queue_for_sync("SALE", "s-1", "{}").await.unwrap();
        outbox.queue_for_sync("SALE", "s-2", "{}").await.unwrap();
        outbox.mark_synced(&[a.id]).await.unwrap();

        let deleted = outbox
            .cleanup_synced_before(Utc::now() + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(outbox.count_pending().await.unwrap(), 1);
    }
}
