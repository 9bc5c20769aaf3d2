//! # Sale Repository
//!
//! Persists finalized sales. Open sales live only in terminal memory; a
//! sale reaches the database once, as a [`SaleSnapshot`], together with its
//! card commission and an outbox entry for the next push.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_finalized(snapshot, commission)                                 │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT sales          (header, totals, commission, net received)    │
//! │    INSERT sale_lines × N (frozen line data + computed amounts)         │
//! │    INSERT sync_outbox    ('SALE', sale_id, payload JSON)               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::commission::bps_column;
use crate::repository::sync::{insert_outbox_entry, OutboxEntry};
use caja_core::{
    CommissionBreakdown, LineAmounts, Money, PaymentMethod, Quantity, SaleSnapshot, SaleStatus,
    SaleTotals, SnapshotLine, OUTBOX_ENTITY_SALE,
};

// =============================================================================
// Stored Types
// =============================================================================

/// A finalized sale as stored, with its commission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSale {
    #[serde(flatten)]
    pub snapshot: SaleSnapshot,
    pub commission: CommissionBreakdown,
    pub net_received: Money,
}

impl StoredSale {
    pub fn new(snapshot: SaleSnapshot, commission: CommissionBreakdown) -> Self {
        let net_received = snapshot.totals.total - commission.total;
        StoredSale {
            snapshot,
            commission,
            net_received,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    status: SaleStatus,
    payment_method: PaymentMethod,
    customer_label: Option<String>,
    line_count: i64,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    commission_base_cents: i64,
    commission_tax_cents: i64,
    commission_total_cents: i64,
    net_received_cents: i64,
    created_at: DateTime<Utc>,
    finalized_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    product_id: String,
    name: String,
    unit: String,
    quantity_milli: i64,
    unit_price_cents: i64,
    discount_cents: i64,
    tax_rate_bps: i64,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
}

impl TryFrom<LineRow> for SnapshotLine {
    type Error = DbError;

    fn try_from(row: LineRow) -> DbResult<Self> {
        Ok(SnapshotLine {
            product_id: row.product_id,
            name: row.name,
            unit: row.unit,
            quantity: Quantity::from_milli(row.quantity_milli),
            unit_price: Money::from_cents(row.unit_price_cents),
            discount: Money::from_cents(row.discount_cents),
            tax_rate: bps_column("tax_rate_bps", row.tax_rate_bps)?,
            amounts: LineAmounts {
                subtotal: Money::from_cents(row.subtotal_cents),
                tax: Money::from_cents(row.tax_cents),
                total: Money::from_cents(row.total_cents),
            },
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for finalized sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Stores a finalized sale and queues it for push, atomically.
    ///
    /// Returns the outbox entry created for the sale.
    pub async fn insert_finalized(&self, sale: &StoredSale) -> DbResult<OutboxEntry> {
        let snapshot = &sale.snapshot;
        debug!(
            sale_id = %snapshot.sale_id,
            lines = snapshot.lines.len(),
            total = %snapshot.totals.total,
            "Persisting finalized sale"
        );

        let payload = serde_json::to_string(sale)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, status, payment_method, customer_label, line_count,
                subtotal_cents, tax_cents, total_cents,
                commission_base_cents, commission_tax_cents, commission_total_cents,
                net_received_cents, created_at, finalized_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14
            )
            "#,
        )
        .bind(&snapshot.sale_id)
        .bind(SaleStatus::Finalized)
        .bind(snapshot.payment_method)
        .bind(&snapshot.customer_label)
        .bind(snapshot.lines.len() as i64)
        .bind(snapshot.totals.subtotal.cents())
        .bind(snapshot.totals.tax.cents())
        .bind(snapshot.totals.total.cents())
        .bind(sale.commission.base.cents())
        .bind(sale.commission.tax_on_commission.cents())
        .bind(sale.commission.total.cents())
        .bind(sale.net_received.cents())
        .bind(snapshot.created_at)
        .bind(snapshot.finalized_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in snapshot.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    sale_id, position, product_id, name, unit,
                    quantity_milli, unit_price_cents, discount_cents, tax_rate_bps,
                    subtotal_cents, tax_cents, total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&snapshot.sale_id)
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(&line.name)
            .bind(&line.unit)
            .bind(line.quantity.milli())
            .bind(line.unit_price.cents())
            .bind(line.discount.cents())
            .bind(line.tax_rate.bps() as i64)
            .bind(line.amounts.subtotal.cents())
            .bind(line.amounts.tax.cents())
            .bind(line.amounts.total.cents())
            .execute(&mut *tx)
            .await?;
        }

        let entry =
            insert_outbox_entry(&mut *tx, OUTBOX_ENTITY_SALE, &snapshot.sale_id, &payload).await?;

        tx.commit().await?;

        info!(
            sale_id = %snapshot.sale_id,
            total = %snapshot.totals.total,
            commission = %sale.commission.total,
            "Sale persisted"
        );
        Ok(entry)
    }

    /// Gets a stored sale with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StoredSale>> {
        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, status, payment_method, customer_label, line_count,
                   subtotal_cents, tax_cents, total_cents,
                   commission_base_cents, commission_tax_cents, commission_total_cents,
                   net_received_cents, created_at, finalized_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if row.status != SaleStatus::Finalized {
            return Err(DbError::corrupt("sales.status", row.status));
        }

        let lines = self.get_lines(&row.id).await?;

        Ok(Some(StoredSale {
            snapshot: SaleSnapshot {
                sale_id: row.id,
                created_at: row.created_at,
                finalized_at: row.finalized_at,
                customer_label: row.customer_label,
                payment_method: row.payment_method,
                lines,
                totals: SaleTotals {
                    line_count: row.line_count as usize,
                    subtotal: Money::from_cents(row.subtotal_cents),
                    tax: Money::from_cents(row.tax_cents),
                    total: Money::from_cents(row.total_cents),
                },
            },
            commission: CommissionBreakdown {
                base: Money::from_cents(row.commission_base_cents),
                tax_on_commission: Money::from_cents(row.commission_tax_cents),
                total: Money::from_cents(row.commission_total_cents),
            },
            net_received: Money::from_cents(row.net_received_cents),
        }))
    }

    /// Lines of a stored sale, in the order they were rung up.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SnapshotLine>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT product_id, name, unit, quantity_milli, unit_price_cents,
                   discount_cents, tax_rate_bps, subtotal_cents, tax_cents, total_cents
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SnapshotLine::try_from).collect()
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use caja_core::commission::compute_commission;
    use caja_core::{CommissionConfig, Rate, Sale, SaleLine};

    fn finalized_snapshot(method: PaymentMethod) -> SaleSnapshot {
        let mut sale = Sale::new();
        sale.add_line(SaleLine::new(
            "P-1",
            "Cafe molido",
            "pz",
            Quantity::from_units(3),
            Money::from_cents(1000),
            Rate::from_percent(16),
        ))
        .unwrap();
        sale.add_line(SaleLine::new(
            "P-2",
            "Queso",
            "kg",
            Quantity::from_milli(750),
            Money::from_cents(1299),
            Rate::zero(),
        ))
        .unwrap();
        sale.apply_line_discount("P-1", Money::from_cents(500)).unwrap();
        sale.set_payment_method(method).unwrap();
        sale.finalize(Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let snapshot = finalized_snapshot(PaymentMethod::Card);
        let cfg = CommissionConfig::new(Rate::from_bps(350), true, Rate::from_percent(16));
        let stored = StoredSale::new(
            snapshot.clone(),
            compute_commission(snapshot.totals.total, &cfg),
        );

        let entry = db.sales().insert_finalized(&stored).await.unwrap();
        assert_eq!(entry.entity_type, OUTBOX_ENTITY_SALE);
        assert_eq!(entry.entity_id, snapshot.sale_id);

        let loaded = db.sales().get_by_id(&snapshot.sale_id).await.unwrap().unwrap();
        assert_eq!(loaded.snapshot.lines, snapshot.lines);
        assert_eq!(loaded.snapshot.totals, snapshot.totals);
        assert_eq!(loaded.snapshot.payment_method, PaymentMethod::Card);
        assert_eq!(loaded.commission, stored.commission);
        assert_eq!(loaded.net_received, stored.net_received);

        // 2900 + 974 = 3874 total
        assert_eq!(loaded.snapshot.totals.total.cents(), 3874);
        assert_eq!(loaded.snapshot.lines[0].product_id, "P-1");
    }

    #[tokio::test]
    async fn test_sale_and_outbox_commit_together() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let stored = StoredSale::new(
            finalized_snapshot(PaymentMethod::Cash),
            CommissionBreakdown::zero(),
        );

        db.sales().insert_finalized(&stored).await.unwrap();
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.sync_outbox().count_pending().await.unwrap(), 1);

        // a second insert of the same sale fails and leaves nothing behind
        let err = db.sales().insert_finalized(&stored).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.sync_outbox().count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_outbox_payload_carries_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let stored = StoredSale::new(
            finalized_snapshot(PaymentMethod::Transfer),
            CommissionBreakdown::zero(),
        );

        let entry = db.sales().insert_finalized(&stored).await.unwrap();
        let payload = entry.payload_json().unwrap();

        assert_eq!(payload["saleId"], stored.snapshot.sale_id);
        assert_eq!(payload["paymentMethod"], "transfer");
        assert_eq!(payload["lines"].as_array().unwrap().len(), 2);
        assert_eq!(payload["netReceived"], 3874);
    }

    #[tokio::test]
    async fn test_get_missing_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.sales().get_by_id("nope").await.unwrap().is_none());
    }
}
