//! # Commission Repository
//!
//! Stores the card commission configuration. Writes append a new row and
//! deactivate the previous one, so the table doubles as a change history.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use caja_core::{CommissionConfig, Rate};

#[derive(Debug, sqlx::FromRow)]
struct CommissionRow {
    percent_rate_bps: i64,
    charges_tax_on_commission: bool,
    tax_rate_bps: i64,
    active: bool,
}

impl TryFrom<CommissionRow> for CommissionConfig {
    type Error = DbError;

    fn try_from(row: CommissionRow) -> DbResult<Self> {
        Ok(CommissionConfig {
            percent_rate: bps_column("percent_rate_bps", row.percent_rate_bps)?,
            charges_tax_on_commission: row.charges_tax_on_commission,
            tax_rate: bps_column("tax_rate_bps", row.tax_rate_bps)?,
            active: row.active,
        })
    }
}

pub(crate) fn bps_column(column: &str, value: i64) -> DbResult<Rate> {
    u32::try_from(value)
        .map(Rate::from_bps)
        .map_err(|_| DbError::corrupt(column, value))
}

#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRepository { pool }
    }

    /// The active configuration, if one is stored.
    pub async fn get_active(&self) -> DbResult<Option<CommissionConfig>> {
        let row = sqlx::query_as::<_, CommissionRow>(
            r#"
            SELECT percent_rate_bps, charges_tax_on_commission, tax_rate_bps, active
            FROM commission_config
            WHERE active = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(CommissionConfig::try_from).transpose()
    }

    /// The active configuration, or a disabled one when none is stored.
    pub async fn active_or_disabled(&self) -> DbResult<CommissionConfig> {
        Ok(self.get_active().await?.unwrap_or_default())
    }

    /// Replaces the active configuration.
    ///
    /// Saving an inactive configuration leaves no active row, which turns
    /// card commission off.
    pub async fn set_active(&self, config: &CommissionConfig) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE commission_config SET active = 0 WHERE active = 1")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO commission_config
                (percent_rate_bps, charges_tax_on_commission, tax_rate_bps, active, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(config.percent_rate.bps() as i64)
        .bind(config.charges_tax_on_commission)
        .bind(config.tax_rate.bps() as i64)
        .bind(config.active)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            percent_rate = %config.percent_rate,
            tax_on_commission = config.charges_tax_on_commission,
            active = config.active,
            "Commission configuration saved"
        );
        Ok(())
    }
}
