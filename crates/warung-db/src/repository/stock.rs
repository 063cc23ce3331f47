//! # Stock Ledger Repository
//!
//! Append-only movement log plus the explicit inventory operations that
//! feed it. Sale deductions are written by the checkout committer; this
//! repository owns everything else:
//!
//! - purchase-in (restock from supplier)
//! - count adjustment (physical count overrides the system figure)
//! - void / customer-return movements, which may or may not touch live
//!   stock depending on store policy
//!
//! Entries are never updated or deleted. Each movement that changes live
//! stock does so in the same SQLite transaction as its ledger entry.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use warung_core::{StockLog, StockLogKind};

/// Whether a void or customer return puts goods back on the shelf.
///
/// `LogOnly` records the movement for the audit trail without touching
/// live stock (damaged goods, consumed items). `Restock` also restores
/// the quantity to inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnPolicy {
    #[default]
    LogOnly,
    Restock,
}

#[derive(Debug, Clone)]
pub struct StockLogRepository {
    pool: SqlitePool,
}

impl StockLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockLogRepository { pool }
    }

    /// Records goods arriving from a supplier and increments live stock.
    pub async fn record_purchase_in(
        &self,
        product_id: &str,
        quantity: i64,
        unit_cost: i64,
        reference: Option<String>,
    ) -> DbResult<StockLog> {
        if quantity <= 0 {
            return Err(DbError::invalid_movement(format!(
                "purchase-in quantity must be positive, got {quantity}"
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::not_found("Product", product_id));
        }

        let entry = StockLog {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            kind: StockLogKind::PurchaseIn,
            quantity_delta: quantity,
            unit_cost,
            value_delta: quantity * unit_cost,
            reference,
            created_at: now,
        };
        insert_entry(&mut tx, &entry).await?;

        tx.commit().await?;
        info!(product_id, quantity, unit_cost, "purchase-in recorded");
        Ok(entry)
    }

    /// Overrides live stock with a physical count. The ledger entry holds
    /// the signed difference between counted and system stock; a count
    /// that matches the system still produces an entry (delta 0) so the
    /// audit trail shows the count happened.
    pub async fn record_count_adjustment(
        &self,
        product_id: &str,
        counted: i64,
        reference: Option<String>,
    ) -> DbResult<StockLog> {
        if counted < 0 {
            return Err(DbError::invalid_movement(format!(
                "physical count cannot be negative, got {counted}"
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let system: Option<(i64, i64)> = sqlx::query_as(
            "SELECT stock, cost_price FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((system_stock, cost_price)) = system else {
            tx.rollback().await?;
            return Err(DbError::not_found("Product", product_id));
        };

        sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(product_id)
            .bind(counted)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let delta = counted - system_stock;
        let entry = StockLog {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            kind: StockLogKind::CountAdjustment,
            quantity_delta: delta,
            unit_cost: cost_price,
            value_delta: delta * cost_price,
            reference,
            created_at: now,
        };
        insert_entry(&mut tx, &entry).await?;

        tx.commit().await?;
        info!(product_id, system_stock, counted, delta, "count adjustment recorded");
        Ok(entry)
    }

    /// Records a void or customer return for a previously sold quantity.
    ///
    /// The ledger delta is always positive (goods coming back from the
    /// sale's point of view); whether live stock changes is up to
    /// `policy`.
    pub async fn record_return(
        &self,
        product_id: &str,
        kind: StockLogKind,
        quantity: i64,
        policy: ReturnPolicy,
        reference: Option<String>,
    ) -> DbResult<StockLog> {
        if !matches!(kind, StockLogKind::Void | StockLogKind::ReturnOut) {
            return Err(DbError::invalid_movement(format!(
                "record_return only accepts void or return movements, got {kind:?}"
            )));
        }
        if quantity <= 0 {
            return Err(DbError::invalid_movement(format!(
                "return quantity must be positive, got {quantity}"
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let cost_price: Option<i64> =
            sqlx::query_scalar("SELECT cost_price FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(cost_price) = cost_price else {
            tx.rollback().await?;
            return Err(DbError::not_found("Product", product_id));
        };

        if policy == ReturnPolicy::Restock {
            sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
                .bind(product_id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        let entry = StockLog {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            kind,
            quantity_delta: quantity,
            unit_cost: cost_price,
            value_delta: quantity * cost_price,
            reference,
            created_at: now,
        };
        insert_entry(&mut tx, &entry).await?;

        tx.commit().await?;
        info!(product_id, ?kind, quantity, restocked = (policy == ReturnPolicy::Restock), "return recorded");
        Ok(entry)
    }

    /// Full movement history for one product, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockLog>> {
        let entries = sqlx::query_as::<_, StockLog>(
            r#"
            SELECT id, product_id, kind, quantity_delta, unit_cost,
                   value_delta, reference, created_at
            FROM stock_logs
            WHERE product_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Movements recorded at or after `since`, oldest first.
    pub async fn list_since(&self, since: DateTime<Utc>) -> DbResult<Vec<StockLog>> {
        let entries = sqlx::query_as::<_, StockLog>(
            r#"
            SELECT id, product_id, kind, quantity_delta, unit_cost,
                   value_delta, reference, created_at
            FROM stock_logs
            WHERE created_at >= ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

async fn insert_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &StockLog,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_logs (
            id, product_id, kind, quantity_delta, unit_cost,
            value_delta, reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.product_id)
    .bind(entry.kind)
    .bind(entry.quantity_delta)
    .bind(entry.unit_cost)
    .bind(entry.value_delta)
    .bind(&entry.reference)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
