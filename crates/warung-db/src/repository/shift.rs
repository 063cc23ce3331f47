//! # Shift Repository
//!
//! Durable open/close markers for cashier shifts. The ledger is
//! append-only: opening a shift writes an `open` row, closing writes a
//! `close` row carrying the reconciliation figures. The single-open
//! invariant is derived from the most recent row rather than a mutable
//! flag, so a crashed process can pick up exactly where it left off.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;
use warung_core::{MethodTotals, Money, PaymentMethod, ShiftKind, ShiftLog, ShiftReconciliation};

#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Most recent shift row of any kind.
    pub async fn latest(&self) -> DbResult<Option<ShiftLog>> {
        let row = sqlx::query_as::<_, ShiftLog>(
            r#"
            SELECT id, kind, cashier, opening_float, expected_cash,
                   actual_cash, difference, created_at
            FROM shift_logs
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// The open marker of the running shift, if the latest row is an
    /// `open` without a matching `close`.
    pub async fn current_open(&self) -> DbResult<Option<ShiftLog>> {
        Ok(self
            .latest()
            .await?
            .filter(|row| row.kind == ShiftKind::Open))
    }

    pub async fn record_open(&self, cashier: &str, opening_float: Money) -> DbResult<ShiftLog> {
        let row = ShiftLog {
            id: Uuid::new_v4().to_string(),
            kind: ShiftKind::Open,
            cashier: cashier.to_string(),
            opening_float: opening_float.amount(),
            expected_cash: None,
            actual_cash: None,
            difference: None,
            created_at: Utc::now(),
        };
        self.insert(&row).await?;
        info!(cashier, opening_float = row.opening_float, "shift opened");
        Ok(row)
    }

    pub async fn record_close(
        &self,
        cashier: &str,
        opening_float: Money,
        recon: &ShiftReconciliation,
    ) -> DbResult<ShiftLog> {
        let row = ShiftLog {
            id: Uuid::new_v4().to_string(),
            kind: ShiftKind::Close,
            cashier: cashier.to_string(),
            opening_float: opening_float.amount(),
            expected_cash: Some(recon.expected.amount()),
            actual_cash: Some(recon.actual.amount()),
            difference: Some(recon.difference.amount()),
            created_at: Utc::now(),
        };
        self.insert(&row).await?;
        info!(
            cashier,
            expected = recon.expected.amount(),
            actual = recon.actual.amount(),
            difference = recon.difference.amount(),
            "shift closed"
        );
        Ok(row)
    }

    /// Per-method sale totals and transaction count since `since`,
    /// for rebuilding a live shift after a restart.
    pub async fn totals_since(&self, since: DateTime<Utc>) -> DbResult<(MethodTotals, u64)> {
        let rows: Vec<(PaymentMethod, bool, i64, i64)> = sqlx::query_as(
            r#"
            SELECT payment_method, receivable_paid, SUM(total), COUNT(*)
            FROM transactions
            WHERE created_at >= ?1
            GROUP BY payment_method, receivable_paid
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut totals = MethodTotals::default();
        let mut count = 0u64;
        for (method, receivable_paid, sum, n) in rows {
            totals.record(method, Money::new(sum), receivable_paid);
            count += n as u64;
        }
        Ok((totals, count))
    }

    async fn insert(&self, row: &ShiftLog) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shift_logs (
                id, kind, cashier, opening_float, expected_cash,
                actual_cash, difference, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&row.id)
        .bind(row.kind)
        .bind(&row.cashier)
        .bind(row.opening_float)
        .bind(row.expected_cash)
        .bind(row.actual_cash)
        .bind(row.difference)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn current_open_tracks_latest_marker() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let shifts = db.shifts();

        assert!(shifts.current_open().await.unwrap().is_none());

        let opened = shifts.record_open("Ani", Money::new(200_000)).await.unwrap();
        let open = shifts.current_open().await.unwrap().unwrap();
        assert_eq!(open.id, opened.id);
        assert_eq!(open.opening_float, 200_000);

        let recon = ShiftReconciliation {
            expected: Money::new(280_000),
            actual: Money::new(275_000),
            difference: Money::new(-5_000),
        };
        shifts
            .record_close("Ani", Money::new(200_000), &recon)
            .await
            .unwrap();

        assert!(shifts.current_open().await.unwrap().is_none());
        let latest = shifts.latest().await.unwrap().unwrap();
        assert_eq!(latest.kind, ShiftKind::Close);
        assert_eq!(latest.expected_cash, Some(280_000));
        assert_eq!(latest.difference, Some(-5_000));
    }

    #[tokio::test]
    async fn totals_since_groups_by_method_and_settlement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let since = Utc::now();

        async fn insert_sale(db: &Database, method: PaymentMethod, total: i64, paid: bool) {
            sqlx::query(
                r#"
                INSERT INTO transactions (
                    id, subtotal, discount, tax, total, payment_method,
                    cash_received, change, profit, receivable_paid, note, created_at
                ) VALUES (?1, ?2, 0, 0, ?2, ?3, ?2, 0, 0, ?4, NULL, ?5)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(total)
            .bind(method)
            .bind(paid)
            .bind(Utc::now())
            .execute(db.pool())
            .await
            .unwrap();
        }

        insert_sale(&db, PaymentMethod::Cash, 30_000, false).await;
        insert_sale(&db, PaymentMethod::Cash, 20_000, false).await;
        insert_sale(&db, PaymentMethod::Qris, 50_000, false).await;
        insert_sale(&db, PaymentMethod::Receivable, 15_000, true).await;
        insert_sale(&db, PaymentMethod::Receivable, 25_000, false).await;

        let (totals, count) = db.shifts().totals_since(since).await.unwrap();
        assert_eq!(count, 5);
        assert_eq!(totals.cash, Money::new(50_000));
        assert_eq!(totals.qris, Money::new(50_000));
        assert_eq!(totals.receivable_paid, Money::new(15_000));
        assert_eq!(totals.receivable_unpaid, Money::new(25_000));
        assert_eq!(totals.grand_total(), Money::new(140_000));
    }
}
