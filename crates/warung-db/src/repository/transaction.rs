//! # Transaction Repository - the Checkout Committer
//!
//! Turns a [`CheckoutDraft`] into durable rows, all-or-nothing:
//!
//! 1. per line, a conditional stock decrement re-checked against LIVE
//!    inventory (`... WHERE id = ? AND stock >= ?`) - the cart snapshot is
//!    not trusted at commit time
//! 2. the transaction row plus its structured line items
//! 3. one implicit sale-deduction entry per line in the stock ledger,
//!    correlated by transaction id
//!
//! Every step runs inside a single SQLite transaction. A failed stock
//! check rolls the whole thing back and surfaces
//! [`DbError::StockConflict`]; inventory is left exactly as it was.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use warung_core::{CheckoutDraft, StockLogKind, Transaction, TransactionItem};

/// Repository for committed sales.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Atomically commits a checkout draft.
    ///
    /// `receivable_paid` marks a credit sale as already settled (it then
    /// counts toward expected drawer cash); ignored for other methods.
    ///
    /// Returns the committed row together with its line items, so callers
    /// can render the receipt without a read-back that could fail after
    /// the sale is already durable.
    pub async fn commit_checkout(
        &self,
        draft: &CheckoutDraft,
        receivable_paid: bool,
        note: Option<String>,
    ) -> DbResult<(Transaction, Vec<TransactionItem>)> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, lines = draft.lines.len(), total = draft.totals.total.amount(), "committing checkout");

        let mut tx = self.pool.begin().await?;

        // Step 1: decrement stock per line, guarded against the live
        // value. Zero rows affected means either a lost race or a vanished
        // product; both abort the commit.
        for line in &draft.lines {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - ?2, updated_at = ?3
                WHERE id = ?1 AND stock >= ?2
                "#,
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                tx.rollback().await?;

                return match available {
                    Some(available) => Err(DbError::StockConflict {
                        name: line.name.clone(),
                        available,
                        requested: line.quantity,
                    }),
                    None => Err(DbError::not_found("Product", &line.product_id)),
                };
            }
        }

        // Step 2: the immutable transaction row.
        let record = Transaction {
            id: id.clone(),
            subtotal: draft.totals.subtotal.amount(),
            discount: draft.totals.discount.amount(),
            tax: draft.totals.tax.amount(),
            total: draft.totals.total.amount(),
            payment_method: draft.payment_method,
            cash_received: draft.cash_received.amount(),
            change: draft.change.amount(),
            profit: draft.profit.amount(),
            receivable_paid,
            note,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, subtotal, discount, tax, total, payment_method,
                cash_received, change, profit, receivable_paid, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&record.id)
        .bind(record.subtotal)
        .bind(record.discount)
        .bind(record.tax)
        .bind(record.total)
        .bind(record.payment_method)
        .bind(record.cash_received)
        .bind(record.change)
        .bind(record.profit)
        .bind(record.receivable_paid)
        .bind(&record.note)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        // Step 3: line items and the implicit sale-deduction ledger
        // entries, correlated by transaction id.
        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: record.id.clone(),
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                unit_cost: line.unit_cost,
                line_total: line.line_total().amount(),
            };
            sqlx::query(
                r#"
                INSERT INTO transaction_items (
                    id, transaction_id, product_id, name,
                    quantity, unit_price, unit_cost, line_total
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.transaction_id)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.unit_cost)
            .bind(item.line_total)
            .execute(&mut *tx)
            .await?;
            items.push(item);

            sqlx::query(
                r#"
                INSERT INTO stock_logs (
                    id, product_id, kind, quantity_delta, unit_cost,
                    value_delta, reference, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&line.product_id)
            .bind(StockLogKind::SaleDeduction)
            .bind(-line.quantity)
            .bind(line.unit_cost)
            .bind(-line.quantity * line.unit_cost)
            .bind(Some(record.id.as_str()))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %record.id, total = record.total, method = ?record.payment_method, "checkout committed");
        Ok((record, items))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let record = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, subtotal, discount, tax, total, payment_method,
                   cash_received, change, profit, receivable_paid, note, created_at
            FROM transactions
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Line items in insertion order (for reprints and reports).
    pub async fn get_items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(
            r#"
            SELECT id, transaction_id, product_id, name,
                   quantity, unit_price, unit_cost, line_total
            FROM transaction_items
            WHERE transaction_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Transactions committed at or after `since` (the shift window).
    pub async fn list_since(&self, since: DateTime<Utc>) -> DbResult<Vec<Transaction>> {
        let records = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, subtotal, discount, tax, total, payment_method,
                   cash_received, change, profit, receivable_paid, note, created_at
            FROM transactions
            WHERE created_at >= ?1
            ORDER BY created_at
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
