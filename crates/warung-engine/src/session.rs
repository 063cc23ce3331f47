//! # POS Session
//!
//! One session per terminal: the live cart, the pricing toggles, and the
//! open shift, orchestrated over the repositories and the print spooler.
//!
//! ## Checkout Flow
//! ```text
//! cart ──draft──► commit (atomic, re-checks stock) ──► shift accrual
//!                                                          │
//!                        cart cleared ◄── receipt enqueued ─┘
//! ```
//! The sale is durable before the receipt is rendered; a dead printer
//! can only ever cost paper, never money.
//!
//! ## Crash Recovery
//! [`PosSession::attach`] inspects the shift ledger on startup. If the
//! latest marker is an `open` without a `close`, the in-memory session is
//! rebuilt from the transactions committed since it opened, so a restart
//! mid-shift loses nothing.

use tracing::{info, instrument, warn};

use warung_core::receipt::{render_shift_close, render_transaction};
use chrono::{DateTime, Utc};
use warung_core::{
    Cart, CartTotals, CoreError, MethodTotals, Money, PaymentMethod, Product, ReceiptProfile,
    ShiftReconciliation, ShiftSession, StockLog, StockLogKind, Transaction,
};
use warung_db::{Database, DbError, ReturnPolicy};
use warung_print::PrintSpooler;

use crate::error::EngineResult;

/// Mid-shift status snapshot for the cashier or a supervisor.
#[derive(Debug, Clone)]
pub struct ShiftReport {
    pub cashier: String,
    pub opened_at: DateTime<Utc>,
    pub opening_float: Money,
    pub totals: MethodTotals,
    pub transaction_count: u64,
    pub expected_cash: Money,
    pub void_count: u64,
    pub return_count: u64,
}

/// The active state of one POS terminal.
pub struct PosSession {
    db: Database,
    profile: ReceiptProfile,
    spooler: Option<PrintSpooler>,
    return_policy: ReturnPolicy,
    cart: Cart,
    discount_active: bool,
    tax_active: bool,
    shift: Option<ShiftSession>,
}

impl PosSession {
    /// Attaches a session to the store, resuming any shift left open by a
    /// previous run.
    pub async fn attach(
        db: Database,
        profile: ReceiptProfile,
        spooler: Option<PrintSpooler>,
        return_policy: ReturnPolicy,
    ) -> EngineResult<Self> {
        let shift = match db.shifts().current_open().await? {
            Some(open) => {
                let (totals, count) = db.shifts().totals_since(open.created_at).await?;
                let mut session = ShiftSession::open(
                    open.cashier.clone(),
                    Money::new(open.opening_float),
                    open.created_at,
                );
                session.totals = totals;
                session.transaction_count = count;
                info!(
                    cashier = %open.cashier,
                    transactions = count,
                    "resumed open shift"
                );
                Some(session)
            }
            None => None,
        };

        Ok(PosSession {
            db,
            profile,
            spooler,
            return_policy,
            cart: Cart::new(),
            discount_active: false,
            tax_active: false,
            shift,
        })
    }

    // =========================================================================
    // Shift Lifecycle
    // =========================================================================

    /// Opens a shift with the starting drawer float. Fails if one is
    /// already open, in memory or in the ledger.
    #[instrument(skip(self))]
    pub async fn open_shift(&mut self, cashier: &str, opening_float: Money) -> EngineResult<()> {
        if let Some(existing) = &self.shift {
            return Err(CoreError::ShiftAlreadyOpen {
                cashier: existing.cashier.clone(),
            }
            .into());
        }
        if let Some(open) = self.db.shifts().current_open().await? {
            return Err(CoreError::ShiftAlreadyOpen {
                cashier: open.cashier,
            }
            .into());
        }

        let row = self.db.shifts().record_open(cashier, opening_float).await?;
        self.shift = Some(ShiftSession::open(cashier, opening_float, row.created_at));
        Ok(())
    }

    /// Closes the open shift against the counted drawer, persists the
    /// reconciliation and prints the close slip.
    #[instrument(skip(self))]
    pub async fn close_shift(&mut self, actual_cash: Money) -> EngineResult<ShiftReconciliation> {
        let session = self.shift.as_ref().ok_or(CoreError::NoOpenShift)?;
        let recon = session.reconcile(actual_cash);

        let row = self
            .db
            .shifts()
            .record_close(&session.cashier, session.opening_float, &recon)
            .await?;

        if let Some(spooler) = &self.spooler {
            let slip = render_shift_close(&self.profile, session, &recon, row.created_at);
            spooler.enqueue(slip);
        }

        if !recon.difference.is_zero() {
            warn!(
                cashier = %session.cashier,
                difference = recon.difference.amount(),
                "drawer did not balance"
            );
        }

        self.shift = None;
        self.cart.clear();
        Ok(recon)
    }

    pub fn current_shift(&self) -> Option<&ShiftSession> {
        self.shift.as_ref()
    }

    /// Read-only snapshot of the open shift: the running totals plus the
    /// void/return movements recorded since it opened. Derived, never
    /// stored.
    pub async fn shift_report(&self) -> EngineResult<ShiftReport> {
        let session = self.shift.as_ref().ok_or(CoreError::NoOpenShift)?;

        let mut void_count = 0u64;
        let mut return_count = 0u64;
        for entry in self.db.stock_logs().list_since(session.opened_at).await? {
            match entry.kind {
                StockLogKind::Void => void_count += 1,
                StockLogKind::ReturnOut => return_count += 1,
                _ => {}
            }
        }

        Ok(ShiftReport {
            cashier: session.cashier.clone(),
            opened_at: session.opened_at,
            opening_float: session.opening_float,
            totals: session.totals,
            transaction_count: session.transaction_count,
            expected_cash: session.expected_cash(),
            void_count,
            return_count,
        })
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Adds an active product to the cart by id.
    pub async fn add_to_cart(&mut self, product_id: &str, quantity: i64) -> EngineResult<()> {
        let product = self.require_product(product_id).await?;
        self.cart.add_line(&product, quantity)?;
        Ok(())
    }

    /// Adds by scanned barcode.
    pub async fn scan(&mut self, barcode: &str) -> EngineResult<()> {
        let product = self
            .db
            .products()
            .get_by_barcode(barcode)
            .await?
            .ok_or_else(|| DbError::not_found("Product", barcode))?;
        self.cart.add_line(&product, 1)?;
        Ok(())
    }

    pub fn decrement_line(&mut self, product_id: &str) {
        self.cart.decrement_line(product_id);
    }

    pub fn remove_line(&mut self, product_id: &str) {
        self.cart.remove_line(product_id);
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn set_discount(&mut self, active: bool) {
        self.discount_active = active;
    }

    pub fn set_tax(&mut self, active: bool) {
        self.tax_active = active;
    }

    /// Totals under the current toggles.
    pub fn totals(&self) -> CartTotals {
        self.cart.totals(self.discount_active, self.tax_active)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Commits the cart as one transaction. On success the shift accrues
    /// the sale, the cart is cleared and the receipt is queued; on any
    /// failure the cart is left intact for the cashier to retry.
    #[instrument(skip(self), fields(method = ?payment_method))]
    pub async fn checkout(
        &mut self,
        payment_method: PaymentMethod,
        cash_received: Money,
        receivable_paid: bool,
        note: Option<String>,
    ) -> EngineResult<Transaction> {
        if self.shift.is_none() {
            return Err(CoreError::NoOpenShift.into());
        }

        let draft = self.cart.checkout_draft(
            self.discount_active,
            self.tax_active,
            payment_method,
            cash_received,
        )?;

        let receivable_paid = receivable_paid && payment_method == PaymentMethod::Receivable;
        let (record, items) = self
            .db
            .transactions()
            .commit_checkout(&draft, receivable_paid, note)
            .await?;

        // Past this point the sale is durable: nothing below may fail the
        // checkout. The receipt renders from the rows the committer
        // returned, with no further database access.
        if let Some(shift) = &mut self.shift {
            shift.record_sale(payment_method, Money::new(record.total), receivable_paid);
        }
        self.cart.clear();

        if let Some(spooler) = &self.spooler {
            spooler.enqueue(render_transaction(&self.profile, &record, &items));
        }

        Ok(record)
    }

    /// Re-renders and queues the receipt of a past transaction.
    pub async fn reprint(&self, transaction_id: &str) -> EngineResult<()> {
        let Some(spooler) = &self.spooler else {
            return Ok(());
        };
        let record = self
            .db
            .transactions()
            .get_by_id(transaction_id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", transaction_id))?;
        let items = self.db.transactions().get_items(transaction_id).await?;
        spooler.enqueue(render_transaction(&self.profile, &record, &items));
        Ok(())
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Goods arriving from a supplier.
    pub async fn restock(
        &self,
        product_id: &str,
        quantity: i64,
        unit_cost: Money,
        reference: Option<String>,
    ) -> EngineResult<StockLog> {
        Ok(self
            .db
            .stock_logs()
            .record_purchase_in(product_id, quantity, unit_cost.amount(), reference)
            .await?)
    }

    /// Physical count overriding the system stock figure.
    pub async fn count_adjustment(
        &self,
        product_id: &str,
        counted: i64,
        reference: Option<String>,
    ) -> EngineResult<StockLog> {
        Ok(self
            .db
            .stock_logs()
            .record_count_adjustment(product_id, counted, reference)
            .await?)
    }

    /// Void or customer return, applied under the configured policy.
    pub async fn record_return(
        &self,
        product_id: &str,
        kind: StockLogKind,
        quantity: i64,
        reference: Option<String>,
    ) -> EngineResult<StockLog> {
        Ok(self
            .db
            .stock_logs()
            .record_return(product_id, kind, quantity, self.return_policy, reference)
            .await?)
    }

    async fn require_product(&self, product_id: &str) -> EngineResult<Product> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        Ok(product)
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::AsyncWrite;
    use warung_db::DbConfig;
    use warung_print::{Connector, PrinterTransport, RetryPolicy};

    /// Opt-in log output for debugging: `RUST_LOG=debug cargo test`.
    fn init_tracing() {
        static ONCE: std::sync::Once = std::sync::Once::new();
        ONCE.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        });
    }

    async fn store_with(products: &[(&str, i64, i64, i64)]) -> Database {
        init_tracing();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        for (id, sell, cost, stock) in products {
            let p = Product {
                id: (*id).to_string(),
                name: format!("Item {id}"),
                category: "umum".to_string(),
                barcode: Some(format!("899{id}")),
                sell_price: *sell,
                cost_price: *cost,
                stock: *stock,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            db.products().insert(&p).await.unwrap();
        }
        db
    }

    async fn session(db: &Database) -> PosSession {
        PosSession::attach(
            db.clone(),
            ReceiptProfile::default(),
            None,
            ReturnPolicy::LogOnly,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn full_shift_cycle_balances() {
        let db = store_with(&[("a", 20_000, 15_000, 10)]).await;
        let mut pos = session(&db).await;

        pos.open_shift("Ani", Money::new(200_000)).await.unwrap();

        pos.add_to_cart("a", 2).await.unwrap();
        let tx = pos
            .checkout(PaymentMethod::Cash, Money::new(50_000), false, None)
            .await
            .unwrap();
        assert_eq!(tx.total, 40_000);
        assert_eq!(tx.change, 10_000);
        assert!(pos.cart().is_empty());

        let shift = pos.current_shift().unwrap();
        assert_eq!(shift.expected_cash().amount(), 240_000);

        let recon = pos.close_shift(Money::new(240_000)).await.unwrap();
        assert_eq!(recon.difference.amount(), 0);
        assert!(pos.current_shift().is_none());

        // Drawer figures landed in the ledger.
        let latest = db.shifts().latest().await.unwrap().unwrap();
        assert_eq!(latest.expected_cash, Some(240_000));
    }

    #[tokio::test]
    async fn checkout_requires_open_shift() {
        let db = store_with(&[("a", 20_000, 15_000, 10)]).await;
        let mut pos = session(&db).await;

        pos.add_to_cart("a", 1).await.unwrap();
        let err = pos
            .checkout(PaymentMethod::Cash, Money::new(50_000), false, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(CoreError::NoOpenShift)
        ));
        // The cart survives the refusal.
        assert!(!pos.cart().is_empty());
    }

    #[tokio::test]
    async fn second_open_is_rejected_even_across_sessions() {
        let db = store_with(&[]).await;
        let mut pos = session(&db).await;
        pos.open_shift("Ani", Money::new(100_000)).await.unwrap();

        let err = pos.open_shift("Budi", Money::new(50_000)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(CoreError::ShiftAlreadyOpen { .. })
        ));

        // A fresh session against the same store sees the durable marker.
        let mut other = session(&db).await;
        let err = other
            .open_shift("Budi", Money::new(50_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(CoreError::ShiftAlreadyOpen { .. })
        ));
    }

    #[tokio::test]
    async fn double_close_fails_without_intervening_open() {
        let db = store_with(&[]).await;
        let mut pos = session(&db).await;

        pos.open_shift("Ani", Money::new(100_000)).await.unwrap();
        pos.close_shift(Money::new(100_000)).await.unwrap();

        let err = pos.close_shift(Money::new(100_000)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(CoreError::NoOpenShift)
        ));

        // A fresh session sees the Close marker in the ledger and refuses
        // to close as well.
        let mut other = session(&db).await;
        assert!(other.current_shift().is_none());
        let err = other.close_shift(Money::new(100_000)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(CoreError::NoOpenShift)
        ));

        // Only one Close row was ever written.
        let latest = db.shifts().latest().await.unwrap().unwrap();
        assert_eq!(latest.kind, warung_core::ShiftKind::Close);
    }

    #[tokio::test]
    async fn restart_mid_shift_rebuilds_totals() {
        let db = store_with(&[("a", 10_000, 7_000, 20)]).await;
        let mut pos = session(&db).await;

        pos.open_shift("Ani", Money::new(100_000)).await.unwrap();
        pos.add_to_cart("a", 3).await.unwrap();
        pos.checkout(PaymentMethod::Cash, Money::new(30_000), false, None)
            .await
            .unwrap();
        pos.add_to_cart("a", 1).await.unwrap();
        pos.checkout(PaymentMethod::Qris, Money::new(0), false, None)
            .await
            .unwrap();
        drop(pos);

        // Simulated restart: attach resumes the shift from the ledger.
        let resumed = session(&db).await;
        let shift = resumed.current_shift().unwrap();
        assert_eq!(shift.cashier, "Ani");
        assert_eq!(shift.transaction_count, 2);
        assert_eq!(shift.totals.cash.amount(), 30_000);
        assert_eq!(shift.totals.qris.amount(), 10_000);
        assert_eq!(shift.expected_cash().amount(), 130_000);
    }

    #[tokio::test]
    async fn failed_checkout_keeps_cart_and_shift_clean() {
        let db = store_with(&[("a", 10_000, 7_000, 2)]).await;
        let mut pos = session(&db).await;
        pos.open_shift("Ani", Money::new(100_000)).await.unwrap();

        pos.add_to_cart("a", 2).await.unwrap();

        // A competing sale drains the shelf behind the cart's back.
        db.stock_logs()
            .record_count_adjustment("a", 1, None)
            .await
            .unwrap();

        let err = pos
            .checkout(PaymentMethod::Cash, Money::new(50_000), false, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Db(DbError::StockConflict { .. })
        ));
        assert!(!pos.cart().is_empty());
        assert_eq!(pos.current_shift().unwrap().transaction_count, 0);
    }

    #[tokio::test]
    async fn unpaid_receivable_stays_out_of_the_drawer() {
        let db = store_with(&[("a", 25_000, 20_000, 5)]).await;
        let mut pos = session(&db).await;
        pos.open_shift("Ani", Money::new(100_000)).await.unwrap();

        pos.add_to_cart("a", 1).await.unwrap();
        pos.checkout(PaymentMethod::Receivable, Money::new(0), false, None)
            .await
            .unwrap();

        let shift = pos.current_shift().unwrap();
        assert_eq!(shift.totals.receivable_unpaid.amount(), 25_000);
        assert_eq!(shift.expected_cash().amount(), 100_000);
    }

    #[tokio::test]
    async fn scan_adds_one_by_barcode() {
        let db = store_with(&[("a", 12_000, 9_000, 5)]).await;
        let mut pos = session(&db).await;

        pos.scan("899a").await.unwrap();
        pos.scan("899a").await.unwrap();
        assert_eq!(pos.cart().total_quantity(), 2);

        let err = pos.scan("000000").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Db(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn shift_report_counts_voids_and_returns() {
        let db = store_with(&[("a", 10_000, 7_000, 20)]).await;
        let mut pos = session(&db).await;
        pos.open_shift("Ani", Money::new(50_000)).await.unwrap();

        pos.add_to_cart("a", 2).await.unwrap();
        pos.checkout(PaymentMethod::Cash, Money::new(20_000), false, None)
            .await
            .unwrap();
        pos.record_return("a", StockLogKind::Void, 1, None)
            .await
            .unwrap();
        pos.record_return("a", StockLogKind::ReturnOut, 1, None)
            .await
            .unwrap();

        let report = pos.shift_report().await.unwrap();
        assert_eq!(report.transaction_count, 1);
        assert_eq!(report.totals.cash.amount(), 20_000);
        assert_eq!(report.expected_cash.amount(), 70_000);
        assert_eq!(report.void_count, 1);
        assert_eq!(report.return_count, 1);

        pos.close_shift(Money::new(70_000)).await.unwrap();
        let err = pos.shift_report().await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(CoreError::NoOpenShift)
        ));
    }

    #[tokio::test]
    async fn return_follows_store_policy() {
        let db = store_with(&[("a", 10_000, 7_000, 5)]).await;

        let log_only = session(&db).await;
        log_only
            .record_return("a", StockLogKind::ReturnOut, 1, None)
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id("a").await.unwrap().unwrap().stock, 5);

        let restocking = PosSession::attach(
            db.clone(),
            ReceiptProfile::default(),
            None,
            ReturnPolicy::Restock,
        )
        .await
        .unwrap();
        restocking
            .record_return("a", StockLogKind::ReturnOut, 1, None)
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id("a").await.unwrap().unwrap().stock, 6);
    }

    // -------------------------------------------------------------------------
    // Receipt delivery through the spooler
    // -------------------------------------------------------------------------

    struct SinkStream {
        sink: Arc<Mutex<Vec<u8>>>,
    }

    impl AsyncWrite for SinkStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.sink.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct SinkConnector {
        sink: Arc<Mutex<Vec<u8>>>,
    }

    impl Connector for SinkConnector {
        type Stream = SinkStream;

        async fn connect(&self) -> io::Result<SinkStream> {
            Ok(SinkStream {
                sink: Arc::clone(&self.sink),
            })
        }
    }

    #[tokio::test]
    async fn checkout_queues_a_printable_receipt() {
        let db = store_with(&[("a", 20_000, 15_000, 10)]).await;

        let sink = Arc::new(Mutex::new(Vec::new()));
        let transport = PrinterTransport::new(
            SinkConnector {
                sink: Arc::clone(&sink),
            },
            "printer",
            RetryPolicy {
                max_attempts: 1,
                retry_delay: Duration::from_millis(1),
                settle_delay: Duration::from_millis(1),
            },
        );
        let (spooler, worker) = warung_print::PrintSpooler::spawn(transport);

        let mut pos = PosSession::attach(
            db.clone(),
            ReceiptProfile::default(),
            Some(spooler),
            ReturnPolicy::LogOnly,
        )
        .await
        .unwrap();

        pos.open_shift("Ani", Money::new(100_000)).await.unwrap();
        pos.add_to_cart("a", 1).await.unwrap();
        pos.checkout(PaymentMethod::Cash, Money::new(20_000), false, None)
            .await
            .unwrap();

        drop(pos);
        worker.await.unwrap();

        let bytes = sink.lock().unwrap().clone();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.contains("TOTAL"));
        assert!(text.contains("Rp20.000"));
        // Line items made it onto the paper straight from the committed
        // rows, without a post-commit read-back.
        assert!(text.contains("Item a"));
    }
}
