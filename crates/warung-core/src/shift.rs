//! # Shift Session
//!
//! The financial ledger of one cashier shift, as an explicit value rather
//! than ambient flags: the session is created on Open, accrues every
//! committed transaction, and is consumed by Close.
//!
//! ## Lifecycle
//! ```text
//! Closed ── open(cashier, float) ──► Open ── record_sale()* ──► Open
//!                                      │
//!                                      └── reconcile(actual) ──► Closed
//! ```
//! Only one shift may be open per terminal; the durable single-open
//! invariant is enforced by the shift repository against the ShiftLog
//! rows, not here.
//!
//! ## Expected Cash
//! `expected = opening float + cash sales + PAID receivables`. Unpaid
//! receivables are money the drawer never saw, so they are tracked but
//! excluded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::PaymentMethod;

// =============================================================================
// Running Totals
// =============================================================================

/// Running totals per payment method for the open shift. Reset to zero on
/// every Open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodTotals {
    pub cash: Money,
    pub qris: Money,
    pub debit: Money,
    pub transfer: Money,
    /// Receivables already settled; these count toward expected cash.
    pub receivable_paid: Money,
    /// Receivables still owed; excluded from expected cash.
    pub receivable_unpaid: Money,
}

impl MethodTotals {
    /// Accrues one sale total into the matching bucket.
    /// `receivable_paid` is only consulted for `PaymentMethod::Receivable`.
    pub fn record(&mut self, method: PaymentMethod, total: Money, receivable_paid: bool) {
        match method {
            PaymentMethod::Cash => self.cash += total,
            PaymentMethod::Qris => self.qris += total,
            PaymentMethod::Debit => self.debit += total,
            PaymentMethod::Transfer => self.transfer += total,
            PaymentMethod::Receivable => {
                if receivable_paid {
                    self.receivable_paid += total;
                } else {
                    self.receivable_unpaid += total;
                }
            }
        }
    }

    /// Grand total across every method, paid or not.
    pub fn grand_total(&self) -> Money {
        self.cash
            + self.qris
            + self.debit
            + self.transfer
            + self.receivable_paid
            + self.receivable_unpaid
    }
}

// =============================================================================
// Shift Session
// =============================================================================

/// The in-memory state of the open shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSession {
    pub cashier: String,
    /// Drawer cash at shift start ("modal").
    pub opening_float: Money,
    pub opened_at: DateTime<Utc>,
    pub totals: MethodTotals,
    pub transaction_count: u64,
}

impl ShiftSession {
    pub fn open(cashier: impl Into<String>, opening_float: Money, opened_at: DateTime<Utc>) -> Self {
        ShiftSession {
            cashier: cashier.into(),
            opening_float,
            opened_at,
            totals: MethodTotals::default(),
            transaction_count: 0,
        }
    }

    /// Accrues one committed transaction.
    pub fn record_sale(&mut self, method: PaymentMethod, total: Money, receivable_paid: bool) {
        self.totals.record(method, total, receivable_paid);
        self.transaction_count += 1;
    }

    /// Cash that should be in the drawer right now.
    pub fn expected_cash(&self) -> Money {
        self.opening_float + self.totals.cash + self.totals.receivable_paid
    }

    /// Computes the close reconciliation against the counted drawer.
    /// The session itself is dropped by the caller after persisting the
    /// Close row.
    pub fn reconcile(&self, actual_cash: Money) -> ShiftReconciliation {
        let expected = self.expected_cash();
        ShiftReconciliation {
            expected,
            actual: actual_cash,
            difference: actual_cash - expected,
        }
    }
}

/// Outcome of a shift close: `difference = actual − expected`. Negative
/// means the drawer is short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftReconciliation {
    pub expected: Money,
    pub actual: Money,
    pub difference: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session(float: i64) -> ShiftSession {
        ShiftSession::open("ani", Money::new(float), Utc::now())
    }

    #[test]
    fn fresh_session_expects_only_the_float() {
        let s = session(200_000);
        assert_eq!(s.expected_cash().amount(), 200_000);
        assert_eq!(s.transaction_count, 0);
    }

    #[test]
    fn cash_sales_accrue_into_expected() {
        let mut s = session(200_000);
        s.record_sale(PaymentMethod::Cash, Money::new(50_000), false);
        s.record_sale(PaymentMethod::Cash, Money::new(30_000), false);
        assert_eq!(s.expected_cash().amount(), 280_000);
        assert_eq!(s.transaction_count, 2);
    }

    #[test]
    fn unpaid_receivable_excluded_paid_included() {
        let mut s = session(200_000);
        s.record_sale(PaymentMethod::Receivable, Money::new(20_000), false);
        assert_eq!(s.expected_cash().amount(), 200_000);
        assert_eq!(s.totals.receivable_unpaid.amount(), 20_000);

        s.record_sale(PaymentMethod::Receivable, Money::new(15_000), true);
        assert_eq!(s.expected_cash().amount(), 215_000);
    }

    #[test]
    fn non_cash_methods_never_touch_the_drawer() {
        let mut s = session(100_000);
        s.record_sale(PaymentMethod::Qris, Money::new(40_000), false);
        s.record_sale(PaymentMethod::Debit, Money::new(25_000), false);
        s.record_sale(PaymentMethod::Transfer, Money::new(10_000), false);
        assert_eq!(s.expected_cash().amount(), 100_000);
        assert_eq!(s.totals.grand_total().amount(), 75_000);
    }

    #[test]
    fn reconciliation_example_balances() {
        // modal 200.000, cash 50.000 + 30.000, one unpaid bon of 20.000
        let mut s = session(200_000);
        s.record_sale(PaymentMethod::Cash, Money::new(50_000), false);
        s.record_sale(PaymentMethod::Cash, Money::new(30_000), false);
        s.record_sale(PaymentMethod::Receivable, Money::new(20_000), false);

        let r = s.reconcile(Money::new(280_000));
        assert_eq!(r.expected.amount(), 280_000);
        assert_eq!(r.difference.amount(), 0);
    }

    #[test]
    fn short_drawer_yields_negative_difference() {
        let mut s = session(100_000);
        s.record_sale(PaymentMethod::Cash, Money::new(50_000), false);

        let r = s.reconcile(Money::new(145_000));
        assert_eq!(r.difference.amount(), -5_000);
    }
}
