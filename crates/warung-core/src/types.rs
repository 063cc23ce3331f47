//! # Domain Types
//!
//! The persisted records of the POS engine.
//!
//! ## Record Overview
//! ```text
//! Product        owned by the inventory store, mutated only through
//!                explicit stock operations
//! Transaction    immutable once committed; one row per completed sale
//! TransactionItem structured line items (child rows, never a parsed string)
//! StockLog       append-only ledger of non-sale stock movements
//! ShiftLog       Open/Close events bracketing a cashier shift
//! ```
//!
//! ## Dual Representation of Money
//! Database-facing fields are plain `i64` rupiah; `Money` accessors wrap
//! them for arithmetic and rendering. Mirrors how the price fields travel
//! through the storage layer untyped and gain their type at the edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Payment Method
// =============================================================================

/// How a transaction was settled.
///
/// Receivable ("bon") is a credit sale: the customer owes the amount.
/// A receivable only counts toward expected drawer cash once it is marked
/// paid on the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Qris,
    Debit,
    Transfer,
    Receivable,
}

impl PaymentMethod {
    /// Label printed on receipts and shift summaries.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "TUNAI",
            PaymentMethod::Qris => "QRIS",
            PaymentMethod::Debit => "DEBIT",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Receivable => "BON",
        }
    }

    /// True when the tendered amount can differ from the total (change is
    /// possible). Every non-cash method settles exactly at the total.
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `stock` is the on-hand count and is never negative after a committed
/// operation; the checkout committer and the stock repository are the only
/// writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the cashier and on receipts.
    pub name: String,

    /// Free-form category used for browsing and reports.
    pub category: String,

    /// Barcode (EAN-13, UPC-A, ...), if the product carries one.
    pub barcode: Option<String>,

    /// Unit sell price in rupiah.
    pub sell_price: i64,

    /// Unit cost price in rupiah (for realized profit).
    pub cost_price: i64,

    /// On-hand stock count. Non-negative invariant.
    pub stock: i64,

    /// Soft-delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::new(self.sell_price)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::new(self.cost_price)
    }

    /// Per-unit margin (sell − cost).
    #[inline]
    pub fn unit_margin(&self) -> Money {
        self.price() - self.cost()
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A committed sale. Immutable once created; reprints and reports only
/// ever read it.
///
/// Invariants (enforced by the checkout committer):
/// - `total == subtotal - discount + tax`
/// - cash: `change == cash_received - total`
/// - non-cash: `cash_received == total` and `change == 0`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub subtotal: i64,
    pub discount: i64,
    pub tax: i64,
    pub total: i64,
    pub payment_method: PaymentMethod,
    pub cash_received: i64,
    pub change: i64,
    /// Realized profit: Σ (sell − cost) × qty across the line items.
    pub profit: i64,
    /// Only meaningful for `PaymentMethod::Receivable`: a paid receivable
    /// counts toward expected drawer cash at shift close.
    pub receivable_paid: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total_money(&self) -> Money {
        Money::new(self.total)
    }

    #[inline]
    pub fn change_money(&self) -> Money {
        Money::new(self.change)
    }
}

/// A line item of a committed transaction. Snapshot pattern: name and
/// prices are frozen at commit time so later product edits never rewrite
/// history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    pub quantity: i64,
    /// Unit sell price at time of sale (frozen).
    pub unit_price: i64,
    /// Unit cost at time of sale (frozen).
    pub unit_cost: i64,
    /// unit_price × quantity.
    pub line_total: i64,
}

impl TransactionItem {
    #[inline]
    pub fn unit_price_money(&self) -> Money {
        Money::new(self.unit_price)
    }

    #[inline]
    pub fn line_total_money(&self) -> Money {
        Money::new(self.line_total)
    }
}

// =============================================================================
// Stock Log
// =============================================================================

/// Kind tag of a stock ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StockLogKind {
    /// Restock / goods received. Positive delta, stock incremented.
    PurchaseIn,
    /// Implicit deduction written by a committed sale. Negative delta.
    SaleDeduction,
    /// Voided sale marker. Informational unless the return policy restocks.
    Void,
    /// Customer return going out of the sellable pool. Informational
    /// unless the return policy restocks.
    ReturnOut,
    /// Physical count reconciliation: delta = physical − system.
    CountAdjustment,
}

/// One append-only stock ledger entry. Never updated or deleted; a dispute
/// is resolved by appending a reversing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockLog {
    pub id: String,
    pub product_id: String,
    pub kind: StockLogKind,
    /// Signed quantity change.
    pub quantity_delta: i64,
    /// Unit cost at the time of the entry.
    pub unit_cost: i64,
    /// quantity_delta × unit_cost.
    pub value_delta: i64,
    /// Correlation id: the transaction, invoice or count session this
    /// entry belongs to.
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Shift Log
// =============================================================================

/// A shift lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShiftKind {
    Open,
    Close,
}

/// Durable record of a shift Open or Close.
///
/// The reconciliation fields are populated only on Close rows:
/// `expected_cash = opening_float + cash sales + paid receivables`,
/// `difference = actual_cash − expected_cash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShiftLog {
    pub id: String,
    pub kind: ShiftKind,
    pub cashier: String,
    /// Cash placed in the drawer at shift start ("modal").
    pub opening_float: i64,
    pub expected_cash: Option<i64>,
    pub actual_cash: Option<i64>,
    pub difference: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
