//! # Domain Errors
//!
//! Business-rule violations raised by the pure core. Storage-level failures
//! (including the checkout-time `StockConflict`) live in `warung-db`;
//! printer failures live in `warung-print`.
//!
//! ## Design Principles
//! 1. `thiserror` derive, never manual impls
//! 2. Variants carry context (product name, amounts) for user messages
//! 3. Typed enums, never strings

use thiserror::Error;

use crate::money::Money;

/// Core business logic errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Adding the line would exceed the product's on-hand stock, or the
    /// product has no stock at all.
    #[error("insufficient stock for {name}: available {available}, requested {requested}")]
    OutOfStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cash tendered is below the transaction total.
    #[error("insufficient payment: total {total}, received {received}")]
    InsufficientPayment { total: Money, received: Money },

    /// Checkout requires at least one cart line.
    #[error("cart is empty")]
    EmptyCart,

    /// A shift is already open on this terminal; close it first.
    #[error("shift already open (cashier {cashier})")]
    ShiftAlreadyOpen { cashier: String },

    /// No shift is open; open one before selling or closing.
    #[error("no open shift")]
    NoOpenShift,

    /// Quantity must be at least 1.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),
}

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;
