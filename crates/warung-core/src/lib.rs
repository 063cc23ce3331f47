//! # warung-core: Pure Business Logic
//!
//! The heart of the Warung POS engine: every business rule lives here as a
//! pure function over plain data, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! warung-engine (session orchestration, one actor per terminal)
//!       │
//!       ├── warung-core (THIS CRATE)  money · cart · shift · receipt
//!       ├── warung-db                 SQLite repositories, atomic checkout
//!       └── warung-print              printer transport, best-effort
//! ```
//!
//! ## Modules
//!
//! - [`money`] - integer-rupiah [`Money`] with locale-correct rendering
//! - [`types`] - persisted domain records (Product, Transaction, logs)
//! - [`cart`] - the cart/pricing engine (10% discount-before-tax toggles)
//! - [`shift`] - shift session ledger and cash reconciliation
//! - [`receipt`] - the control-code receipt byte protocol
//! - [`error`] - typed domain errors
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: deterministic, no hidden state
//! 2. **No I/O**: database, network and hardware live in sibling crates
//! 3. **Integer money**: all amounts are whole rupiah in `i64`; floats are
//!    banned from every path that feeds reconciliation
//! 4. **Explicit errors**: typed enums, never strings or panics

pub mod cart;
pub mod error;
pub mod money;
pub mod receipt;
pub mod shift;
pub mod types;

pub use cart::{Cart, CartLine, CartTotals, CheckoutDraft};
pub use error::{CoreError, CoreResult};
pub use money::Money;
pub use receipt::{ReceiptBuilder, ReceiptProfile};
pub use shift::{MethodTotals, ShiftReconciliation, ShiftSession};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Flat discount toggle, in basis points (1000 = 10%).
///
/// The pricing engine deliberately supports only on/off at a fixed rate;
/// arbitrary percentages are out of scope.
pub const DISCOUNT_BPS: u32 = 1000;

/// Flat tax toggle, in basis points (1000 = 10%). Applied to the
/// post-discount amount, never the raw subtotal.
pub const TAX_BPS: u32 = 1000;
