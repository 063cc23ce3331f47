//! # warung-db: SQLite Persistence
//!
//! Durable storage for the POS engine: product catalog, committed
//! transactions, the append-only stock ledger, and shift open/close
//! markers.
//!
//! ## Architecture
//! ```text
//! Database (pool + config)
//!     ├── ProductRepository       catalog reads, non-stock updates
//!     ├── TransactionRepository   atomic checkout committer
//!     ├── StockLogRepository      purchase-in / counts / returns
//!     └── ShiftRepository         open and close markers, rebuild totals
//! ```
//!
//! ## Guarantees
//!
//! - Checkout is all-or-nothing: stock decrements, the transaction row,
//!   its items and ledger entries commit together or not at all.
//! - Stock can never go negative; the conditional decrement is backed by
//!   a `CHECK (stock >= 0)` constraint in the schema.
//! - Timestamps are UTC; amounts are whole rupiah in `INTEGER` columns.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use migrations::{migration_status, run_migrations};
pub use pool::{Database, DbConfig};
pub use repository::{
    ProductRepository, ReturnPolicy, ShiftRepository, StockLogRepository, TransactionRepository,
};
