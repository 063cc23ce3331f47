//! # Repository Layer
//!
//! One repository per aggregate, each a thin `Clone` handle over the
//! shared pool. Multi-table writes (checkout, stock movements) run inside
//! explicit SQLite transactions owned by the repository method.

pub mod product;
pub mod shift;
pub mod stock;
pub mod transaction;

pub use product::ProductRepository;
pub use shift::ShiftRepository;
pub use stock::{ReturnPolicy, StockLogRepository};
pub use transaction::TransactionRepository;
