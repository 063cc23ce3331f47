//! # warung-engine: Session Orchestration
//!
//! Ties the pure core, the SQLite repositories and the print spooler into
//! one [`PosSession`] per terminal. This crate owns the ordering rules:
//! shifts gate checkouts, commits precede receipts, and printer failures
//! never surface to the cashier.

pub mod error;
pub mod session;

pub use error::{EngineError, EngineResult};
pub use session::{PosSession, ShiftReport};
