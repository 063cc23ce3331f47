//! # warung-print: Best-Effort Receipt Delivery
//!
//! Takes rendered receipt bytes from the engine and delivers them to a
//! network thermal printer. Delivery is best-effort by contract: the
//! engine commits the sale first, then hands the receipt to the spooler
//! and never waits on the printer.
//!
//! ```text
//! engine ──enqueue──► PrintSpooler ──► PrinterTransport ──TCP──► printer
//!                     (background)     (bounded retry)
//! ```

pub mod error;
pub mod spooler;
pub mod transport;

pub use error::{PrintError, PrintResult};
pub use spooler::PrintSpooler;
pub use transport::{Connector, PrinterTransport, RetryPolicy, TcpConnector};
