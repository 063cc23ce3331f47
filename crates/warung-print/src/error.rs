//! Printer transport errors.
//!
//! Two failure classes, deliberately distinct: connecting is retried (the
//! printer may still be warming up or briefly off the network), writing
//! is not (a half-written receipt must never be resent blindly).

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrintError {
    /// Every connect attempt failed. `attempts` is the total tried.
    #[error("could not reach printer at {target} after {attempts} attempts")]
    ConnectFailed {
        target: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// The connection was established but the payload could not be
    /// delivered. Never retried.
    #[error("failed to write receipt to printer at {target}")]
    WriteFailed {
        target: String,
        #[source]
        source: io::Error,
    },
}

pub type PrintResult<T> = Result<T, PrintError>;
