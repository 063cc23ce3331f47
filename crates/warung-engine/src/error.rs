//! Engine-level error type.
//!
//! A thin union over the domain and persistence errors. Printer errors
//! never appear here: delivery is best-effort and failures stay inside
//! the spooler.

use thiserror::Error;
use warung_core::CoreError;
use warung_db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type EngineResult<T> = Result<T, EngineError>;
