//! Error types for the engine

use gridcalc_core::SheetId;
use gridcalc_formula::FormulaError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by engine operations.
///
/// Evaluation never fails with these: a formula that cannot be computed
/// produces an error value in its cell instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Addressing or sheet-structure error
    #[error(transparent)]
    Core(#[from] gridcalc_core::Error),

    /// Formula error that escaped evaluation
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// No sheet with this id
    #[error("Sheet not found: {0}")]
    SheetNotFound(SheetId),
}
