//! Formula error types

use gridcalc_core::{CellError, CellPosition, FunctionResult};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Failures raised while compiling or executing a formula.
///
/// Apart from [`FormulaError::CircularReference`], none of these ever leave
/// a cell: call and operator nodes turn them into error values with
/// [`FormulaError::to_result`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// Structural syntax failure
    #[error("Invalid formula: {0}")]
    Parse(String),

    /// Runtime failure (type mismatch, domain error)
    #[error("{0}")]
    Evaluation(String),

    /// An error value met where a plain value was required
    #[error("{kind}")]
    Cell {
        kind: CellError,
        message: Option<String>,
    },

    /// Unknown function name
    #[error("Invalid formula: unknown function {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Invalid number of arguments for the {function} function. Expected {expected}, but got {actual} instead.")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Reference to an invalid zone or a missing sheet
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Evaluation re-entered the cell at this position
    #[error("Circular reference")]
    CircularReference(CellPosition),
}

impl FormulaError {
    /// The error kind this failure is shown as.
    pub fn kind(&self) -> CellError {
        match self {
            FormulaError::Parse(_) | FormulaError::UnknownFunction(_) => CellError::BadExpression,
            FormulaError::Evaluation(_) => CellError::Generic,
            FormulaError::Cell { kind, .. } => *kind,
            FormulaError::ArgumentCount { .. } => CellError::NotAvailable,
            FormulaError::InvalidReference(_) => CellError::InvalidReference,
            FormulaError::CircularReference(_) => CellError::Cycle,
        }
    }

    pub fn to_result(&self) -> FunctionResult {
        let message = match self {
            FormulaError::Cell { message, .. } => message.clone(),
            other => Some(other.to_string()),
        };
        FunctionResult {
            message,
            ..FunctionResult::new(self.kind())
        }
    }

    /// Re-raise an error value carried by a result.
    pub fn from_result(result: &FunctionResult) -> Option<Self> {
        result.value.as_error().map(|kind| FormulaError::Cell {
            kind,
            message: result.message.clone(),
        })
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, FormulaError::CircularReference(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::CellValue;

    #[test]
    fn test_kinds() {
        assert_eq!(FormulaError::Evaluation("x".into()).kind(), CellError::Generic);
        assert_eq!(FormulaError::UnknownFunction("FOO".into()).kind(), CellError::BadExpression);
        let count = FormulaError::ArgumentCount {
            function: "ABS".into(),
            expected: "1".into(),
            actual: 2,
        };
        assert_eq!(count.to_result().value, CellValue::Error(CellError::NotAvailable));
    }

    #[test]
    fn test_carried_error_keeps_message() {
        let result = FunctionResult::error(CellError::InvalidReference, "gone");
        let err = FormulaError::from_result(&result).unwrap();
        assert_eq!(err.to_result(), result);
    }
}
