//! The universal result shape produced by functions and compiled formulas

use crate::cell::{CellError, CellValue};

/// Column-major rectangular array: `matrix[col][row]`.
pub type Matrix<T> = Vec<Vec<T>>;

/// A value plus the display format it suggests and an optional message
/// (used to explain errors).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionResult {
    pub value: CellValue,
    pub format: Option<String>,
    pub message: Option<String>,
}

impl FunctionResult {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            format: None,
            message: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn error(kind: CellError, message: impl Into<String>) -> Self {
        Self {
            value: CellValue::Error(kind),
            format: None,
            message: Some(message.into()),
        }
    }

    pub fn with_format(mut self, format: Option<String>) -> Self {
        self.format = format;
        self
    }

    pub fn is_error(&self) -> bool {
        self.value.is_error()
    }
}

impl From<CellValue> for FunctionResult {
    fn from(value: CellValue) -> Self {
        Self::new(value)
    }
}

/// `(cols, rows)` of a column-major matrix.
pub fn matrix_size<T>(matrix: &Matrix<T>) -> (usize, usize) {
    (matrix.len(), matrix.first().map_or(0, Vec::len))
}

/// Build a `cols × rows` matrix from a per-position callback.
pub fn generate_matrix<T>(cols: usize, rows: usize, mut f: impl FnMut(usize, usize) -> T) -> Matrix<T> {
    (0..cols).map(|c| (0..rows).map(|r| f(c, r)).collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_column_major() {
        let m = generate_matrix(2, 3, |c, r| c * 10 + r);
        assert_eq!(matrix_size(&m), (2, 3));
        assert_eq!(m[1][2], 12);
    }
}
