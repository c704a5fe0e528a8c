//! Cell values and the closed set of evaluation errors

use std::fmt;
use std::sync::Arc;

/// A scalar value as seen by formulas and stored in evaluated cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    String(SharedString),
    Error(CellError),
}

impl CellValue {
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        CellValue::String(SharedString::new(s))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    pub fn as_error(&self) -> Option<CellError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Name used in type-mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "text",
            CellValue::Error(_) => "error",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s.as_str()),
            CellValue::Error(e) => f.write_str(e.as_str()),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::string(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Evaluation error kinds.
///
/// The display token is stable and independent of any message attached to
/// the result that carries the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellError {
    /// A cell's evaluation re-entered itself
    Cycle,
    /// The formula text could not be compiled
    BadExpression,
    /// Invalid zone or unknown sheet
    InvalidReference,
    /// Vectorized position out of range, wrong argument count, lookup miss
    NotAvailable,
    /// Any other runtime failure
    Generic,
}

impl CellError {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Cycle => "#CYCLE",
            CellError::BadExpression => "#BAD_EXPR",
            CellError::InvalidReference => "#REF",
            CellError::NotAvailable => "#N/A",
            CellError::Generic => "#ERROR",
        }
    }

    /// Recognize an error token, case-insensitively.
    pub fn from_token(s: &str) -> Option<Self> {
        [
            CellError::Cycle,
            CellError::BadExpression,
            CellError::InvalidReference,
            CellError::NotAvailable,
            CellError::Generic,
        ]
        .into_iter()
        .find(|e| e.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference-counted string so values copied across matrices and caches
/// share their text.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedString(Arc<str>);

impl SharedString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tokens() {
        assert_eq!(CellError::Cycle.to_string(), "#CYCLE");
        assert_eq!(CellError::Generic.to_string(), "#ERROR");
        assert_eq!(CellError::from_token("#n/a"), Some(CellError::NotAvailable));
        assert_eq!(CellError::from_token("#DIV/0!"), None);
    }

    #[test]
    fn test_as_number() {
        assert_eq!(CellValue::from(2.5).as_number(), Some(2.5));
        assert_eq!(CellValue::from(true).as_number(), Some(1.0));
        assert_eq!(CellValue::from("2").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::from(false).to_string(), "FALSE");
        assert_eq!(CellValue::from(CellError::InvalidReference).to_string(), "#REF");
        assert_eq!(CellValue::Empty.to_string(), "");
    }
}
