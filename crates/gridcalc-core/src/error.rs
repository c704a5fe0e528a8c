//! Error types for gridcalc-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by addressing and sheet-structure operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid zone or range text
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index beyond the addressable grid
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column letters or index beyond the addressable grid
    #[error("Column {0} out of bounds")]
    ColumnOutOfBounds(String),

    /// No sheet with this id or name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// The last sheet of a workbook cannot be removed
    #[error("A workbook must keep at least one sheet")]
    LastSheet,

    /// A merge overlaps an existing one
    #[error("Merge {0} overlaps an existing merged region")]
    MergedCellConflict(String),

    /// A sheet must have at least one row and one column
    #[error("Invalid sheet size: {rows} rows x {cols} columns")]
    InvalidSheetSize { rows: u32, cols: u16 },
}
