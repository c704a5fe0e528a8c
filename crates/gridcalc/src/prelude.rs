//! Prelude module - common imports for gridcalc users
//!
//! ```rust
//! use gridcalc::prelude::*;
//! ```

pub use crate::{
    // Value model
    CellAddress,
    CellError,
    CellPosition,
    CellRange,
    CellValue,
    CellValueType,
    EvaluatedCell,
    Locale,
    Range,
    SheetId,
    Workbook,
    Worksheet,
    Zone,

    // Engine
    Command,
    Engine,
    EngineOptions,
    EvaluationSummary,
    FormulaOutput,
    IterationRequest,
    PassReport,

    // Error types
    Error,
    Result,
};
