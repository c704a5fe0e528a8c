//! # gridcalc
//!
//! An in-memory spreadsheet calculation engine.
//!
//! The engine keeps raw cell content, compiles formulas once per distinct
//! text and evaluates cells lazily: reading a cell computes it together
//! with everything it depends on. Edits invalidate only the cells whose
//! dependencies overlap the edited zone, found through an R-tree over the
//! dependency ranges.
//!
//! ## Features
//!
//! - Locale-aware literals (`3,5` in German, `40%`, dates)
//! - Formulas with references across sheets, unbounded ranges (`A:A`),
//!   vectorized operators and functions
//! - Cycle detection, with `#CYCLE` on every cell of the cycle
//! - Multi-pass evaluation driven by iteration hooks
//!
//! ## Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let sheet = engine.workbook().first_sheet_id();
//!
//! for (reference, content) in [("A1", "1"), ("A2", "2"), ("A3", "=SUM(A1:A2)")] {
//!     let position = engine.position(reference).unwrap();
//!     engine.set_cell_content(position, content).unwrap();
//! }
//!
//! let a3 = engine.get_evaluated_cell(CellPosition::new(sheet, 2, 0));
//! assert_eq!(a3.value, CellValue::Number(3.0));
//! assert_eq!(a3.formatted_value, "3");
//! ```

mod calculation;
pub mod command;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod options;
pub mod prelude;
pub mod range_index;

pub use calculation::quote_sheet_name;
pub use command::Command;
pub use engine::{Engine, EvaluationSummary, FormulaOutput};
pub use error::{Error, Result};
pub use hooks::{DependencyListener, IterationHook, IterationRequest, PassReport};
pub use options::EngineOptions;

// Re-export core types
pub use gridcalc_core::{
    CellAddress, CellError, CellPosition, CellRange, CellValue, CellValueType, EvaluatedCell,
    Locale, Matrix, Range, SheetId, Workbook, Worksheet, Zone,
};

// Re-export formula types
pub use gridcalc_formula::{canonicalize_formula, compile, localize_formula, CompiledFormula};
