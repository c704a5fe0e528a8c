//! # gridcalc-core
//!
//! Value model for the gridcalc calculation engine.
//!
//! This crate provides the types shared by the formula compiler and the engine:
//! - [`CellAddress`], [`Zone`] and [`Range`] - addressing, including unbounded zones like `A:A`
//! - [`CellValue`], [`CellError`] and [`FunctionResult`] - values flowing through formulas
//! - [`EvaluatedCell`] - the typed, display-ready result of a cell
//! - [`Locale`], [`parse_literal`] and [`format_number`] - locale-aware input and output
//! - [`Workbook`] and [`Worksheet`] - sheet geometry and raw content
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{parse_literal, CellValue, Locale};
//!
//! assert_eq!(parse_literal("40%", &Locale::en_us()), CellValue::Number(0.4));
//! assert_eq!(parse_literal("3,5", &Locale::de_de()), CellValue::Number(3.5));
//! assert_eq!(parse_literal("44 45", &Locale::en_us()), CellValue::string("44 45"));
//! ```

pub mod cell;
pub mod date;
pub mod error;
pub mod evaluated;
pub mod format;
pub mod literal;
pub mod locale;
pub mod range;
pub mod result;
pub mod workbook;
pub mod worksheet;
pub mod zone;

pub use cell::{CellAddress, CellData, CellError, CellRange, CellValue, SharedString};
pub use error::{Error, Result};
pub use evaluated::{Align, CellValueType, EvaluatedCell, Link};
pub use format::{format_number, is_date_format};
pub use literal::{parse_literal, parse_literal_with_format, parse_number};
pub use locale::{DateOrder, Locale};
pub use range::{CellPosition, Range, RangeKey, SheetId};
pub use result::{generate_matrix, matrix_size, FunctionResult, Matrix};
pub use workbook::{Workbook, DEFAULT_SHEET_SIZE};
pub use worksheet::Worksheet;
pub use zone::Zone;

/// Number of addressable rows
pub const MAX_ROWS: u32 = 1_048_576;

/// Number of addressable columns
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
