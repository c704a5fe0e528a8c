//! # gridcalc-formula
//!
//! Formula compiler and built-in functions for the gridcalc engine.
//!
//! This crate provides:
//! - Tokenizing formula text, with locale-aware numbers and separators
//! - Compiling tokens into an expression tree plus an ordered reference list
//! - Executing compiled formulas against a [`ReferenceResolver`]
//! - Broadcasting scalar parameters over ranges (vectorization)
//! - Built-in functions, looked up through a static registry
//!
//! A compiled formula never holds cell positions itself: references are
//! bound to ranges separately, so one compilation serves every cell that
//! shares the same formula text.
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_formula::compile;
//!
//! let formula = compile("=SUM(A1:A3) * 2");
//! assert!(!formula.is_bad_expression);
//! assert_eq!(formula.references.len(), 1);
//! assert_eq!(formula.references[0].text, "A1:A3");
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod matrix;
pub mod parser;
pub mod tokenizer;
pub mod translate;
pub mod vectorize;

pub use ast::{BinaryOperator, Expr, FormulaReference, UnaryOperator};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{Arg, EvaluationContext, FormulaValue, ReferenceResolver};
pub use functions::{get_function_registry, ArgKind, ArgSpec, FunctionDef, FunctionRegistry};
pub use parser::{compile, compile_tokens, CompiledFormula};
pub use tokenizer::{tokenize, Token, TokenKind};
pub use translate::{canonicalize_formula, localize_formula};

#[cfg(test)]
pub(crate) mod testing {
    //! A one-sheet resolver for exercising formulas without an engine.

    use crate::error::{FormulaError, FormulaResult};
    use crate::evaluator::{EvaluationContext, FormulaValue, ReferenceResolver};
    use gridcalc_core::{generate_matrix, CellAddress, CellValue, FunctionResult, Matrix, Range, SheetId};
    use std::collections::HashMap;

    const ROWS: u32 = 100;
    const COLS: u16 = 26;

    /// Cells of `Sheet1`, a 100 × 26 sheet
    #[derive(Debug, Default)]
    pub struct TestResolver {
        cells: HashMap<(u32, u16), FunctionResult>,
    }

    impl TestResolver {
        pub fn set(&mut self, xc: &str, value: CellValue) {
            let address = CellAddress::parse(xc).expect("test cell address");
            self.cells.insert((address.row, address.col), FunctionResult::new(value));
        }

        pub fn set_with_format(&mut self, xc: &str, value: f64, format: &str) {
            let address = CellAddress::parse(xc).expect("test cell address");
            self.cells.insert(
                (address.row, address.col),
                FunctionResult::new(value).with_format(Some(format.to_string())),
            );
        }

        pub fn eval(&mut self, formula: &str) -> FormulaValue {
            let compiled = crate::compile(formula);
            let dependencies = compiled.bind_dependencies(SheetId(1), |name| {
                name.eq_ignore_ascii_case("Sheet1").then_some(SheetId(1))
            });
            compiled
                .execute(&dependencies, self, &EvaluationContext::default())
                .expect("formula execution")
        }

        fn cell(&self, row: u32, col: u16) -> FunctionResult {
            self.cells.get(&(row, col)).cloned().unwrap_or_default()
        }
    }

    fn check(range: &Range) -> FormulaResult<()> {
        if range.is_valid() {
            Ok(())
        } else {
            Err(FormulaError::InvalidReference(format!("{range:?}")))
        }
    }

    impl ReferenceResolver for TestResolver {
        fn resolve_scalar(&mut self, range: &Range, is_meta: bool) -> FormulaResult<FunctionResult> {
            check(range)?;
            if is_meta {
                return Ok(FunctionResult::new(format!("Sheet1!{}", range.zone.to_a1_string())));
            }
            Ok(self.cell(range.zone.top, range.zone.left))
        }

        fn resolve_range(&mut self, range: &Range) -> FormulaResult<Matrix<FunctionResult>> {
            check(range)?;
            let clipped = range
                .zone
                .clip(ROWS, COLS)
                .ok_or_else(|| FormulaError::InvalidReference(range.zone.to_a1_string()))?;
            let (top, left) = (clipped.start.row, clipped.start.col);
            let cols = (clipped.end.col - left) as usize + 1;
            let rows = (clipped.end.row - top) as usize + 1;
            Ok(generate_matrix(cols, rows, |col, row| {
                self.cell(top + row as u32, left + col as u16)
            }))
        }
    }

    pub fn eval(formula: &str) -> FormulaValue {
        TestResolver::default().eval(formula)
    }

    pub fn eval_with(formula: &str, cells: &[(&str, CellValue)]) -> FormulaValue {
        let mut resolver = TestResolver::default();
        for (xc, value) in cells {
            resolver.set(xc, value.clone());
        }
        resolver.eval(formula)
    }

    /// The top-left value, which must be a number
    pub fn number(value: FormulaValue) -> f64 {
        match value.top_left().value {
            CellValue::Number(n) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }
}
