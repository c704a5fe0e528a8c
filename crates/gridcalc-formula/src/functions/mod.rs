//! Built-in functions
//!
//! Every function is described by a [`FunctionDef`]: its name, the shape of
//! each parameter and a plain function pointer. Definitions are collected
//! once into a static [`FunctionRegistry`] and resolved when a call node is
//! compiled.

pub mod array;
pub mod criteria;
pub mod date;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{Arg, EvaluationContext, FormulaValue};
use gridcalc_core::literal::parse_date_time;
use gridcalc_core::{format_number, parse_number, CellValue, FunctionResult, Locale};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Function implementation signature
pub type FunctionImpl = fn(&[Arg], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// How a parameter receives its argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// One value; matrices passed here are broadcast
    Scalar,
    /// Matrices are passed as they are
    Range,
    /// The reference text instead of the value (`ROW(A5)`)
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub optional: bool,
    /// The parameter may be repeated; only the last parameter can be
    pub repeating: bool,
}

impl ArgSpec {
    pub const fn scalar(name: &'static str) -> Self {
        Self::new(name, ArgKind::Scalar)
    }

    pub const fn range(name: &'static str) -> Self {
        Self::new(name, ArgKind::Range)
    }

    pub const fn meta(name: &'static str) -> Self {
        Self::new(name, ArgKind::Meta)
    }

    const fn new(name: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            kind,
            optional: false,
            repeating: false,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub const fn repeating(mut self) -> Self {
        self.repeating = true;
        self
    }
}

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    pub args: &'static [ArgSpec],
    pub implementation: FunctionImpl,
    /// Result changes on every evaluation
    pub volatile: bool,
}

impl FunctionDef {
    pub fn min_args(&self) -> usize {
        self.args.iter().filter(|spec| !spec.optional).count()
    }

    /// `None` when the last parameter repeats
    pub fn max_args(&self) -> Option<usize> {
        match self.args.last() {
            Some(spec) if spec.repeating => None,
            _ => Some(self.args.len()),
        }
    }

    /// Parameter description for the argument at `index`.
    pub fn arg_spec(&self, index: usize) -> Option<&ArgSpec> {
        self.args
            .get(index)
            .or_else(|| self.args.last().filter(|spec| spec.repeating))
    }

    pub fn arg_kind(&self, index: usize) -> ArgKind {
        self.arg_spec(index).map_or(ArgKind::Scalar, |spec| spec.kind)
    }

    pub fn check_arity(&self, count: usize) -> FormulaResult<()> {
        let (min, max) = (self.min_args(), self.max_args());
        if count >= min && max.map_or(true, |max| count <= max) {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) if count > max => format!("at most {max}"),
            _ => format!("at least {min}"),
        };
        Err(FormulaError::ArgumentCount {
            function: self.name.to_string(),
            expected,
            actual: count,
        })
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("volatile", &self.volatile)
            .finish()
    }
}

impl PartialEq for FunctionDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<&'static str, &'static FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        for group in [
            math::FUNCTIONS,
            logical::FUNCTIONS,
            text::FUNCTIONS,
            info::FUNCTIONS,
            lookup::FUNCTIONS,
            criteria::FUNCTIONS,
            date::FUNCTIONS,
            array::FUNCTIONS,
        ] {
            for def in group {
                registry.register(def);
            }
        }
        registry
    }

    /// Look up a function by name, case-insensitively
    pub fn get(&self, name: &str) -> Option<&'static FunctionDef> {
        self.functions.get(name.to_ascii_uppercase().as_str()).copied()
    }

    pub fn register(&mut self, def: &'static FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Global function registry (lazily initialized)
pub fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

// === Argument helpers ===

static EMPTY: FunctionResult = FunctionResult {
    value: CellValue::Empty,
    format: None,
    message: None,
};

/// The argument at `index` as one value. Missing arguments read as empty,
/// matrices as their top-left value.
pub fn scalar_arg(args: &[Arg], index: usize) -> &FunctionResult {
    match args.get(index) {
        Some(Arg::Value(value)) => value,
        Some(Arg::Matrix(matrix)) => matrix.first().and_then(|col| col.first()).unwrap_or(&EMPTY),
        _ => &EMPTY,
    }
}

/// Fail with the error a value carries, if any.
pub fn check_error(result: &FunctionResult) -> FormulaResult<()> {
    match FormulaError::from_result(result) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Number coercion: empty is 0, booleans are 0/1, text must read as a
/// number or date in the locale.
pub fn to_number(result: &FunctionResult, locale: &Locale) -> FormulaResult<f64> {
    match &result.value {
        CellValue::Empty => Ok(0.0),
        CellValue::Number(n) => Ok(*n),
        CellValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellValue::String(s) if s.as_str().trim().is_empty() => Ok(0.0),
        CellValue::String(s) => parse_number(s.as_str(), locale)
            .map(|(n, _)| n)
            .or_else(|| parse_date_time(s.as_str(), locale).map(|(n, _)| n))
            .ok_or_else(|| {
                FormulaError::Evaluation(format!(
                    "The value '{}' cannot be interpreted as a number.",
                    s.as_str()
                ))
            }),
        CellValue::Error(kind) => Err(FormulaError::Cell {
            kind: *kind,
            message: result.message.clone(),
        }),
    }
}

/// Text coercion. Numbers are written the way the locale shows them.
pub fn to_text(result: &FunctionResult, locale: &Locale) -> FormulaResult<String> {
    match &result.value {
        CellValue::Empty => Ok(String::new()),
        CellValue::Number(n) => Ok(format_number(*n, None, locale)),
        CellValue::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        CellValue::String(s) => Ok(s.as_str().to_string()),
        CellValue::Error(kind) => Err(FormulaError::Cell {
            kind: *kind,
            message: result.message.clone(),
        }),
    }
}

/// Boolean coercion: numbers are true when non-zero, text must be
/// `TRUE`/`FALSE`.
pub fn to_bool(result: &FunctionResult, locale: &Locale) -> FormulaResult<bool> {
    match &result.value {
        CellValue::Boolean(b) => Ok(*b),
        CellValue::String(s) if s.as_str().eq_ignore_ascii_case("true") => Ok(true),
        CellValue::String(s) if s.as_str().eq_ignore_ascii_case("false") => Ok(false),
        CellValue::String(s) if !s.as_str().trim().is_empty() => Err(FormulaError::Evaluation(
            format!("The value '{}' cannot be interpreted as a boolean.", s.as_str()),
        )),
        _ => to_number(result, locale).map(|n| n != 0.0),
    }
}

pub fn number_arg(args: &[Arg], index: usize, ctx: &EvaluationContext) -> FormulaResult<f64> {
    to_number(scalar_arg(args, index), &ctx.locale)
}

/// `None` when the argument is omitted or left empty.
pub fn optional_number(
    args: &[Arg],
    index: usize,
    ctx: &EvaluationContext,
) -> FormulaResult<Option<f64>> {
    match args.get(index) {
        None | Some(Arg::Missing) => Ok(None),
        Some(_) => number_arg(args, index, ctx).map(Some),
    }
}

pub fn text_arg(args: &[Arg], index: usize, ctx: &EvaluationContext) -> FormulaResult<String> {
    to_text(scalar_arg(args, index), &ctx.locale)
}

/// Visit the numbers of aggregate arguments. Plain values are coerced;
/// inside ranges only actual numbers count. Any error stops the visit.
pub fn visit_numbers(
    args: &[Arg],
    ctx: &EvaluationContext,
    mut visit: impl FnMut(f64),
) -> FormulaResult<()> {
    for arg in args {
        match arg {
            Arg::Missing => {}
            Arg::Value(value) => visit(to_number(value, &ctx.locale)?),
            Arg::Matrix(matrix) => {
                for cell in matrix.iter().flatten() {
                    check_error(cell)?;
                    if let CellValue::Number(n) = cell.value {
                        visit(n);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Visit every value of every argument as text, ranges included.
pub fn visit_text(
    args: &[Arg],
    ctx: &EvaluationContext,
    mut visit: impl FnMut(&str),
) -> FormulaResult<()> {
    for cell in args.iter().flat_map(Arg::cells) {
        visit(&to_text(cell, &ctx.locale)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::CellError;

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = get_function_registry();
        assert_eq!(registry.get("sum").map(|f| f.name), Some("SUM"));
        assert!(registry.get("NOPE").is_none());
        for name in ["MMULT", "SUMIF", "ROW", "DATE", "IFERROR", "CONCAT", "NA"] {
            assert!(registry.names().contains(&name), "{name} is not registered");
        }
    }

    #[test]
    fn test_arity() {
        let registry = get_function_registry();
        let abs = registry.get("ABS").unwrap();
        assert!(abs.check_arity(1).is_ok());
        assert!(abs.check_arity(2).is_err());

        let sum = registry.get("SUM").unwrap();
        assert_eq!((sum.min_args(), sum.max_args()), (1, None));
        assert!(sum.check_arity(0).is_err());
        assert!(sum.check_arity(30).is_ok());
        assert_eq!(sum.arg_kind(12), ArgKind::Range);

        let err = registry.get("ROUND").unwrap().check_arity(3).unwrap_err();
        assert_eq!(err.kind(), CellError::NotAvailable);
        assert!(err.to_string().contains("at most 2"));
    }

    #[test]
    fn test_coercions() {
        let locale = Locale::en_us();
        assert_eq!(to_number(&FunctionResult::new("1,000"), &locale).unwrap(), 1000.0);
        assert_eq!(to_number(&FunctionResult::new("40%"), &locale).unwrap(), 0.4);
        assert_eq!(to_number(&FunctionResult::empty(), &locale).unwrap(), 0.0);
        assert!(to_number(&FunctionResult::new("44 45"), &locale).is_err());
        assert_eq!(to_number(&FunctionResult::new("3,5"), &Locale::de_de()).unwrap(), 3.5);

        assert_eq!(to_text(&FunctionResult::new(0.5), &Locale::de_de()).unwrap(), "0,5");
        assert!(to_bool(&FunctionResult::new("yes"), &locale).is_err());
        assert!(to_bool(&FunctionResult::new(2.0), &locale).unwrap());

        let err = to_number(&FunctionResult::new(CellError::NotAvailable), &locale).unwrap_err();
        assert_eq!(err.kind(), CellError::NotAvailable);
    }
}
