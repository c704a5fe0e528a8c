//! Formula execution
//!
//! Walks a compiled expression tree. References are read through a
//! [`ReferenceResolver`] supplied by the caller, which is what makes
//! evaluation lazy and recursive: the engine's resolver computes the
//! referenced cells on demand.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{to_number, to_text, ArgKind, FunctionDef};
use crate::parser::CompiledFormula;
use crate::vectorize;
use gridcalc_core::{CellPosition, CellValue, FunctionResult, Locale, Matrix, Range};
use std::cmp::Ordering;

/// Runtime bridge to the cells a formula reads.
pub trait ReferenceResolver {
    /// Value of a single cell. With `is_meta` the fully qualified reference
    /// text is returned instead (`Sheet1!B2`), for functions that care
    /// about where rather than what.
    fn resolve_scalar(&mut self, range: &Range, is_meta: bool) -> FormulaResult<FunctionResult>;

    /// Values of a range, column-major, clipped to the sheet.
    fn resolve_range(&mut self, range: &Range) -> FormulaResult<Matrix<FunctionResult>>;
}

/// What a formula is evaluated against
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub locale: Locale,
    /// The cell holding the formula, `None` for ad hoc evaluation
    pub position: Option<CellPosition>,
}

impl EvaluationContext {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            position: None,
        }
    }

    pub fn at(mut self, position: CellPosition) -> Self {
        self.position = Some(position);
        self
    }
}

/// Result of a formula or function: one value or a matrix of them
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Scalar(FunctionResult),
    Matrix(Matrix<FunctionResult>),
}

impl FormulaValue {
    pub fn scalar(value: impl Into<CellValue>) -> Self {
        FormulaValue::Scalar(FunctionResult::new(value))
    }

    /// The value a single cell shows: the top-left one for matrices.
    pub fn top_left(self) -> FunctionResult {
        match self {
            FormulaValue::Scalar(result) => result,
            FormulaValue::Matrix(matrix) => matrix
                .into_iter()
                .next()
                .and_then(|col| col.into_iter().next())
                .unwrap_or_default(),
        }
    }
}

impl From<FunctionResult> for FormulaValue {
    fn from(result: FunctionResult) -> Self {
        FormulaValue::Scalar(result)
    }
}

/// A function argument after evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(FunctionResult),
    Matrix(Matrix<FunctionResult>),
    /// Empty slot, as in `IF(A1,,2)`, or an omitted optional argument
    Missing,
}

impl Arg {
    pub fn is_missing(&self) -> bool {
        matches!(self, Arg::Missing)
    }

    /// Every value the argument holds, column by column.
    pub fn cells(&self) -> Box<dyn Iterator<Item = &FunctionResult> + '_> {
        match self {
            Arg::Value(value) => Box::new(std::iter::once(value)),
            Arg::Matrix(matrix) => Box::new(matrix.iter().flatten()),
            Arg::Missing => Box::new(std::iter::empty()),
        }
    }

    /// `(cols, rows)`; a plain value is 1 × 1.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Arg::Matrix(matrix) => gridcalc_core::matrix_size(matrix),
            _ => (1, 1),
        }
    }
}

impl From<FormulaValue> for Arg {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Scalar(result) => Arg::Value(result),
            FormulaValue::Matrix(matrix) => Arg::Matrix(matrix),
        }
    }
}

impl CompiledFormula {
    /// Run the formula. `dependencies` are the formula's references bound
    /// for the evaluating cell (see [`CompiledFormula::bind_dependencies`]).
    ///
    /// Runtime failures come back as error values. The only `Err` that
    /// escapes is a circular reference, plus reference failures of a formula
    /// that is nothing but a reference.
    pub fn execute(
        &self,
        dependencies: &[Range],
        resolver: &mut dyn ReferenceResolver,
        ctx: &EvaluationContext,
    ) -> FormulaResult<FormulaValue> {
        let mut executor = Executor {
            dependencies,
            resolver,
            ctx,
        };
        executor.eval(&self.root)
    }
}

struct Executor<'a> {
    dependencies: &'a [Range],
    resolver: &'a mut dyn ReferenceResolver,
    ctx: &'a EvaluationContext,
}

/// Turn a failure into an error value, letting cycles unwind.
fn catch(result: FormulaResult<FormulaValue>) -> FormulaResult<FormulaValue> {
    match result {
        Err(err) if !err.is_cycle() => Ok(FormulaValue::Scalar(err.to_result())),
        other => other,
    }
}

impl<'a> Executor<'a> {
    fn eval(&mut self, expr: &Expr) -> FormulaResult<FormulaValue> {
        match expr {
            Expr::Number(n) => Ok(FormulaValue::scalar(*n)),
            Expr::String(s) => Ok(FormulaValue::scalar(s.as_str())),
            Expr::Boolean(b) => Ok(FormulaValue::scalar(*b)),
            Expr::Missing => Ok(FormulaValue::Scalar(FunctionResult::empty())),
            Expr::Fail { kind, message } => {
                Ok(FormulaValue::Scalar(FunctionResult::error(*kind, message.clone())))
            }
            Expr::Reference(index) => self.reference(*index),
            Expr::Unary { op, operand } => {
                let operand = catch(self.eval(operand))?;
                let (op, locale) = (*op, &self.ctx.locale);
                catch(vectorize::apply(
                    op.name(),
                    vec![operand.into()],
                    |_| true,
                    |args| apply_unary(op, scalar(&args[0]), locale),
                ))
            }
            Expr::Binary { op, left, right } => {
                let left = catch(self.eval(left))?;
                let right = catch(self.eval(right))?;
                let (op, locale) = (*op, &self.ctx.locale);
                catch(vectorize::apply(
                    op.name(),
                    vec![left.into(), right.into()],
                    |_| true,
                    |args| apply_binary(op, scalar(&args[0]), scalar(&args[1]), locale),
                ))
            }
            Expr::Call { function, args } => catch(self.call(function, args)),
        }
    }

    fn range(&self, index: usize) -> FormulaResult<&'a Range> {
        self.dependencies
            .get(index)
            .ok_or_else(|| FormulaError::InvalidReference(format!("unbound reference #{index}")))
    }

    fn reference(&mut self, index: usize) -> FormulaResult<FormulaValue> {
        let range = self.range(index)?;
        if range.is_single_cell() {
            Ok(FormulaValue::Scalar(self.resolver.resolve_scalar(range, false)?))
        } else {
            Ok(FormulaValue::Matrix(self.resolver.resolve_range(range)?))
        }
    }

    fn argument(&mut self, function: &FunctionDef, kind: ArgKind, expr: &Expr) -> FormulaResult<Arg> {
        match (kind, expr) {
            (_, Expr::Missing) => Ok(Arg::Missing),
            (ArgKind::Meta, Expr::Reference(index)) => {
                let range = self.range(*index)?;
                Ok(Arg::Value(self.resolver.resolve_scalar(range, true)?))
            }
            (ArgKind::Meta, _) => Err(FormulaError::Evaluation(format!(
                "Function {} expects a reference",
                function.name
            ))),
            // A range parameter sees a single cell as a 1 × 1 range
            (ArgKind::Range, Expr::Reference(index)) => {
                let range = self.range(*index)?;
                Ok(Arg::Matrix(self.resolver.resolve_range(range)?))
            }
            (_, expr) => self.eval(expr).map(Arg::from),
        }
    }

    fn call(&mut self, function: &FunctionDef, exprs: &[Expr]) -> FormulaResult<FormulaValue> {
        let mut args = Vec::with_capacity(exprs.len());
        for (index, expr) in exprs.iter().enumerate() {
            let arg = match self.argument(function, function.arg_kind(index), expr) {
                Ok(arg) => arg,
                Err(err) if err.is_cycle() => return Err(err),
                Err(err) => Arg::Value(err.to_result()),
            };
            args.push(arg);
        }
        let ctx = self.ctx;
        vectorize::apply(
            function.name,
            args,
            |index| function.arg_kind(index) == ArgKind::Scalar,
            |args| (function.implementation)(args, ctx),
        )
    }
}

fn scalar(arg: &Arg) -> &FunctionResult {
    crate::functions::scalar_arg(std::slice::from_ref(arg), 0)
}

fn apply_unary(op: UnaryOperator, value: &FunctionResult, locale: &Locale) -> FormulaResult<FormulaValue> {
    let n = to_number(value, locale)?;
    Ok(match op {
        UnaryOperator::Negate => FormulaValue::Scalar(
            FunctionResult::new(-n).with_format(value.format.clone()),
        ),
        UnaryOperator::Percent => FormulaValue::scalar(n / 100.0),
    })
}

fn apply_binary(
    op: BinaryOperator,
    left: &FunctionResult,
    right: &FunctionResult,
    locale: &Locale,
) -> FormulaResult<FormulaValue> {
    for operand in [left, right] {
        if let Some(err) = FormulaError::from_result(operand) {
            return Err(err);
        }
    }
    if op.is_comparison() {
        let ordering = compare_values(&left.value, &right.value);
        let holds = match op {
            BinaryOperator::Equal => ordering == Ordering::Equal,
            BinaryOperator::NotEqual => ordering != Ordering::Equal,
            BinaryOperator::LessThan => ordering == Ordering::Less,
            BinaryOperator::LessEqual => ordering != Ordering::Greater,
            BinaryOperator::GreaterThan => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        };
        return Ok(FormulaValue::scalar(holds));
    }
    if op == BinaryOperator::Concat {
        let text = to_text(left, locale)? + &to_text(right, locale)?;
        return Ok(FormulaValue::scalar(text));
    }

    let (l, r) = (to_number(left, locale)?, to_number(right, locale)?);
    let value = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide if r == 0.0 => {
            return Err(FormulaError::Evaluation(
                "The divisor must be different from zero.".into(),
            ))
        }
        BinaryOperator::Divide => l / r,
        _ => {
            let power = l.powf(r);
            if !power.is_finite() {
                return Err(FormulaError::Evaluation(format!(
                    "{l} to the power of {r} is not a finite number."
                )));
            }
            power
        }
    };
    let format = match op {
        BinaryOperator::Add | BinaryOperator::Subtract => {
            left.format.clone().or_else(|| right.format.clone())
        }
        _ => None,
    };
    Ok(FormulaValue::Scalar(FunctionResult::new(value).with_format(format)))
}

/// Spreadsheet ordering: numbers < text < booleans. An empty operand
/// compares as the other side's zero value (`0`, `""`, `FALSE`); text
/// compares case-insensitively.
pub(crate) fn compare_values(left: &CellValue, right: &CellValue) -> Ordering {
    fn rank(value: &CellValue) -> u8 {
        match value {
            CellValue::String(_) => 1,
            CellValue::Boolean(_) => 2,
            _ => 0,
        }
    }
    fn blank_like(other: &CellValue) -> CellValue {
        match other {
            CellValue::String(_) => CellValue::string(""),
            CellValue::Boolean(_) => CellValue::Boolean(false),
            _ => CellValue::Number(0.0),
        }
    }

    let left = if left.is_empty() { blank_like(right) } else { left.clone() };
    let right = if right.is_empty() { blank_like(&left) } else { right.clone() };
    match (&left, &right) {
        (CellValue::Number(l), CellValue::Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        (CellValue::String(l), CellValue::String(r)) => {
            l.as_str().to_lowercase().cmp(&r.as_str().to_lowercase())
        }
        (CellValue::Boolean(l), CellValue::Boolean(r)) => l.cmp(r),
        _ => rank(&left).cmp(&rank(&right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{eval, eval_with, number};
    use gridcalc_core::CellError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operator_precedence() {
        assert_eq!(number(eval("=1 + 2 * 3")), 7.0);
        assert_eq!(number(eval("=-2^2")), -4.0);
        assert_eq!(number(eval("=-2^2 + 3")), -1.0);
        assert_eq!(number(eval("=2^3^2")), 64.0);
        assert_eq!(number(eval("=(1 + 2) * 3")), 9.0);
        assert_eq!(number(eval("=10 - 4 - 3")), 3.0);
        assert_eq!(number(eval("=2^-1")), 0.5);
        assert_eq!(number(eval("=50% * 4")), 2.0);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("=1 < 2").top_left().value, CellValue::Boolean(true));
        assert_eq!(eval("=\"abc\" = \"ABC\"").top_left().value, CellValue::Boolean(true));
        assert_eq!(eval("=1 < \"a\"").top_left().value, CellValue::Boolean(true));
        assert_eq!(eval("=TRUE > \"z\"").top_left().value, CellValue::Boolean(true));
        assert_eq!(eval("=1 + 1 = 2").top_left().value, CellValue::Boolean(true));
        assert_eq!(eval("=A1 = 0").top_left().value, CellValue::Boolean(true));
        assert_eq!(eval("=A1 = \"\"").top_left().value, CellValue::Boolean(true));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(eval("=\"a\" & 1.5 & TRUE").top_left().value, CellValue::string("a1.5TRUE"));
        assert_eq!(eval("=1 + 1 & \"x\"").top_left().value, CellValue::string("2x"));
    }

    #[test]
    fn test_runtime_errors_are_values() {
        let result = eval("=1 / 0").top_left();
        assert_eq!(result.value, CellValue::Error(CellError::Generic));
        assert!(result.message.is_some());

        assert_eq!(
            eval("=\"abc\" + 1").top_left().value,
            CellValue::Error(CellError::Generic)
        );
        assert_eq!(
            eval("=\"44 45\" * 1").top_left().value,
            CellValue::Error(CellError::Generic)
        );
        assert_eq!(number(eval("=\"3\" + 1")), 4.0);
    }

    #[test]
    fn test_errors_propagate_with_their_kind() {
        let value = eval_with("=A1 + 1", &[("A1", CellValue::Error(CellError::NotAvailable))]);
        assert_eq!(value.top_left().value, CellValue::Error(CellError::NotAvailable));
    }

    #[test]
    fn test_add_keeps_operand_format() {
        let mut resolver = crate::testing::TestResolver::default();
        resolver.set_with_format("A1", 45306.0, "m/d/yyyy");
        let result = resolver.eval("=A1 + 1").top_left();
        assert_eq!(result.value, CellValue::Number(45307.0));
        assert_eq!(result.format.as_deref(), Some("m/d/yyyy"));

        let result = resolver.eval("=1 + A1").top_left();
        assert_eq!(result.format.as_deref(), Some("m/d/yyyy"));
        assert_eq!(resolver.eval("=A1 * 1").top_left().format, None);
    }

    #[test]
    fn test_range_operands_broadcast() {
        let cells = [
            ("A1", CellValue::Number(1.0)),
            ("A2", CellValue::Number(2.0)),
            ("B1", CellValue::Number(10.0)),
            ("B2", CellValue::Number(20.0)),
            ("B3", CellValue::Number(30.0)),
        ];
        let FormulaValue::Matrix(m) = eval_with("=A1:A2 + B1:B3", &cells) else {
            panic!("expected a matrix");
        };
        assert_eq!(m.len(), 1);
        assert_eq!(m[0][0].value, CellValue::Number(11.0));
        assert_eq!(m[0][1].value, CellValue::Number(22.0));
        assert_eq!(m[0][2].value, CellValue::Error(CellError::NotAvailable));
    }

    #[test]
    fn test_bad_expression_executes_to_error() {
        assert_eq!(
            eval("=SUM(1,").top_left().value,
            CellValue::Error(CellError::BadExpression)
        );
    }

    #[test]
    fn test_invalid_reference() {
        let compiled = crate::compile("=Missing!A1 + 1");
        let deps = compiled.bind_dependencies(gridcalc_core::SheetId(1), |_| None);
        let mut resolver = crate::testing::TestResolver::default();
        let value = compiled
            .execute(&deps, &mut resolver, &EvaluationContext::default())
            .unwrap();
        assert_eq!(value.top_left().value, CellValue::Error(CellError::InvalidReference));
    }

    #[test]
    fn test_meta_argument_receives_reference_text() {
        assert_eq!(number(eval("=ROW(C7)")), 7.0);
        assert_eq!(number(eval("=COLUMN(C7:D9)")), 3.0);
        assert_eq!(
            eval("=ROW(1 + 1)").top_left().value,
            CellValue::Error(CellError::Generic)
        );
    }

    #[test]
    fn test_compare_blank_like() {
        assert_eq!(
            compare_values(&CellValue::Empty, &CellValue::Boolean(false)),
            Ordering::Equal
        );
        assert_eq!(
            compare_values(&CellValue::Number(-1.0), &CellValue::Empty),
            Ordering::Less
        );
    }
}
