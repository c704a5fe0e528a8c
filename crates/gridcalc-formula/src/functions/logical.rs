//! Logical functions

use super::{check_error, scalar_arg, to_bool, ArgSpec, FunctionDef};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{Arg, EvaluationContext, FormulaValue};
use gridcalc_core::{CellValue, FunctionResult};

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "IF",
        args: &[
            ArgSpec::scalar("condition"),
            ArgSpec::scalar("value_if_true"),
            ArgSpec::scalar("value_if_false").optional(),
        ],
        implementation: fn_if,
        volatile: false,
    },
    FunctionDef {
        name: "AND",
        args: &[ArgSpec::range("logical").repeating()],
        implementation: fn_and,
        volatile: false,
    },
    FunctionDef {
        name: "OR",
        args: &[ArgSpec::range("logical").repeating()],
        implementation: fn_or,
        volatile: false,
    },
    FunctionDef {
        name: "NOT",
        args: &[ArgSpec::scalar("logical")],
        implementation: fn_not,
        volatile: false,
    },
    FunctionDef {
        name: "IFERROR",
        args: &[ArgSpec::scalar("value"), ArgSpec::scalar("value_if_error").optional()],
        implementation: fn_iferror,
        volatile: false,
    },
    FunctionDef {
        name: "TRUE",
        args: &[],
        implementation: fn_true,
        volatile: false,
    },
    FunctionDef {
        name: "FALSE",
        args: &[],
        implementation: fn_false,
        volatile: false,
    },
];

/// The branch argument as a result; an empty slot reads as 0.
fn branch(args: &[Arg], index: usize) -> FunctionResult {
    match args.get(index) {
        Some(Arg::Missing) => FunctionResult::new(0.0),
        _ => scalar_arg(args, index).clone(),
    }
}

/// IF(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let condition = to_bool(scalar_arg(args, 0), &ctx.locale)?;
    let chosen = match (condition, args.get(2)) {
        (true, _) => branch(args, 1),
        (false, None) => FunctionResult::new(false),
        (false, Some(_)) => branch(args, 2),
    };
    Ok(FormulaValue::Scalar(chosen))
}

/// Fold the logical values of every argument. Text inside ranges is
/// skipped; a call with nothing to fold is an error.
fn fold_logical(
    name: &str,
    args: &[Arg],
    ctx: &EvaluationContext,
    mut step: impl FnMut(bool),
) -> FormulaResult<()> {
    let mut found = false;
    for arg in args {
        match arg {
            Arg::Missing => {}
            Arg::Value(value) => {
                step(to_bool(value, &ctx.locale)?);
                found = true;
            }
            Arg::Matrix(matrix) => {
                for cell in matrix.iter().flatten() {
                    check_error(cell)?;
                    match cell.value {
                        CellValue::Boolean(b) => step(b),
                        CellValue::Number(n) => step(n != 0.0),
                        _ => continue,
                    }
                    found = true;
                }
            }
        }
    }
    if !found {
        return Err(FormulaError::Evaluation(format!(
            "{name} has no valid input data."
        )));
    }
    Ok(())
}

/// AND(logical, ...)
pub fn fn_and(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut all = true;
    fold_logical("AND", args, ctx, |b| all &= b)?;
    Ok(FormulaValue::scalar(all))
}

/// OR(logical, ...)
pub fn fn_or(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut any = false;
    fold_logical("OR", args, ctx, |b| any |= b)?;
    Ok(FormulaValue::scalar(any))
}

/// NOT(logical)
pub fn fn_not(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(!to_bool(scalar_arg(args, 0), &ctx.locale)?))
}

/// IFERROR(value, [value_if_error]); the fallback defaults to empty
pub fn fn_iferror(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = scalar_arg(args, 0);
    if value.is_error() {
        return Ok(FormulaValue::Scalar(scalar_arg(args, 1).clone()));
    }
    Ok(FormulaValue::Scalar(value.clone()))
}

pub fn fn_true(_args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(true))
}

pub fn fn_false(_args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(false))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::FormulaValue;
    use crate::testing::{eval, eval_with, number, TestResolver};
    use gridcalc_core::{CellError, CellValue};
    use pretty_assertions::assert_eq;

    fn value(formula: &str) -> CellValue {
        eval(formula).top_left().value
    }

    #[test]
    fn test_if() {
        assert_eq!(value("=IF(TRUE, 1, 2)"), CellValue::Number(1.0));
        assert_eq!(value("=IF(0, 1, 2)"), CellValue::Number(2.0));
        assert_eq!(value("=IF(FALSE, 1)"), CellValue::Boolean(false));
        assert_eq!(value("=IF(FALSE, 1, )"), CellValue::Number(0.0));
        assert_eq!(value("=IF(\"true\", \"yes\", \"no\")"), CellValue::string("yes"));
        assert_eq!(value("=IF(\"maybe\", 1, 2)").as_error(), Some(CellError::Generic));
    }

    #[test]
    fn test_if_keeps_unused_branch_errors_out() {
        assert_eq!(value("=IF(TRUE, 1, 1/0)"), CellValue::Number(1.0));
        assert_eq!(value("=IF(NA(), 1, 2)").as_error(), Some(CellError::NotAvailable));
    }

    #[test]
    fn test_if_keeps_branch_format() {
        let mut resolver = TestResolver::default();
        resolver.set_with_format("A1", 0.25, "0.00%");
        match resolver.eval("=IF(TRUE, A1, 2)") {
            FormulaValue::Scalar(result) => assert_eq!(result.format.as_deref(), Some("0.00%")),
            other => panic!("expected a scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_if_over_a_range() {
        let cells = [("A1", CellValue::Number(1.0)), ("A2", CellValue::Number(0.0))];
        match eval_with("=IF(A1:A2, \"on\", \"off\")", &cells) {
            FormulaValue::Matrix(m) => assert_eq!(
                m[0].iter().map(|r| r.value.clone()).collect::<Vec<_>>(),
                vec![CellValue::string("on"), CellValue::string("off")]
            ),
            other => panic!("expected a matrix, got {other:?}"),
        }
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(value("=AND(TRUE, 1)"), CellValue::Boolean(true));
        assert_eq!(value("=AND(TRUE, 0)"), CellValue::Boolean(false));
        assert_eq!(value("=OR(FALSE, 0)"), CellValue::Boolean(false));
        assert_eq!(value("=OR(FALSE, 2)"), CellValue::Boolean(true));
        assert_eq!(value("=NOT(FALSE)"), CellValue::Boolean(true));

        let cells = [("A1", CellValue::string("x")), ("A2", CellValue::Boolean(true))];
        assert_eq!(eval_with("=AND(A1:A2)", &cells).top_left().value, CellValue::Boolean(true));
        assert_eq!(value("=AND(A1:A2)").as_error(), Some(CellError::Generic));
    }

    #[test]
    fn test_iferror() {
        assert_eq!(number(eval("=IFERROR(1/0, 7)")), 7.0);
        assert_eq!(number(eval("=IFERROR(3, 7)")), 3.0);
        assert_eq!(value("=IFERROR(NA())"), CellValue::Empty);
        assert_eq!(value("=IFERROR(UNKNOWNREF!A1, 1)"), CellValue::Number(1.0));
    }
}
