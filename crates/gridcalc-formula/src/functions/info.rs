//! Information functions

use super::{scalar_arg, ArgSpec, FunctionDef};
use crate::error::FormulaResult;
use crate::evaluator::{Arg, EvaluationContext, FormulaValue};
use gridcalc_core::{CellError, CellValue, FunctionResult};

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "ISBLANK",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_isblank,
        volatile: false,
    },
    FunctionDef {
        name: "ISNUMBER",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_isnumber,
        volatile: false,
    },
    FunctionDef {
        name: "ISTEXT",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_istext,
        volatile: false,
    },
    FunctionDef {
        name: "ISERROR",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_iserror,
        volatile: false,
    },
    FunctionDef {
        name: "ISNA",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_isna,
        volatile: false,
    },
    FunctionDef {
        name: "NA",
        args: &[],
        implementation: fn_na,
        volatile: false,
    },
];

fn test_value(args: &[Arg], test: impl Fn(&CellValue) -> bool) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(test(&scalar_arg(args, 0).value)))
}

/// ISBLANK(value)
pub fn fn_isblank(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    test_value(args, CellValue::is_empty)
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    test_value(args, |v| matches!(v, CellValue::Number(_)))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    test_value(args, |v| matches!(v, CellValue::String(_)))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    test_value(args, CellValue::is_error)
}

/// ISNA(value)
pub fn fn_isna(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    test_value(args, |v| v.as_error() == Some(CellError::NotAvailable))
}

/// NA()
pub fn fn_na(_args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Scalar(FunctionResult::error(
        CellError::NotAvailable,
        "Value not available.",
    )))
}

#[cfg(test)]
mod tests {
    use crate::testing::{eval, eval_with};
    use gridcalc_core::{CellError, CellValue};
    use pretty_assertions::assert_eq;

    fn value(formula: &str) -> CellValue {
        eval(formula).top_left().value
    }

    #[test]
    fn test_type_checks() {
        assert_eq!(value("=ISNUMBER(1)"), CellValue::Boolean(true));
        assert_eq!(value("=ISNUMBER(\"1\")"), CellValue::Boolean(false));
        assert_eq!(value("=ISTEXT(\"1\")"), CellValue::Boolean(true));
        assert_eq!(value("=ISBLANK(A1)"), CellValue::Boolean(true));
        assert_eq!(
            eval_with("=ISBLANK(A1)", &[("A1", CellValue::Number(0.0))]).top_left().value,
            CellValue::Boolean(false)
        );
    }

    #[test]
    fn test_error_checks() {
        assert_eq!(value("=ISERROR(1/0)"), CellValue::Boolean(true));
        assert_eq!(value("=ISERROR(1)"), CellValue::Boolean(false));
        assert_eq!(value("=ISNA(NA())"), CellValue::Boolean(true));
        assert_eq!(value("=ISNA(1/0)"), CellValue::Boolean(false));
        assert_eq!(value("=NA()").as_error(), Some(CellError::NotAvailable));
    }
}
