//! Text functions

use super::{number_arg, optional_number, text_arg, visit_text, ArgSpec, FunctionDef};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{Arg, EvaluationContext, FormulaValue};

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "CONCAT",
        args: &[ArgSpec::range("text").repeating()],
        implementation: fn_concat,
        volatile: false,
    },
    FunctionDef {
        name: "LEN",
        args: &[ArgSpec::scalar("text")],
        implementation: fn_len,
        volatile: false,
    },
    FunctionDef {
        name: "UPPER",
        args: &[ArgSpec::scalar("text")],
        implementation: fn_upper,
        volatile: false,
    },
    FunctionDef {
        name: "LOWER",
        args: &[ArgSpec::scalar("text")],
        implementation: fn_lower,
        volatile: false,
    },
    FunctionDef {
        name: "TRIM",
        args: &[ArgSpec::scalar("text")],
        implementation: fn_trim,
        volatile: false,
    },
    FunctionDef {
        name: "LEFT",
        args: &[ArgSpec::scalar("text"), ArgSpec::scalar("count").optional()],
        implementation: fn_left,
        volatile: false,
    },
    FunctionDef {
        name: "RIGHT",
        args: &[ArgSpec::scalar("text"), ArgSpec::scalar("count").optional()],
        implementation: fn_right,
        volatile: false,
    },
    FunctionDef {
        name: "MID",
        args: &[
            ArgSpec::scalar("text"),
            ArgSpec::scalar("start"),
            ArgSpec::scalar("count"),
        ],
        implementation: fn_mid,
        volatile: false,
    },
];

fn text(value: String) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(value))
}

/// A character count argument, 1 when omitted. Negative counts are rejected.
fn count_arg(args: &[Arg], index: usize, ctx: &EvaluationContext) -> FormulaResult<usize> {
    let count = optional_number(args, index, ctx)?.unwrap_or(1.0).trunc();
    if count < 0.0 {
        return Err(FormulaError::Evaluation(format!(
            "The number of characters ({count}) must be positive or null."
        )));
    }
    Ok(count as usize)
}

/// CONCAT(text, ...)
pub fn fn_concat(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut joined = String::new();
    visit_text(args, ctx, |s| joined.push_str(s))?;
    text(joined)
}

/// LEN(text), in characters
pub fn fn_len(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(text_arg(args, 0, ctx)?.chars().count() as f64))
}

/// UPPER(text)
pub fn fn_upper(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    text(text_arg(args, 0, ctx)?.to_uppercase())
}

/// LOWER(text)
pub fn fn_lower(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    text(text_arg(args, 0, ctx)?.to_lowercase())
}

/// TRIM(text): strip the ends and collapse inner runs of spaces
pub fn fn_trim(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = text_arg(args, 0, ctx)?;
    text(value.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" "))
}

/// LEFT(text, [count])
pub fn fn_left(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = text_arg(args, 0, ctx)?;
    let count = count_arg(args, 1, ctx)?;
    text(value.chars().take(count).collect())
}

/// RIGHT(text, [count])
pub fn fn_right(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = text_arg(args, 0, ctx)?;
    let count = count_arg(args, 1, ctx)?;
    let len = value.chars().count();
    text(value.chars().skip(len.saturating_sub(count)).collect())
}

/// MID(text, start, count), `start` being 1-based
pub fn fn_mid(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = text_arg(args, 0, ctx)?;
    let start = number_arg(args, 1, ctx)?.trunc();
    if start < 1.0 {
        return Err(FormulaError::Evaluation(format!(
            "The starting position ({start}) must be greater than or equal to 1."
        )));
    }
    let count = count_arg(args, 2, ctx)?;
    text(value.chars().skip(start as usize - 1).take(count).collect())
}
