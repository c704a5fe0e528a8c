//! Math functions

use super::{check_error, number_arg, optional_number, visit_numbers, ArgSpec, FunctionDef};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{Arg, EvaluationContext, FormulaValue};
use gridcalc_core::CellValue;
use rand::Rng;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "SUM",
        args: &[ArgSpec::range("value").repeating()],
        implementation: fn_sum,
        volatile: false,
    },
    FunctionDef {
        name: "AVERAGE",
        args: &[ArgSpec::range("value").repeating()],
        implementation: fn_average,
        volatile: false,
    },
    FunctionDef {
        name: "MIN",
        args: &[ArgSpec::range("value").repeating()],
        implementation: fn_min,
        volatile: false,
    },
    FunctionDef {
        name: "MAX",
        args: &[ArgSpec::range("value").repeating()],
        implementation: fn_max,
        volatile: false,
    },
    FunctionDef {
        name: "COUNT",
        args: &[ArgSpec::range("value").repeating()],
        implementation: fn_count,
        volatile: false,
    },
    FunctionDef {
        name: "COUNTA",
        args: &[ArgSpec::range("value").repeating()],
        implementation: fn_counta,
        volatile: false,
    },
    FunctionDef {
        name: "ABS",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_abs,
        volatile: false,
    },
    FunctionDef {
        name: "ROUND",
        args: &[ArgSpec::scalar("value"), ArgSpec::scalar("places").optional()],
        implementation: fn_round,
        volatile: false,
    },
    FunctionDef {
        name: "INT",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_int,
        volatile: false,
    },
    FunctionDef {
        name: "MOD",
        args: &[ArgSpec::scalar("dividend"), ArgSpec::scalar("divisor")],
        implementation: fn_mod,
        volatile: false,
    },
    FunctionDef {
        name: "SQRT",
        args: &[ArgSpec::scalar("value")],
        implementation: fn_sqrt,
        volatile: false,
    },
    FunctionDef {
        name: "POWER",
        args: &[ArgSpec::scalar("base"), ArgSpec::scalar("exponent")],
        implementation: fn_power,
        volatile: false,
    },
    FunctionDef {
        name: "PI",
        args: &[],
        implementation: fn_pi,
        volatile: false,
    },
    FunctionDef {
        name: "RAND",
        args: &[],
        implementation: fn_rand,
        volatile: true,
    },
    FunctionDef {
        name: "RANDBETWEEN",
        args: &[ArgSpec::scalar("low"), ArgSpec::scalar("high")],
        implementation: fn_randbetween,
        volatile: true,
    },
];

fn number(n: f64) -> FormulaResult<FormulaValue> {
    if n.is_finite() {
        Ok(FormulaValue::scalar(n))
    } else {
        Err(FormulaError::Evaluation("The result is not a finite number".into()))
    }
}

/// SUM(value, ...)
pub fn fn_sum(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut sum = 0.0;
    visit_numbers(args, ctx, |n| sum += n)?;
    number(sum)
}

/// AVERAGE(value, ...)
pub fn fn_average(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (mut sum, mut count) = (0.0, 0usize);
    visit_numbers(args, ctx, |n| {
        sum += n;
        count += 1;
    })?;
    if count == 0 {
        return Err(FormulaError::Evaluation(
            "Evaluation of function AVERAGE caused a divide by zero error.".into(),
        ));
    }
    number(sum / count as f64)
}

/// MIN(value, ...), 0 without numbers
pub fn fn_min(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut min: Option<f64> = None;
    visit_numbers(args, ctx, |n| min = Some(min.map_or(n, |m| m.min(n))))?;
    number(min.unwrap_or(0.0))
}

/// MAX(value, ...), 0 without numbers
pub fn fn_max(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut max: Option<f64> = None;
    visit_numbers(args, ctx, |n| max = Some(max.map_or(n, |m| m.max(n))))?;
    number(max.unwrap_or(0.0))
}

/// COUNT(value, ...): numbers, and plain arguments that read as numbers.
/// Errors are not counted and do not propagate.
pub fn fn_count(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut count = 0usize;
    for arg in args {
        match arg {
            Arg::Value(value) if !value.is_error() => {
                if super::to_number(value, &ctx.locale).is_ok() && !value.value.is_empty() {
                    count += 1;
                }
            }
            Arg::Matrix(_) => {
                count += arg
                    .cells()
                    .filter(|cell| matches!(cell.value, CellValue::Number(_)))
                    .count();
            }
            _ => {}
        }
    }
    Ok(FormulaValue::scalar(count as f64))
}

/// COUNTA(value, ...): every non-empty value, errors included
pub fn fn_counta(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .flat_map(Arg::cells)
        .filter(|cell| !cell.value.is_empty())
        .count();
    Ok(FormulaValue::scalar(count as f64))
}

/// ABS(value)
pub fn fn_abs(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(number_arg(args, 0, ctx)?.abs())
}

/// ROUND(value, [places]), half away from zero
pub fn fn_round(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = number_arg(args, 0, ctx)?;
    let places = optional_number(args, 1, ctx)?.unwrap_or(0.0).trunc() as i32;
    let factor = 10f64.powi(places.clamp(-308, 308));
    let scaled = value * factor;
    if !scaled.is_finite() {
        // more places than an f64 carries
        return number(value);
    }
    number(scaled.round() / factor)
}

/// INT(value), toward negative infinity
pub fn fn_int(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(number_arg(args, 0, ctx)?.floor())
}

/// MOD(dividend, divisor); the result takes the sign of the divisor
pub fn fn_mod(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let dividend = number_arg(args, 0, ctx)?;
    let divisor = number_arg(args, 1, ctx)?;
    if divisor == 0.0 {
        return Err(FormulaError::Evaluation(
            "The divisor must be different from 0.".into(),
        ));
    }
    number(dividend - divisor * (dividend / divisor).floor())
}

/// SQRT(value)
pub fn fn_sqrt(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = number_arg(args, 0, ctx)?;
    if value < 0.0 {
        return Err(FormulaError::Evaluation(format!(
            "The value ({value}) must be positive or null."
        )));
    }
    number(value.sqrt())
}

/// POWER(base, exponent)
pub fn fn_power(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let base = number_arg(args, 0, ctx)?;
    let exponent = number_arg(args, 1, ctx)?;
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(FormulaError::Evaluation(
            "The exponent must be an integer when the base is negative.".into(),
        ));
    }
    number(base.powf(exponent))
}

/// PI()
pub fn fn_pi(_args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(std::f64::consts::PI))
}

/// RAND() - a number in [0, 1), different on every evaluation
pub fn fn_rand(_args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut rng = rand::thread_rng();
    Ok(FormulaValue::scalar(rng.gen::<f64>()))
}

/// RANDBETWEEN(low, high) - an integer in [ceil(low), floor(high)]
pub fn fn_randbetween(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    for index in 0..2 {
        check_error(super::scalar_arg(args, index))?;
    }
    let low = number_arg(args, 0, ctx)?.ceil();
    let high = number_arg(args, 1, ctx)?.floor();
    if low > high {
        return Err(FormulaError::Evaluation(format!(
            "The high ({high}) must be greater than or equal to the low ({low})."
        )));
    }
    let mut rng = rand::thread_rng();
    Ok(FormulaValue::scalar(rng.gen_range(low as i64..=high as i64) as f64))
}
