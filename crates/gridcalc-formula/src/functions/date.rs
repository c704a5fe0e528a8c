//! Date functions
//!
//! Dates are serial numbers counted in days from 1899-12-30; results carry
//! a date format so they display as dates.

use super::{number_arg, optional_number, ArgSpec, FunctionDef};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{Arg, EvaluationContext, FormulaValue};
use chrono::{Datelike, Local};
use gridcalc_core::date::{date_from_parts, date_to_serial, datetime_to_serial, serial_to_datetime};
use gridcalc_core::FunctionResult;

const DATE_FORMAT: &str = "m/d/yyyy";
const DATE_TIME_FORMAT: &str = "m/d/yyyy hh:mm:ss";

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "DATE",
        args: &[
            ArgSpec::scalar("year"),
            ArgSpec::scalar("month"),
            ArgSpec::scalar("day"),
        ],
        implementation: fn_date,
        volatile: false,
    },
    FunctionDef {
        name: "YEAR",
        args: &[ArgSpec::scalar("date")],
        implementation: fn_year,
        volatile: false,
    },
    FunctionDef {
        name: "MONTH",
        args: &[ArgSpec::scalar("date")],
        implementation: fn_month,
        volatile: false,
    },
    FunctionDef {
        name: "DAY",
        args: &[ArgSpec::scalar("date")],
        implementation: fn_day,
        volatile: false,
    },
    FunctionDef {
        name: "WEEKDAY",
        args: &[ArgSpec::scalar("date"), ArgSpec::scalar("type").optional()],
        implementation: fn_weekday,
        volatile: false,
    },
    FunctionDef {
        name: "TODAY",
        args: &[],
        implementation: fn_today,
        volatile: true,
    },
    FunctionDef {
        name: "NOW",
        args: &[],
        implementation: fn_now,
        volatile: true,
    },
];

fn dated(serial: f64, format: &str) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Scalar(
        FunctionResult::new(serial).with_format(Some(format.to_string())),
    ))
}

fn date_arg(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<chrono::NaiveDateTime> {
    let serial = number_arg(args, 0, ctx)?;
    serial_to_datetime(serial)
        .filter(|_| serial >= 0.0)
        .ok_or_else(|| FormulaError::Evaluation(format!("The value {serial} is not a valid date.")))
}

/// DATE(year, month, day). Years below 1900 count from 1900; months and
/// days overflow into the next unit.
pub fn fn_date(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut year = number_arg(args, 0, ctx)?.trunc() as i32;
    let month = number_arg(args, 1, ctx)?.trunc() as i32;
    let day = number_arg(args, 2, ctx)?.trunc() as i32;
    if (0..1900).contains(&year) {
        year += 1900;
    }
    let date = date_from_parts(year, month, day)
        .ok_or_else(|| FormulaError::Evaluation("The date is out of range.".into()))?;
    let serial = date_to_serial(date);
    if serial < 0.0 {
        return Err(FormulaError::Evaluation(
            "The function DATE result must be greater than or equal to 01/01/1900.".into(),
        ));
    }
    dated(serial, DATE_FORMAT)
}

/// YEAR(date)
pub fn fn_year(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(date_arg(args, ctx)?.year() as f64))
}

/// MONTH(date)
pub fn fn_month(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(date_arg(args, ctx)?.month() as f64))
}

/// DAY(date)
pub fn fn_day(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::scalar(date_arg(args, ctx)?.day() as f64))
}

/// WEEKDAY(date, [type]): type 1 (default) counts Sunday as 1, type 2
/// Monday as 1, type 3 Monday as 0.
pub fn fn_weekday(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let weekday = date_arg(args, ctx)?.weekday();
    let result = match optional_number(args, 1, ctx)?.unwrap_or(1.0).trunc() as i32 {
        1 => weekday.num_days_from_sunday() + 1,
        2 => weekday.number_from_monday(),
        3 => weekday.num_days_from_monday(),
        other => {
            return Err(FormulaError::Evaluation(format!(
                "Function WEEKDAY parameter 2 value {other} is out of range."
            )))
        }
    };
    Ok(FormulaValue::scalar(result as f64))
}

/// TODAY()
pub fn fn_today(_args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    dated(date_to_serial(Local::now().date_naive()), DATE_FORMAT)
}

/// NOW()
pub fn fn_now(_args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    dated(datetime_to_serial(Local::now().naive_local()), DATE_TIME_FORMAT)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::FormulaValue;
    use crate::testing::{eval, number};
    use gridcalc_core::CellError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_date() {
        match eval("=DATE(2024, 1, 15)") {
            FormulaValue::Scalar(result) => {
                assert_eq!(result.value.as_number(), Some(45306.0));
                assert_eq!(result.format.as_deref(), Some("m/d/yyyy"));
            }
            other => panic!("expected a scalar, got {other:?}"),
        }
        assert_eq!(number(eval("=DATE(24, 1, 15)")), number(eval("=DATE(1924, 1, 15)")));
        assert_eq!(number(eval("=DATE(2024, 13, 1)")), number(eval("=DATE(2025, 1, 1)")));
        assert_eq!(
            eval("=DATE(-5, 1, 1)").top_left().value.as_error(),
            Some(CellError::Generic)
        );
    }

    #[test]
    fn test_parts() {
        assert_eq!(number(eval("=YEAR(45306)")), 2024.0);
        assert_eq!(number(eval("=MONTH(45306)")), 1.0);
        assert_eq!(number(eval("=DAY(45306.75)")), 15.0);
        assert_eq!(number(eval("=YEAR(\"2024-03-01\")")), 2024.0);
        assert_eq!(eval("=DAY(-1)").top_left().value.as_error(), Some(CellError::Generic));
    }

    #[test]
    fn test_weekday() {
        // 2024-01-15 is a Monday
        assert_eq!(number(eval("=WEEKDAY(45306)")), 2.0);
        assert_eq!(number(eval("=WEEKDAY(45306, 2)")), 1.0);
        assert_eq!(number(eval("=WEEKDAY(45306, 3)")), 0.0);
    }

    #[test]
    fn test_today_is_a_whole_day() {
        let today = number(eval("=TODAY()"));
        assert_eq!(today.fract(), 0.0);
        assert!(number(eval("=NOW()")) >= today);
    }
}
