//! Lookup and reference functions

use super::{check_error, number_arg, optional_number, scalar_arg, to_bool, ArgSpec, FunctionDef};
use crate::ast::FormulaReference;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{compare_values, Arg, EvaluationContext, FormulaValue};
use gridcalc_core::{matrix_size, CellError, FunctionResult, Matrix, Zone};
use std::cmp::Ordering;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "ROW",
        args: &[ArgSpec::meta("reference").optional()],
        implementation: fn_row,
        volatile: false,
    },
    FunctionDef {
        name: "COLUMN",
        args: &[ArgSpec::meta("reference").optional()],
        implementation: fn_column,
        volatile: false,
    },
    FunctionDef {
        name: "ROWS",
        args: &[ArgSpec::range("range")],
        implementation: fn_rows,
        volatile: false,
    },
    FunctionDef {
        name: "COLUMNS",
        args: &[ArgSpec::range("range")],
        implementation: fn_columns,
        volatile: false,
    },
    FunctionDef {
        name: "INDEX",
        args: &[
            ArgSpec::range("range"),
            ArgSpec::scalar("row"),
            ArgSpec::scalar("column").optional(),
        ],
        implementation: fn_index,
        volatile: false,
    },
    FunctionDef {
        name: "MATCH",
        args: &[
            ArgSpec::scalar("search_key"),
            ArgSpec::range("range"),
            ArgSpec::scalar("search_type").optional(),
        ],
        implementation: fn_match,
        volatile: false,
    },
    FunctionDef {
        name: "VLOOKUP",
        args: &[
            ArgSpec::scalar("search_key"),
            ArgSpec::range("range"),
            ArgSpec::scalar("index"),
            ArgSpec::scalar("is_sorted").optional(),
        ],
        implementation: fn_vlookup,
        volatile: false,
    },
    FunctionDef {
        name: "CHOOSE",
        args: &[ArgSpec::scalar("index"), ArgSpec::scalar("choice").repeating()],
        implementation: fn_choose,
        volatile: false,
    },
];

/// A range argument as a matrix; a plain value is 1 × 1.
fn matrix_arg(args: &[Arg], index: usize) -> Matrix<FunctionResult> {
    match args.get(index) {
        Some(Arg::Matrix(matrix)) => matrix.clone(),
        _ => vec![vec![scalar_arg(args, index).clone()]],
    }
}

/// Zone of the meta argument, or the evaluating cell when it is omitted.
fn reference_zone(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<Zone> {
    let Some(Arg::Value(reference)) = args.first() else {
        return ctx
            .position
            .map(|position| Zone::cell(position.row, position.col))
            .ok_or_else(|| {
                FormulaError::Evaluation("The formula is not evaluated in a cell.".into())
            });
    };
    check_error(reference)?;
    let text = reference.value.as_str().unwrap_or_default();
    FormulaReference::parse(text)
        .zone
        .ok_or_else(|| FormulaError::InvalidReference(text.to_string()))
}

fn not_found(key: &FunctionResult, name: &str) -> FormulaError {
    FormulaError::Cell {
        kind: CellError::NotAvailable,
        message: Some(format!(
            "Did not find value '{}' in {name} evaluation.",
            key.value
        )),
    }
}

/// ROW([reference])
pub fn fn_row(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let zone = reference_zone(args, ctx)?;
    Ok(FormulaValue::scalar(zone.top as f64 + 1.0))
}

/// COLUMN([reference])
pub fn fn_column(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let zone = reference_zone(args, ctx)?;
    Ok(FormulaValue::scalar(zone.left as f64 + 1.0))
}

/// ROWS(range)
pub fn fn_rows(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (_, rows) = args.first().map_or((1, 1), Arg::shape);
    Ok(FormulaValue::scalar(rows as f64))
}

/// COLUMNS(range)
pub fn fn_columns(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (cols, _) = args.first().map_or((1, 1), Arg::shape);
    Ok(FormulaValue::scalar(cols as f64))
}

/// INDEX(range, row, [column]), 1-based. With a single-row range a lone
/// index selects the column.
pub fn fn_index(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let matrix = matrix_arg(args, 0);
    let (cols, rows) = matrix_size(&matrix);
    let first = number_arg(args, 1, ctx)?.trunc();
    let (row, col) = match optional_number(args, 2, ctx)? {
        Some(col) => (first, col.trunc()),
        None if rows == 1 && cols > 1 => (1.0, first),
        None => (first, 1.0),
    };
    if row < 1.0 || col < 1.0 || row as usize > rows || col as usize > cols {
        return Err(FormulaError::Cell {
            kind: CellError::InvalidReference,
            message: Some(format!(
                "Index ({row}, {col}) out of range {rows} x {cols}."
            )),
        });
    }
    Ok(FormulaValue::Scalar(
        matrix[col as usize - 1][row as usize - 1].clone(),
    ))
}

/// MATCH(search_key, range, [search_type]). `1` (default) finds the last
/// value <= key in ascending data, `0` an exact match, `-1` the last
/// value >= key in descending data.
pub fn fn_match(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let key = scalar_arg(args, 0);
    check_error(key)?;
    let matrix = matrix_arg(args, 1);
    let (cols, rows) = matrix_size(&matrix);
    if cols > 1 && rows > 1 {
        return Err(FormulaError::Evaluation(
            "Function MATCH expects a single row or column.".into(),
        ));
    }
    let values: Vec<&FunctionResult> = matrix.iter().flatten().collect();
    let search_type = optional_number(args, 2, ctx)?.unwrap_or(1.0);
    let position = match search_type {
        t if t == 0.0 => values
            .iter()
            .position(|v| !v.value.is_empty() && compare_values(&v.value, &key.value).is_eq()),
        t if t > 0.0 => last_before(&values, |v| compare_values(&v.value, &key.value).is_le()),
        _ => last_before(&values, |v| compare_values(&v.value, &key.value).is_ge()),
    };
    position
        .map(|i| FormulaValue::scalar(i as f64 + 1.0))
        .ok_or_else(|| not_found(key, "MATCH"))
}

/// Last index of the leading run of non-empty values satisfying `keep`.
fn last_before(values: &[&FunctionResult], keep: impl Fn(&FunctionResult) -> bool) -> Option<usize> {
    values
        .iter()
        .take_while(|v| !v.value.is_empty() && keep(v))
        .count()
        .checked_sub(1)
}

/// VLOOKUP(search_key, range, index, [is_sorted])
pub fn fn_vlookup(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let key = scalar_arg(args, 0);
    check_error(key)?;
    let matrix = matrix_arg(args, 1);
    let (cols, _) = matrix_size(&matrix);
    let index = number_arg(args, 2, ctx)?.trunc();
    if index < 1.0 || index as usize > cols {
        return Err(FormulaError::Evaluation(format!(
            "Function VLOOKUP parameter 3 value is {index}. Valid values are between 1 and {cols} inclusive."
        )));
    }
    let is_sorted = match args.get(3) {
        None | Some(Arg::Missing) => true,
        Some(_) => to_bool(scalar_arg(args, 3), &ctx.locale)?,
    };
    let first: Vec<&FunctionResult> = matrix[0].iter().collect();
    let row = if is_sorted {
        last_before(&first, |v| compare_values(&v.value, &key.value) != Ordering::Greater)
    } else {
        first
            .iter()
            .position(|v| compare_values(&v.value, &key.value).is_eq())
    };
    row.map(|row| FormulaValue::Scalar(matrix[index as usize - 1][row].clone()))
        .ok_or_else(|| not_found(key, "VLOOKUP"))
}

/// CHOOSE(index, choice, ...)
pub fn fn_choose(args: &[Arg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let index = number_arg(args, 0, ctx)?.trunc();
    let choices = args.len() - 1;
    if index < 1.0 || index as usize > choices {
        return Err(FormulaError::Evaluation(format!(
            "Index for CHOOSE is invalid. Valid values are between 1 and {choices} inclusive."
        )));
    }
    Ok(FormulaValue::Scalar(scalar_arg(args, index as usize).clone()))
}
