//! Broadcasting of scalar parameters over matrix arguments
//!
//! A function declares which parameters take a single value. When such a
//! parameter receives a matrix, the function is applied once per position
//! and the results are assembled into a matrix:
//!
//! - a vector is paired positionally with a vector of the same orientation
//! - a vertical and a horizontal vector produce their outer product
//! - a one-column (one-row) argument repeats across every column (row)
//! - positions past the shorter of two mismatched arguments are `#N/A`
//!
//! Each position is computed independently: a failure lands in that
//! position only, and a matrix result contributes its top-left value.

use crate::error::FormulaResult;
use crate::evaluator::{Arg, FormulaValue};
use gridcalc_core::{generate_matrix, matrix_size, CellError, FunctionResult, Matrix};

/// Apply `compute` to `args`, broadcasting every matrix argument for which
/// `vectorized(index)` holds. Without such arguments this is a plain call.
pub fn apply(
    name: &str,
    args: Vec<Arg>,
    vectorized: impl Fn(usize) -> bool,
    compute: impl Fn(&[Arg]) -> FormulaResult<FormulaValue>,
) -> FormulaResult<FormulaValue> {
    let args: Vec<Arg> = args
        .into_iter()
        .enumerate()
        .map(|(index, arg)| match arg {
            Arg::Matrix(matrix) if vectorized(index) && matrix_size(&matrix) == (1, 1) => {
                Arg::Value(pick(&matrix, 0, 0))
            }
            other => other,
        })
        .collect();

    let shapes: Vec<(usize, usize)> = args
        .iter()
        .enumerate()
        .filter_map(|(index, arg)| match arg {
            Arg::Matrix(matrix) if vectorized(index) => Some(matrix_size(matrix)),
            _ => None,
        })
        .collect();
    if shapes.is_empty() {
        return compute(&args);
    }

    let (cols, col_limit) = axis(shapes.iter().map(|(cols, _)| *cols));
    let (rows, row_limit) = axis(shapes.iter().map(|(_, rows)| *rows));
    Ok(FormulaValue::Matrix(generate_matrix(cols, rows, |col, row| {
        if col >= col_limit || row >= row_limit {
            return FunctionResult::error(
                CellError::NotAvailable,
                format!("Array arguments to {name} are of different size."),
            );
        }
        let position_args: Vec<Arg> = args
            .iter()
            .enumerate()
            .map(|(index, arg)| match arg {
                Arg::Matrix(matrix) if vectorized(index) => Arg::Value(pick(matrix, col, row)),
                other => other.clone(),
            })
            .collect();
        match compute(&position_args) {
            Ok(value) => value.top_left(),
            Err(err) => err.to_result(),
        }
    })))
}

/// Output length and in-range length along one axis. Arguments of length 1
/// stretch and do not take part.
fn axis(lengths: impl Iterator<Item = usize>) -> (usize, usize) {
    lengths
        .filter(|&len| len > 1)
        .fold(None, |acc: Option<(usize, usize)>, len| match acc {
            None => Some((len, len)),
            Some((max, min)) => Some((max.max(len), min.min(len))),
        })
        .unwrap_or((1, 1))
}

/// Value at a broadcast position; single columns and rows repeat.
fn pick(matrix: &Matrix<FunctionResult>, col: usize, row: usize) -> FunctionResult {
    let column = match matrix.len() {
        1 => matrix.first(),
        _ => matrix.get(col),
    };
    column
        .and_then(|values| match values.len() {
            1 => values.first(),
            _ => values.get(row),
        })
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;
    use gridcalc_core::CellValue;
    use pretty_assertions::assert_eq;

    fn column(values: &[f64]) -> Arg {
        Arg::Matrix(vec![values.iter().map(|v| FunctionResult::new(*v)).collect()])
    }

    fn row(values: &[f64]) -> Arg {
        Arg::Matrix(values.iter().map(|v| vec![FunctionResult::new(*v)]).collect())
    }

    fn value(n: f64) -> Arg {
        Arg::Value(FunctionResult::new(n))
    }

    fn add(args: &[Arg]) -> FormulaResult<FormulaValue> {
        let n = |arg: &Arg| match arg {
            Arg::Value(r) => r.value.as_number().unwrap_or(0.0),
            _ => panic!("vectorized arguments arrive as values"),
        };
        let sum = n(&args[0]) + n(&args[1]);
        if sum < 0.0 {
            return Err(FormulaError::Evaluation("negative".into()));
        }
        Ok(FormulaValue::scalar(sum))
    }

    fn values(result: FormulaValue) -> Vec<Vec<CellValue>> {
        match result {
            FormulaValue::Matrix(m) => m
                .into_iter()
                .map(|col| col.into_iter().map(|r| r.value).collect())
                .collect(),
            FormulaValue::Scalar(r) => vec![vec![r.value]],
        }
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    #[test]
    fn test_two_scalars() {
        let result = apply("ADD", vec![value(1.0), value(2.0)], |_| true, add).unwrap();
        assert_eq!(result, FormulaValue::scalar(3.0));
    }

    #[test]
    fn test_scalar_repeats_along_vector() {
        let result = apply("ADD", vec![column(&[1.0, 2.0, 3.0]), value(10.0)], |_| true, add);
        assert_eq!(values(result.unwrap()), vec![vec![n(11.0), n(12.0), n(13.0)]]);
    }

    #[test]
    fn test_outer_product() {
        let result = apply("ADD", vec![column(&[1.0, 2.0]), row(&[10.0, 20.0, 30.0])], |_| true, add);
        assert_eq!(
            values(result.unwrap()),
            vec![
                vec![n(11.0), n(12.0)],
                vec![n(21.0), n(22.0)],
                vec![n(31.0), n(32.0)],
            ]
        );
    }

    #[test]
    fn test_size_mismatch_is_not_available_past_overlap() {
        let result = apply("ADD", vec![column(&[1.0, 2.0]), column(&[1.0, 1.0, 1.0])], |_| true, add);
        let cells = values(result.unwrap());
        assert_eq!(cells[0][..2], [n(2.0), n(3.0)]);
        assert_eq!(cells[0][2], CellValue::Error(CellError::NotAvailable));
    }

    #[test]
    fn test_position_errors_stay_local() {
        let result = apply("ADD", vec![column(&[1.0, -5.0, 2.0]), value(1.0)], |_| true, add);
        let cells = values(result.unwrap());
        assert_eq!(cells[0][0], n(2.0));
        assert_eq!(cells[0][1], CellValue::Error(CellError::Generic));
        assert_eq!(cells[0][2], n(3.0));
    }

    #[test]
    fn test_single_cell_matrix_is_unwrapped() {
        let result = apply("ADD", vec![column(&[4.0]), value(1.0)], |_| true, add).unwrap();
        assert_eq!(result, FormulaValue::scalar(5.0));
    }

    #[test]
    fn test_range_parameters_are_passed_through() {
        let total = |args: &[Arg]| -> FormulaResult<FormulaValue> {
            let sum: f64 = args[0]
                .cells()
                .filter_map(|r| r.value.as_number())
                .sum();
            Ok(FormulaValue::scalar(sum))
        };
        let result = apply("SUM", vec![column(&[1.0, 2.0])], |_| false, total).unwrap();
        assert_eq!(result, FormulaValue::scalar(3.0));
    }

    #[test]
    fn test_matrix_results_contribute_top_left() {
        let spill = |_: &[Arg]| -> FormulaResult<FormulaValue> {
            Ok(FormulaValue::Matrix(vec![vec![
                FunctionResult::new(7.0),
                FunctionResult::new(8.0),
            ]]))
        };
        let result = apply("SPILL", vec![column(&[1.0, 2.0])], |_| true, spill);
        assert_eq!(values(result.unwrap()), vec![vec![n(7.0), n(7.0)]]);
    }
}
