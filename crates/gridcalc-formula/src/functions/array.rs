//! Array functions

use super::{scalar_arg, ArgSpec, FunctionDef};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{Arg, EvaluationContext, FormulaValue};
use crate::matrix::{determinant, invert, multiply, to_numbers, transpose};
use gridcalc_core::{FunctionResult, Matrix};

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "TRANSPOSE",
        args: &[ArgSpec::range("range")],
        implementation: fn_transpose,
        volatile: false,
    },
    FunctionDef {
        name: "MMULT",
        args: &[ArgSpec::range("matrix1"), ArgSpec::range("matrix2")],
        implementation: fn_mmult,
        volatile: false,
    },
    FunctionDef {
        name: "MINVERSE",
        args: &[ArgSpec::range("matrix")],
        implementation: fn_minverse,
        volatile: false,
    },
    FunctionDef {
        name: "MDETERM",
        args: &[ArgSpec::range("matrix")],
        implementation: fn_mdeterm,
        volatile: false,
    },
];

fn matrix_arg(args: &[Arg], index: usize) -> Matrix<FunctionResult> {
    match args.get(index) {
        Some(Arg::Matrix(matrix)) => matrix.clone(),
        _ => vec![vec![scalar_arg(args, index).clone()]],
    }
}

fn numbers(args: &[Arg], index: usize, function: &str) -> FormulaResult<Matrix<f64>> {
    to_numbers(function, &matrix_arg(args, index))
}

fn from_numbers(matrix: Matrix<f64>) -> FormulaValue {
    FormulaValue::Matrix(
        matrix
            .into_iter()
            .map(|col| col.into_iter().map(FunctionResult::new).collect())
            .collect(),
    )
}

fn square_error(function: &str) -> FormulaError {
    FormulaError::Evaluation(format!("Function {function} expects a square matrix."))
}

/// TRANSPOSE(range)
pub fn fn_transpose(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Matrix(transpose(&matrix_arg(args, 0))))
}

/// MMULT(matrix1, matrix2)
pub fn fn_mmult(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let a = numbers(args, 0, "MMULT")?;
    let b = numbers(args, 1, "MMULT")?;
    multiply(&a, &b).map(from_numbers).ok_or_else(|| {
        FormulaError::Evaluation(
            "In MMULT, the number of columns of the first matrix must be equal to the number of rows of the second matrix."
                .into(),
        )
    })
}

/// MINVERSE(matrix)
pub fn fn_minverse(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let matrix = numbers(args, 0, "MINVERSE")?;
    if matrix.len() != matrix.first().map_or(0, Vec::len) {
        return Err(square_error("MINVERSE"));
    }
    invert(&matrix)
        .map(from_numbers)
        .ok_or_else(|| FormulaError::Evaluation("Function MINVERSE: the matrix is not invertible.".into()))
}

/// MDETERM(matrix)
pub fn fn_mdeterm(args: &[Arg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let matrix = numbers(args, 0, "MDETERM")?;
    determinant(&matrix)
        .map(FormulaValue::scalar)
        .ok_or_else(|| square_error("MDETERM"))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::FormulaValue;
    use crate::testing::{eval_with, number};
    use gridcalc_core::{CellError, CellValue};
    use pretty_assertions::assert_eq;

    fn grid() -> Vec<(&'static str, CellValue)> {
        vec![
            ("A1", CellValue::Number(1.0)),
            ("B1", CellValue::Number(2.0)),
            ("A2", CellValue::Number(3.0)),
            ("B2", CellValue::Number(4.0)),
            ("C1", CellValue::Number(1.0)),
            ("C2", CellValue::Number(1.0)),
            ("D1", CellValue::string("x")),
        ]
    }

    fn numbers(value: FormulaValue) -> Vec<Vec<f64>> {
        match value {
            FormulaValue::Matrix(m) => m
                .into_iter()
                .map(|col| col.into_iter().map(|r| r.value.as_number().unwrap()).collect())
                .collect(),
            other => panic!("expected a matrix, got {other:?}"),
        }
    }

    #[test]
    fn test_transpose() {
        let value = eval_with("=TRANSPOSE(A1:B2)", &grid());
        assert_eq!(numbers(value), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_mmult() {
        let value = eval_with("=MMULT(A1:B2, C1:C2)", &grid());
        assert_eq!(numbers(value), vec![vec![3.0, 7.0]]);

        let mismatch = eval_with("=MMULT(C1:C2, A1:B2)", &grid());
        assert_eq!(mismatch.top_left().value.as_error(), Some(CellError::Generic));

        let text = eval_with("=MMULT(A1:D1, A1:A4)", &grid());
        assert_eq!(text.top_left().value.as_error(), Some(CellError::Generic));
    }

    #[test]
    fn test_inverse_and_determinant() {
        assert!((number(eval_with("=MDETERM(A1:B2)", &grid())) + 2.0).abs() < 1e-9);
        let inverse = numbers(eval_with("=MINVERSE(A1:B2)", &grid()));
        let expected = [[-2.0, 1.5], [1.0, -0.5]];
        for (col, values) in expected.iter().enumerate() {
            for (row, v) in values.iter().enumerate() {
                assert!((inverse[col][row] - v).abs() < 1e-9);
            }
        }
        assert_eq!(
            eval_with("=MINVERSE(A1:C2)", &grid()).top_left().value.as_error(),
            Some(CellError::Generic)
        );
    }

    #[test]
    fn test_array_result_inside_an_aggregate() {
        assert_eq!(number(eval_with("=SUM(MMULT(A1:B2, C1:C2))", &grid())), 10.0);
    }
}
