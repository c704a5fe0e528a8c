//! Dense numeric matrices for the array functions
//!
//! Column-major like every other matrix in the crate: `m[col][row]`.

use crate::error::{FormulaError, FormulaResult};
use gridcalc_core::{matrix_size, CellValue, FunctionResult, Matrix};

const EPSILON: f64 = 1e-10;

/// Numbers of a matrix argument. Any other value is rejected.
pub fn to_numbers(function: &str, matrix: &Matrix<FunctionResult>) -> FormulaResult<Matrix<f64>> {
    matrix
        .iter()
        .map(|col| {
            col.iter()
                .map(|cell| match &cell.value {
                    CellValue::Number(n) => Ok(*n),
                    CellValue::Error(kind) => Err(FormulaError::Cell {
                        kind: *kind,
                        message: cell.message.clone(),
                    }),
                    other => Err(FormulaError::Evaluation(format!(
                        "Function {function} expects number values, but got {} instead.",
                        other.type_name()
                    ))),
                })
                .collect()
        })
        .collect()
}

pub fn transpose<T: Clone>(matrix: &Matrix<T>) -> Matrix<T> {
    let (cols, rows) = matrix_size(matrix);
    (0..rows)
        .map(|row| (0..cols).map(|col| matrix[col][row].clone()).collect())
        .collect()
}

/// `a × b`; `None` unless the columns of `a` match the rows of `b`.
pub fn multiply(a: &Matrix<f64>, b: &Matrix<f64>) -> Option<Matrix<f64>> {
    let (a_cols, a_rows) = matrix_size(a);
    let (b_cols, b_rows) = matrix_size(b);
    if a_cols != b_rows {
        return None;
    }
    Some(
        (0..b_cols)
            .map(|col| {
                (0..a_rows)
                    .map(|row| (0..a_cols).map(|k| a[k][row] * b[col][k]).sum())
                    .collect()
            })
            .collect(),
    )
}

fn is_square(matrix: &Matrix<f64>) -> bool {
    let (cols, rows) = matrix_size(matrix);
    cols == rows && cols > 0
}

/// Row-major copy, easier to eliminate on
fn rows_of(matrix: &Matrix<f64>) -> Vec<Vec<f64>> {
    transpose(matrix)
}

/// Gauss-Jordan elimination with partial pivoting. `None` when `matrix` is
/// not square or is singular.
pub fn invert(matrix: &Matrix<f64>) -> Option<Matrix<f64>> {
    if !is_square(matrix) {
        return None;
    }
    let n = matrix.len();
    let mut a = rows_of(matrix);
    let mut inverse: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))?;
        if a[pivot][col].abs() < EPSILON {
            return None;
        }
        a.swap(col, pivot);
        inverse.swap(col, pivot);

        let scale = a[col][col];
        for j in 0..n {
            a[col][j] /= scale;
            inverse[col][j] /= scale;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }
    // back to column-major
    Some(transpose(&inverse))
}

/// `None` when `matrix` is not square.
pub fn determinant(matrix: &Matrix<f64>) -> Option<f64> {
    if !is_square(matrix) {
        return None;
    }
    let n = matrix.len();
    let mut a = rows_of(matrix);
    let mut det = 1.0;
    for col in 0..n {
        let pivot = (col..n).max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))?;
        if a[pivot][col].abs() < EPSILON {
            return Some(0.0);
        }
        if pivot != col {
            a.swap(col, pivot);
            det = -det;
        }
        det *= a[col][col];
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
        }
    }
    Some(det)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: &Matrix<f64>, b: &Matrix<f64>) -> bool {
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_multiply() {
        // [[1, 2], [3, 4]] stored by column
        let a = vec![vec![1.0, 3.0], vec![2.0, 4.0]];
        let identity = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(multiply(&a, &identity), Some(a.clone()));

        let column = vec![vec![1.0, 1.0]];
        assert_eq!(multiply(&a, &column), Some(vec![vec![3.0, 7.0]]));
        assert_eq!(multiply(&column, &a), None);
    }

    #[test]
    fn test_invert() {
        let a = vec![vec![4.0, 2.0], vec![7.0, 6.0]];
        let inverse = invert(&a).unwrap();
        let product = multiply(&a, &inverse).unwrap();
        assert!(close(&product, &vec![vec![1.0, 0.0], vec![0.0, 1.0]]));

        let singular = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(invert(&singular), None);
        assert_eq!(invert(&vec![vec![1.0, 2.0]]), None);
    }

    #[test]
    fn test_determinant() {
        let a = vec![vec![4.0, 2.0], vec![7.0, 6.0]];
        assert!((determinant(&a).unwrap() - 10.0).abs() < 1e-9);
        let swapped = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        assert_eq!(determinant(&swapped), Some(-1.0));
        assert_eq!(determinant(&vec![vec![1.0, 2.0]]), None);
    }

    #[test]
    fn test_to_numbers_rejects_text() {
        let m = vec![vec![FunctionResult::new(1.0), FunctionResult::new("x")]];
        assert!(to_numbers("MMULT", &m).is_err());
    }
}
