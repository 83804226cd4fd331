//! Linear algebra utilities.
//!
//! Dense solve with partial pivoting for Newton updates, plus 2x2 transfer
//! matrix helpers.

use beam_types::error::{BeamError, BeamResult};
use ndarray::{Array1, Array2};

/// Row-major 2x2 matrix.
pub type Matrix2 = [[f64; 2]; 2];

pub const IDENTITY2: Matrix2 = [[1.0, 0.0], [0.0, 1.0]];

/// `A · B` for 2x2 matrices.
pub fn mat2_mul(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

pub fn mat2_trace(a: &Matrix2) -> f64 {
    a[0][0] + a[1][1]
}

pub fn mat2_det(a: &Matrix2) -> f64 {
    a[0][0] * a[1][1] - a[0][1] * a[1][0]
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
pub fn solve_dense(a: &Array2<f64>, b: &Array1<f64>) -> BeamResult<Array1<f64>> {
    let (n, m) = a.dim();
    if n != m || b.len() != n {
        return Err(BeamError::LinAlg(format!(
            "shape mismatch: A is {n}x{m}, b has {}",
            b.len()
        )));
    }

    let mut aug = a.clone();
    let mut rhs = b.clone();
    let scale = aug.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(BeamError::LinAlg("matrix is zero or non-finite".to_string()));
    }

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| aug[[i, col]].abs().total_cmp(&aug[[j, col]].abs()))
            .unwrap_or(col);
        if aug[[pivot, col]].abs() <= 1e-14 * scale {
            return Err(BeamError::LinAlg(format!(
                "matrix is singular at column {col}"
            )));
        }
        if pivot != col {
            for k in 0..n {
                aug.swap([col, k], [pivot, k]);
            }
            rhs.swap(col, pivot);
        }
        for row in (col + 1)..n {
            let factor = aug[[row, col]] / aug[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                aug[[row, k]] -= factor * aug[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut acc = rhs[row];
        for k in (row + 1)..n {
            acc -= aug[[row, k]] * x[k];
        }
        x[row] = acc / aug[[row, row]];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mat2_mul_identity() {
        let a = [[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(mat2_mul(&a, &IDENTITY2), a);
        assert_eq!(mat2_mul(&IDENTITY2, &a), a);
        assert!((mat2_det(&a) + 2.0).abs() < 1e-15);
        assert!((mat2_trace(&a) - 5.0).abs() < 1e-15);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![2.0, 3.0];
        let x = solve_dense(&a, &b).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-14);
        assert!((x[1] - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_solve_4x4() {
        let a = array![
            [4.0, -1.0, 0.0, 0.5],
            [-1.0, 4.0, -1.0, 0.0],
            [0.0, -1.0, 4.0, -1.0],
            [0.5, 0.0, -1.0, 3.0]
        ];
        let x_true = array![1.0, -2.0, 0.5, 3.0];
        let b = a.dot(&x_true);
        let x = solve_dense(&a, &b).unwrap();
        for i in 0..4 {
            assert!((x[i] - x_true[i]).abs() < 1e-12, "x[{i}] = {}", x[i]);
        }
    }

    #[test]
    fn test_singular_reported() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];
        assert!(matches!(solve_dense(&a, &b), Err(BeamError::LinAlg(_))));
    }
}
