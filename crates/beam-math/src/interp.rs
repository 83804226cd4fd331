//! Linear interpolation on uniformly sampled 1-D data.

use ndarray::Array1;

/// Locate `x` on a uniform axis of `n` samples starting at `x0` with step
/// `dx`. Returns the left sample index and the fraction toward the next
/// sample. Clamps to the axis ends.
pub fn locate_uniform(n: usize, x0: f64, dx: f64, x: f64) -> (usize, f64) {
    if n < 2 || dx <= 0.0 || !x.is_finite() {
        return (0, 0.0);
    }
    let fx = (x - x0) / dx;
    let i0 = (fx.floor() as isize).clamp(0, n as isize - 2) as usize;
    let t = (fx - i0 as f64).clamp(0.0, 1.0);
    (i0, t)
}

/// Linear interpolation of `values` sampled at `x0 + i·dx`.
pub fn interp_uniform(values: &Array1<f64>, x0: f64, dx: f64, x: f64) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => values[0],
        n => {
            let (i0, t) = locate_uniform(n, x0, dx, x);
            lerp_at(values, i0, t)
        }
    }
}

/// `(1 - t)·v[i] + t·v[i+1]`.
pub fn lerp_at(values: &Array1<f64>, i0: usize, t: f64) -> f64 {
    (1.0 - t) * values[i0] + t * values[i0 + 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_data_exact() {
        let v = Array1::linspace(0.0, 10.0, 11);
        assert!((interp_uniform(&v, 0.0, 1.0, 3.25) - 3.25).abs() < 1e-14);
        assert!((interp_uniform(&v, 0.0, 1.0, 10.0) - 10.0).abs() < 1e-14);
    }

    #[test]
    fn test_clamps_outside() {
        let v = Array1::from_vec(vec![1.0, 2.0, 4.0]);
        assert_eq!(interp_uniform(&v, 0.0, 0.5, -3.0), 1.0);
        assert_eq!(interp_uniform(&v, 0.0, 0.5, 7.0), 4.0);
    }

    #[test]
    fn test_locate_midpoint() {
        let (i, t) = locate_uniform(5, -1.0, 0.5, 0.25);
        assert_eq!(i, 2);
        assert!((t - 0.5).abs() < 1e-14);
    }
}
