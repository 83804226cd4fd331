// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Property-Based Tests (proptest) for beam-math
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for beam-math using proptest.
//!
//! Covers: dense solver, bracketed root finding, RK4 oscillator phase,
//! uniform interpolation.

use beam_math::interp::interp_uniform;
use beam_math::linalg::{mat2_det, mat2_mul, solve_dense, Matrix2};
use beam_math::ode::{rk4_advance, OdeSystem};
use beam_math::roots::{scan_for_bracket, solve_bracketed, RootConfig};
use ndarray::{Array1, Array2};
use proptest::prelude::*;

struct HarmonicOscillator {
    omega: f64,
}

impl OdeSystem<2> for HarmonicOscillator {
    fn derivative(&self, _t: f64, y: &[f64; 2]) -> [f64; 2] {
        [y[1], -self.omega * self.omega * y[0]]
    }
}

// ── Dense Solver Properties ──────────────────────────────────────────

proptest! {
    /// For any diagonally dominant system, x = solve(A, b) satisfies Ax = b.
    #[test]
    fn dense_solve_ax_eq_b(n in 2usize..8, seed in 0u32..1000) {
        let s = seed as f64;
        let a = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j { 2.0 * n as f64 } else { ((i * 7 + j * 3) as f64 + s).sin() }
        });
        let b = Array1::from_shape_fn(n, |i| (i as f64 + 0.3 * s).cos());
        let x = solve_dense(&a, &b).unwrap();
        let r = a.dot(&x) - &b;
        for v in r.iter() {
            prop_assert!(v.abs() < 1e-10, "residual {}", v);
        }
    }
}

// ── Root Finding Properties ──────────────────────────────────────────

proptest! {
    /// Cube roots of positive numbers are recovered.
    #[test]
    fn cube_root_recovered(c in 0.01f64..1000.0) {
        let f = |x: f64| x * x * x - c;
        let bracket = scan_for_bracket(|x| Ok(Some(f(x))), 0.0, 11.0, 40).unwrap().unwrap();
        let root = solve_bracketed(|x| Ok(f(x)), bracket, RootConfig::default()).unwrap();
        prop_assert!((root.x - c.cbrt()).abs() < 1e-8 * (1.0 + c.cbrt()),
            "root {} vs {}", root.x, c.cbrt());
    }
}

// ── Integrator Properties ────────────────────────────────────────────

proptest! {
    /// RK4 over one oscillator period returns to the start.
    #[test]
    fn oscillator_period_closes(omega in 0.5f64..20.0, x0 in -1.0f64..1.0) {
        let sys = HarmonicOscillator { omega };
        let period = 2.0 * std::f64::consts::PI / omega;
        let mut y = [x0, 0.3];
        rk4_advance(&sys, 0.0, period, &mut y, 500);
        prop_assert!((y[0] - x0).abs() < 1e-6);
        prop_assert!((y[1] - 0.3).abs() < 1e-6 * (1.0 + omega));
    }

    /// Determinants multiply.
    #[test]
    fn det_is_multiplicative(a in prop::array::uniform4(-3.0f64..3.0), b in prop::array::uniform4(-3.0f64..3.0)) {
        let ma: Matrix2 = [[a[0], a[1]], [a[2], a[3]]];
        let mb: Matrix2 = [[b[0], b[1]], [b[2], b[3]]];
        let lhs = mat2_det(&mat2_mul(&ma, &mb));
        let rhs = mat2_det(&ma) * mat2_det(&mb);
        prop_assert!((lhs - rhs).abs() < 1e-9 * (1.0 + rhs.abs()));
    }
}

// ── Interpolation Properties ─────────────────────────────────────────

proptest! {
    /// Interpolated values stay within the sample range.
    #[test]
    fn interp_bounded(x in -5.0f64..15.0, n in 2usize..50) {
        let v = Array1::from_shape_fn(n, |i| (i as f64 * 0.7).sin());
        let y = interp_uniform(&v, 0.0, 10.0 / (n - 1) as f64, x);
        let lo = v.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(y >= lo - 1e-12 && y <= hi + 1e-12);
    }
}
