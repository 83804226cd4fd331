// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Single-Particle Transfer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linear single-particle optics through the hard-edge lattice.
//!
//! Each constant-gradient piece has an exact thick-lens matrix, so the
//! period map is a product of closed-form 2x2 matrices. The stability of
//! that map gives the undepressed phase advance `cos σ0 = tr(M)/2` and the
//! Courant–Snyder functions that seed the envelope matcher.

use crate::lattice::Lattice;
use beam_math::linalg::{mat2_mul, mat2_trace, Matrix2, IDENTITY2};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Plane {
    X,
    Y,
}

impl Plane {
    /// Sign of the focusing term: positive gradients focus `x`.
    pub fn sign(self) -> f64 {
        match self {
            Plane::X => 1.0,
            Plane::Y => -1.0,
        }
    }
}

/// Transfer matrix of a region with constant focusing strength `k` [1/m²].
pub fn thick_lens(k: f64, length: f64) -> Matrix2 {
    if k == 0.0 || length == 0.0 {
        return [[1.0, length], [0.0, 1.0]];
    }
    let w = k.abs().sqrt();
    let phi = w * length;
    if k > 0.0 {
        let (s, c) = phi.sin_cos();
        [[c, s / w], [-w * s, c]]
    } else {
        let (s, c) = (phi.sinh(), phi.cosh());
        [[c, s / w], [w * s, c]]
    }
}

/// Transfer matrix from `z0` to `z1` for one plane.
///
/// `inv_rigidity` is the signed `1/Bρ` converting gradients to strengths.
pub fn transfer_matrix(lattice: &Lattice, inv_rigidity: f64, plane: Plane, z0: f64, z1: f64) -> Matrix2 {
    let mut m = IDENTITY2;
    for (lo, hi) in lattice.pieces(z0, z1) {
        let k = plane.sign() * inv_rigidity * lattice.gradient_at(0.5 * (lo + hi));
        m = mat2_mul(&thick_lens(k, hi - lo), &m);
    }
    m
}

/// One-period map starting at `z0`.
pub fn period_matrix(lattice: &Lattice, inv_rigidity: f64, plane: Plane, z0: f64) -> Matrix2 {
    transfer_matrix(lattice, inv_rigidity, plane, z0, z0 + lattice.period())
}

/// Twiss functions of a stable periodic map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CourantSnyder {
    /// Phase advance per period [rad], in `(0, π)`
    pub phase_advance: f64,
    pub beta: f64,
    pub alpha: f64,
}

impl CourantSnyder {
    /// `None` when `|tr M| ≥ 2` (unstable or on a resonance edge).
    pub fn from_matrix(m: &Matrix2) -> Option<Self> {
        let cos_mu = 0.5 * mat2_trace(m);
        if !cos_mu.is_finite() || cos_mu.abs() >= 1.0 {
            return None;
        }
        let sin_mu = m[0][1].signum() * (1.0 - cos_mu * cos_mu).sqrt();
        if sin_mu == 0.0 {
            return None;
        }
        Some(CourantSnyder {
            phase_advance: cos_mu.acos(),
            beta: m[0][1] / sin_mu,
            alpha: (m[0][0] - m[1][1]) / (2.0 * sin_mu),
        })
    }

    pub fn gamma(&self) -> f64 {
        (1.0 + self.alpha * self.alpha) / self.beta
    }

    /// Zero-current matched envelope `(a, a')` for edge emittance `ε`.
    pub fn envelope(&self, emittance: f64) -> (f64, f64) {
        let radius = (emittance * self.beta).sqrt();
        let slope = -self.alpha * (emittance / self.beta).sqrt();
        (radius, slope)
    }
}

/// `tr(M)/2` of the period map from the lattice start.
///
/// Equal to `cos σ0` inside the first stop band edge and continuous through
/// it, where it falls below -1.
pub fn period_half_trace(lattice: &Lattice, inv_rigidity: f64, plane: Plane) -> f64 {
    0.5 * mat2_trace(&period_matrix(lattice, inv_rigidity, plane, lattice.start()))
}

/// Undepressed phase advance per period [rad], `None` if unstable.
pub fn undepressed_phase_advance(lattice: &Lattice, inv_rigidity: f64, plane: Plane) -> Option<f64> {
    let m = period_matrix(lattice, inv_rigidity, plane, lattice.start());
    CourantSnyder::from_matrix(&m).map(|cs| cs.phase_advance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_math::linalg::mat2_det;
    use beam_math::ode::{rk4_advance, OdeSystem};

    const INV_RIGIDITY: f64 = 1.0 / 0.254629;

    fn fodo(gradient: f64) -> Lattice {
        Lattice::fodo(0.36, 0.11, gradient, 0.0).unwrap()
    }

    #[test]
    fn test_thick_lens_unimodular() {
        for k in [-40.0, -1.0, 0.0, 2.0, 33.0] {
            let m = thick_lens(k, 0.11);
            assert!((mat2_det(&m) - 1.0).abs() < 1e-12, "k = {k}");
        }
    }

    #[test]
    fn test_drift_matrix() {
        assert_eq!(thick_lens(0.0, 0.3), [[1.0, 0.3], [0.0, 1.0]]);
    }

    #[test]
    fn test_fodo3d_gradient_gives_72_degrees() {
        let lat = fodo(8.4754641931380);
        let sigma0 = undepressed_phase_advance(&lat, INV_RIGIDITY, Plane::X).unwrap();
        assert!((sigma0.to_degrees() - 72.0).abs() < 0.1, "σ0 = {}°", sigma0.to_degrees());
        let sigma0_y = undepressed_phase_advance(&lat, INV_RIGIDITY, Plane::Y).unwrap();
        assert!((sigma0 - sigma0_y).abs() < 1e-10);
    }

    #[test]
    fn test_strong_focusing_is_unstable() {
        let lat = fodo(60.0);
        assert!(undepressed_phase_advance(&lat, INV_RIGIDITY, Plane::X).is_none());
        assert!(period_half_trace(&lat, INV_RIGIDITY, Plane::X).abs() >= 1.0);
    }

    #[test]
    fn test_half_trace_matches_phase_advance() {
        let lat = fodo(8.4754641931380);
        let sigma0 = undepressed_phase_advance(&lat, INV_RIGIDITY, Plane::X).unwrap();
        let half = period_half_trace(&lat, INV_RIGIDITY, Plane::X);
        assert!((half - sigma0.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_courant_snyder_at_defocusing_centre() {
        let lat = fodo(8.4754641931380);
        let mx = period_matrix(&lat, INV_RIGIDITY, Plane::X, -0.9);
        let my = period_matrix(&lat, INV_RIGIDITY, Plane::Y, -0.9);
        let cx = CourantSnyder::from_matrix(&mx).unwrap();
        let cy = CourantSnyder::from_matrix(&my).unwrap();
        // Symmetry point: no correlation, x is at its minimum there
        assert!(cx.alpha.abs() < 1e-9);
        assert!(cy.alpha.abs() < 1e-9);
        assert!(cx.beta < cy.beta);
        assert!((cx.gamma() * cx.beta - 1.0).abs() < 1e-9);
    }

    struct ConstantFocusing {
        k: f64,
    }

    impl OdeSystem<2> for ConstantFocusing {
        fn derivative(&self, _z: f64, y: &[f64; 2]) -> [f64; 2] {
            [y[1], -self.k * y[0]]
        }
    }

    #[test]
    fn test_numeric_tracking_matches_matrix() {
        let lat = fodo(8.4754641931380);
        let m = transfer_matrix(&lat, INV_RIGIDITY, Plane::X, -0.3, 0.5);
        let mut tracked = [1.0e-3, 2.0e-3];
        for (lo, hi) in lat.pieces(-0.3, 0.5) {
            let k = INV_RIGIDITY * lat.gradient_at(0.5 * (lo + hi));
            rk4_advance(&ConstantFocusing { k }, lo, hi, &mut tracked, 40);
        }
        let x = m[0][0] * 1.0e-3 + m[0][1] * 2.0e-3;
        let xp = m[1][0] * 1.0e-3 + m[1][1] * 2.0e-3;
        assert!((tracked[0] - x).abs() < 1e-10, "{} vs {x}", tracked[0]);
        assert!((tracked[1] - xp).abs() < 1e-9);
    }

    #[test]
    fn test_envelope_seed_positive() {
        let lat = fodo(8.4754641931380);
        let m = period_matrix(&lat, INV_RIGIDITY, Plane::X, 0.3);
        let cs = CourantSnyder::from_matrix(&m).unwrap();
        let (a, _ap) = cs.envelope(6.247e-5);
        assert!(a > 0.0 && a.is_finite());
    }
}
