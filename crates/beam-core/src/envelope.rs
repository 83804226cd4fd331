// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — KV Envelope Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! KV envelope equations in a hard-edge periodic lattice:
//!
//! ```text
//! a'' = -κ(z)·a + 2Q/(a+b) + εx²/a³
//! b'' = +κ(z)·b + 2Q/(a+b) + εy²/b³
//! ```
//!
//! The state is augmented with the phase integrals `∫ ε/a² dz` and
//! `∫ ε/b² dz` so depressed phase advances come out of the same RK4 pass.
//! Steps never straddle a quadrupole edge.

use crate::lattice::Lattice;
use crate::species::DerivedBeam;
use beam_math::ode::{rk4_advance, OdeSystem};
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{EnvelopeSolution, EnvelopeState};
use ndarray::Array1;

/// Envelope equations with a fixed focusing strength.
struct PieceEquations {
    kappa: f64,
    perveance: f64,
    emittance_x: f64,
    emittance_y: f64,
}

impl OdeSystem<6> for PieceEquations {
    fn derivative(&self, _z: f64, y: &[f64; 6]) -> [f64; 6] {
        let (a, ap, b, bp) = (y[0], y[1], y[2], y[3]);
        let space_charge = 2.0 * self.perveance / (a + b);
        let ex2 = self.emittance_x * self.emittance_x;
        let ey2 = self.emittance_y * self.emittance_y;
        [
            ap,
            -self.kappa * a + space_charge + ex2 / (a * a * a),
            bp,
            self.kappa * b + space_charge + ey2 / (b * b * b),
            self.emittance_x / (a * a),
            self.emittance_y / (b * b),
        ]
    }
}

/// Result of advancing the envelope over an interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    pub state: EnvelopeState,
    /// Accumulated phase advance [rad]
    pub phase_x: f64,
    pub phase_y: f64,
}

#[derive(Debug, Clone)]
pub struct EnvelopeModel {
    pub lattice: Lattice,
    /// Signed `1/Bρ` [1/(T·m)]
    pub inv_rigidity: f64,
    pub perveance: f64,
    pub emittance_x: f64,
    pub emittance_y: f64,
    /// Upper bound on the RK4 step [m]
    pub max_step: f64,
}

impl EnvelopeModel {
    pub fn from_beam(beam: &DerivedBeam, lattice: Lattice, max_step: f64) -> BeamResult<Self> {
        if !max_step.is_finite() || max_step <= 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "envelope step must be finite and > 0, got {max_step}"
            )));
        }
        Ok(EnvelopeModel {
            lattice,
            inv_rigidity: beam.inverse_rigidity(),
            perveance: beam.perveance,
            emittance_x: beam.emittance_x,
            emittance_y: beam.emittance_y,
            max_step,
        })
    }

    pub fn with_perveance(&self, perveance: f64) -> Self {
        EnvelopeModel {
            perveance,
            ..self.clone()
        }
    }

    pub fn with_emittance(&self, emittance_x: f64, emittance_y: f64) -> Self {
        EnvelopeModel {
            emittance_x,
            emittance_y,
            ..self.clone()
        }
    }

    fn equations_at(&self, z: f64) -> PieceEquations {
        PieceEquations {
            kappa: self.inv_rigidity * self.lattice.gradient_at(z),
            perveance: self.perveance,
            emittance_x: self.emittance_x,
            emittance_y: self.emittance_y,
        }
    }

    /// Advance from `z0` to `z1 >= z0`.
    pub fn advance(&self, state: EnvelopeState, z0: f64, z1: f64) -> BeamResult<Advance> {
        if !state.is_physical() {
            return Err(BeamError::PhysicsViolation(format!(
                "envelope state must have finite values and positive radii, got {state:?}"
            )));
        }
        if !(z1 >= z0) {
            return Err(BeamError::PhysicsViolation(format!(
                "envelope advance needs z1 >= z0, got [{z0}, {z1}]"
            )));
        }
        let s = state.to_array();
        let mut y = [s[0], s[1], s[2], s[3], 0.0, 0.0];
        for (i, (lo, hi)) in self.lattice.pieces(z0, z1).into_iter().enumerate() {
            let len = hi - lo;
            if len <= 0.0 {
                continue;
            }
            let eqs = self.equations_at(0.5 * (lo + hi));
            let steps = (len / self.max_step).ceil().max(1.0) as usize;
            rk4_advance(&eqs, lo, hi, &mut y, steps);
            if !EnvelopeState::new(y[0], y[1], y[2], y[3]).is_physical() {
                return Err(BeamError::SolverDiverged {
                    iteration: i,
                    message: format!("envelope collapsed between z = {lo} and z = {hi}"),
                });
            }
        }
        Ok(Advance {
            state: EnvelopeState::new(y[0], y[1], y[2], y[3]),
            phase_x: y[4],
            phase_y: y[5],
        })
    }

    /// One-period map `Φ(x)` from `z0`.
    pub fn period_map(&self, state: EnvelopeState, z0: f64) -> BeamResult<Advance> {
        self.advance(state, z0, z0 + self.lattice.period())
    }

    /// Relative periodicity residual of `state` over one period.
    pub fn periodicity_residual(&self, state: EnvelopeState, z0: f64) -> BeamResult<f64> {
        let next = self.period_map(state, z0)?;
        Ok(state.mismatch(&next.state))
    }

    /// Sample the envelope on `z = zl + i·dz`, `i = 0..=n` with
    /// `n = ceil((zu - zl)/dz)`, so the grid always reaches `zu`.
    pub fn solve(&self, initial: EnvelopeState, zl: f64, zu: f64, dz: f64) -> BeamResult<EnvelopeSolution> {
        if !(zl.is_finite() && zu.is_finite()) || zu <= zl {
            return Err(BeamError::PhysicsViolation(format!(
                "envelope range must satisfy zl < zu, got [{zl}, {zu}]"
            )));
        }
        if !dz.is_finite() || dz <= 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "envelope step must be finite and > 0, got {dz}"
            )));
        }
        let n = ((zu - zl) / dz - 1e-9).ceil().max(1.0) as usize;

        let mut a = Array1::zeros(n + 1);
        let mut ap = Array1::zeros(n + 1);
        let mut b = Array1::zeros(n + 1);
        let mut bp = Array1::zeros(n + 1);
        let z = Array1::from_iter((0..=n).map(|i| zl + i as f64 * dz));

        let mut state = initial;
        let (mut phase_x, mut phase_y) = (0.0, 0.0);
        for i in 0..=n {
            if i > 0 {
                let step = self.advance(state, z[i - 1], z[i])?;
                state = step.state;
                phase_x += step.phase_x;
                phase_y += step.phase_y;
            }
            a[i] = state.a;
            ap[i] = state.ap;
            b[i] = state.b;
            bp[i] = state.bp;
        }
        log::debug!(
            "envelope solved on [{zl}, {}] with {} samples, phase advance {:.3}°/{:.3}°",
            z[n],
            n + 1,
            phase_x.to_degrees(),
            phase_y.to_degrees()
        );

        Ok(EnvelopeSolution {
            z,
            a,
            ap,
            b,
            bp,
            dz,
            phase_x,
            phase_y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_types::config::SimulationConfig;

    fn fodo3d_model() -> (EnvelopeModel, EnvelopeState) {
        let cfg = SimulationConfig::fodo3d();
        let beam = DerivedBeam::derive(&cfg.beam).unwrap();
        let gradient = cfg.lattice.gradient_t_per_m.unwrap();
        let lattice = Lattice::from_config(&cfg.lattice, gradient).unwrap();
        let model = EnvelopeModel::from_beam(&beam, lattice, cfg.envelope.dz_m).unwrap();
        let initial = EnvelopeState::new(cfg.beam.a0_m, cfg.beam.ap0, cfg.beam.b0_m, cfg.beam.bp0);
        (model, initial)
    }

    #[test]
    fn test_fodo3d_script_state_is_nearly_periodic() {
        let (model, initial) = fodo3d_model();
        let residual = model.periodicity_residual(initial, -0.9).unwrap();
        assert!(residual < 5e-3, "residual = {residual}");
    }

    #[test]
    fn test_fodo3d_depressed_phase_advance() {
        let (model, initial) = fodo3d_model();
        let adv = model.period_map(initial, -0.9).unwrap();
        let sigma = adv.phase_x.to_degrees();
        assert!((sigma - 20.0).abs() < 0.5, "σ = {sigma}°");
    }

    #[test]
    fn test_solution_grid_covers_range() {
        let (model, initial) = fodo3d_model();
        let sol = model.solve(initial, -0.9, 0.9, 0.0072).unwrap();
        assert_eq!(sol.len(), 251);
        assert!((sol.z_lower() + 0.9).abs() < 1e-12);
        assert!((sol.z_upper() - 0.9).abs() < 1e-9);
        assert_eq!(sol.state(0), initial);
        assert!(sol.max_radius() < 0.03445);
    }

    #[test]
    fn test_uneven_range_rounds_up() {
        let (model, initial) = fodo3d_model();
        let sol = model.solve(initial, 0.0, 0.1, 0.03).unwrap();
        assert_eq!(sol.len(), 5);
        assert!(sol.z_upper() >= 0.1);
    }

    #[test]
    fn test_zero_current_drift_is_ballistic() {
        let lattice = Lattice::new(1.0, 0.0).unwrap();
        let model = EnvelopeModel {
            lattice,
            inv_rigidity: 1.0,
            perveance: 0.0,
            emittance_x: 1e-9,
            emittance_y: 1e-9,
            max_step: 0.01,
        };
        let start = EnvelopeState::new(0.01, 0.001, 0.01, -0.001);
        let end = model.advance(start, 0.0, 0.5).unwrap().state;
        assert!((end.a - 0.0105).abs() < 1e-9);
        assert!((end.b - 0.0095).abs() < 1e-9);
    }

    #[test]
    fn test_collapse_is_reported() {
        let (model, _) = fodo3d_model();
        let model = model.with_emittance(1e-12, 1e-12).with_perveance(0.0);
        let start = EnvelopeState::new(1e-3, -1.0, 1e-3, -1.0);
        let err = model.advance(start, 0.0, 0.72).unwrap_err();
        assert!(matches!(err, BeamError::SolverDiverged { .. }));
    }

    #[test]
    fn test_rejects_unphysical_start() {
        let (model, _) = fodo3d_model();
        let err = model
            .advance(EnvelopeState::new(-1e-3, 0.0, 1e-3, 0.0), 0.0, 0.1)
            .unwrap_err();
        assert!(matches!(err, BeamError::PhysicsViolation(_)));
    }
}
