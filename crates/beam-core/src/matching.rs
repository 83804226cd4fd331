// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Matching Calculator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Matched beam construction for a FODO channel.
//!
//! Three solves, each usable on its own:
//! - quadrupole gradient from the undepressed phase advance σ0,
//! - matched envelope `(a, a', b, b')` at a given position, by Newton on
//!   the periodicity residual with current continuation,
//! - emittance giving a target depressed phase advance σ.
//!
//! Malformed input is reported as `PhysicsViolation`; targets that admit
//! no matched beam as `NoMatchedSolution`.

use crate::envelope::{Advance, EnvelopeModel};
use crate::lattice::Lattice;
use crate::species::DerivedBeam;
use crate::transfer::{
    period_half_trace, period_matrix, undepressed_phase_advance, CourantSnyder, Plane,
};
use beam_math::linalg::solve_dense;
use beam_math::roots::{scan_for_bracket, solve_bracketed, Bracket, Root, RootConfig};
use beam_types::config::MatchingConfig;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{EnvelopeState, MatchedBeam};
use ndarray::{Array1, Array2};

/// Cells in the gradient scan over the first stability band.
const GRADIENT_SCAN_POINTS: usize = 800;
/// Upper end of the scanned focusing strength, in units of `1/(hlp·L)`.
const KAPPA_SCAN_LIMIT: f64 = 8.0;
/// Relative finite-difference step for the Newton Jacobian.
const JACOBIAN_STEP: f64 = 1e-7;
const MAX_DAMPING_HALVINGS: usize = 30;
const EMITTANCE_BRACKET_FACTOR: f64 = 4.0;
const MAX_BRACKET_EXPANSIONS: usize = 24;

/// Solver controls shared by the Newton and shooting loops.
#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub continuation_stages: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::from(&MatchingConfig::default())
    }
}

impl From<&MatchingConfig> for MatchSettings {
    fn from(cfg: &MatchingConfig) -> Self {
        MatchSettings {
            tolerance: cfg.tolerance,
            max_iterations: cfg.max_iterations,
            continuation_stages: cfg.continuation_stages.max(1),
        }
    }
}

/// A matched envelope and its periodicity diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeMatch {
    pub state: EnvelopeState,
    /// Depressed phase advance per period [rad]
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub residual: f64,
    pub iterations: usize,
}

impl EnvelopeMatch {
    /// Mean of the two planes [deg].
    pub fn sigma_deg(&self) -> f64 {
        0.5 * (self.sigma_x + self.sigma_y).to_degrees()
    }
}

/// σ0 must lie in (0°, 180°), the first stability band.
pub fn check_sigma0(sigma0_deg: f64) -> BeamResult<()> {
    if !sigma0_deg.is_finite() {
        return Err(BeamError::PhysicsViolation(format!(
            "σ0 must be finite, got {sigma0_deg}"
        )));
    }
    if sigma0_deg <= 0.0 || sigma0_deg >= 180.0 {
        return Err(BeamError::NoMatchedSolution(format!(
            "σ0 = {sigma0_deg}° is outside the stable band (0°, 180°)"
        )));
    }
    Ok(())
}

/// Bracketed refinement where a bracket that fails to converge means the
/// target has no matched solution. Errors raised by `f` itself pass through.
fn refine<F>(mut f: F, bracket: Bracket, cfg: RootConfig, what: &str) -> BeamResult<Root>
where
    F: FnMut(f64) -> BeamResult<f64>,
{
    let mut residual_failed = false;
    let result = solve_bracketed(
        |x| {
            f(x).map_err(|e| {
                residual_failed = true;
                e
            })
        },
        bracket,
        cfg,
    );
    match result {
        Err(BeamError::SolverDiverged { iteration, message }) if !residual_failed => {
            Err(BeamError::NoMatchedSolution(format!(
                "{what} refinement stalled after {iteration} iterations: {message}"
            )))
        }
        other => other,
    }
}

/// Space charge can only depress: σ must lie in (0, σ0).
pub fn check_sigma(sigma_deg: f64, sigma0_deg: f64) -> BeamResult<()> {
    if !sigma_deg.is_finite() {
        return Err(BeamError::PhysicsViolation(format!(
            "σ must be finite, got {sigma_deg}"
        )));
    }
    if sigma_deg <= 0.0 || sigma_deg >= sigma0_deg {
        return Err(BeamError::NoMatchedSolution(format!(
            "σ = {sigma_deg}° must lie in (0°, σ0 = {sigma0_deg}°)"
        )));
    }
    Ok(())
}

/// FODO matching calculator for one beam.
#[derive(Debug, Clone)]
pub struct MatchingCalculator {
    pub beam: DerivedBeam,
    pub half_period: f64,
    pub quad_length: f64,
    pub start: f64,
    /// Position where the matched envelope is reported [m]
    pub z_match: f64,
    /// Upper bound on the envelope RK4 step [m]
    pub max_step: f64,
    pub settings: MatchSettings,
}

impl MatchingCalculator {
    pub fn new(
        beam: DerivedBeam,
        half_period: f64,
        quad_length: f64,
        start: f64,
        z_match: f64,
        max_step: f64,
        settings: MatchSettings,
    ) -> BeamResult<Self> {
        // Geometry checks live in the lattice constructor.
        Lattice::fodo(half_period, quad_length, 1.0, start)?;
        if !z_match.is_finite() {
            return Err(BeamError::PhysicsViolation(format!(
                "matching position must be finite, got {z_match}"
            )));
        }
        if !max_step.is_finite() || max_step <= 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "envelope step must be finite and > 0, got {max_step}"
            )));
        }
        Ok(MatchingCalculator {
            beam,
            half_period,
            quad_length,
            start,
            z_match,
            max_step,
            settings,
        })
    }

    pub fn lattice(&self, gradient: f64) -> BeamResult<Lattice> {
        Lattice::fodo(self.half_period, self.quad_length, gradient, self.start)
    }

    fn model(&self, gradient: f64) -> BeamResult<EnvelopeModel> {
        EnvelopeModel::from_beam(&self.beam, self.lattice(gradient)?, self.max_step)
    }

    /// Undepressed phase advance [deg] at `gradient`, `None` if unstable.
    pub fn sigma0_deg(&self, gradient: f64) -> BeamResult<Option<f64>> {
        let lattice = self.lattice(gradient)?;
        Ok(undepressed_phase_advance(&lattice, self.beam.inverse_rigidity(), Plane::X)
            .map(f64::to_degrees))
    }

    /// Gradient magnitude [T/m] giving undepressed phase advance `sigma0_deg`.
    pub fn solve_gradient(&self, sigma0_deg: f64) -> BeamResult<f64> {
        check_sigma0(sigma0_deg)?;
        let kappa_max = KAPPA_SCAN_LIMIT / (self.half_period * self.quad_length);
        let g_max = kappa_max * self.beam.rigidity_t_m;
        let g_min = g_max / GRADIENT_SCAN_POINTS as f64;

        // tr(M)/2 runs from 1 down through -1 across the first band and
        // stays continuous past the edge, unlike σ0 itself.
        let cos_target = sigma0_deg.to_radians().cos();
        let residual = |g: f64| -> BeamResult<f64> {
            let lattice = self.lattice(g)?;
            Ok(period_half_trace(&lattice, self.beam.inverse_rigidity(), Plane::X) - cos_target)
        };

        let bracket = scan_for_bracket(|g| residual(g).map(Some), g_min, g_max, GRADIENT_SCAN_POINTS)?
            .ok_or_else(|| {
                BeamError::NoMatchedSolution(format!(
                    "no gradient below {g_max:.4} T/m reaches σ0 = {sigma0_deg}°"
                ))
            })?;

        let root = refine(
            residual,
            bracket,
            RootConfig {
                x_tol: 1e-13,
                f_tol: 1e-13,
                max_iters: 200,
            },
            "gradient",
        )?;
        log::info!(
            "gradient {:.10} T/m gives σ0 = {sigma0_deg}° ({} refinements)",
            root.x,
            root.iterations
        );
        Ok(root.x)
    }

    /// Zero-current matched envelope from the Courant–Snyder functions.
    pub fn courant_snyder_seed(&self, model: &EnvelopeModel) -> BeamResult<EnvelopeState> {
        let seed = |plane: Plane, emittance: f64| -> BeamResult<(f64, f64)> {
            let m = period_matrix(&model.lattice, model.inv_rigidity, plane, self.z_match);
            CourantSnyder::from_matrix(&m)
                .map(|cs| cs.envelope(emittance))
                .ok_or_else(|| {
                    BeamError::NoMatchedSolution(format!(
                        "single-particle motion in {plane:?} is unstable"
                    ))
                })
        };
        let (a, ap) = seed(Plane::X, model.emittance_x)?;
        // Same lattice in y, opposite focusing sign.
        let (b, bp) = seed(Plane::Y, model.emittance_y)?;
        Ok(EnvelopeState::new(a, ap, b, bp))
    }

    /// Matched envelope for `model` at `z_match`.
    ///
    /// A `guess` is tried first with the full current; if Newton fails from
    /// there the perveance is ramped from zero in
    /// `continuation_stages` steps starting at the Courant–Snyder seed.
    pub fn match_model(&self, model: &EnvelopeModel, guess: Option<EnvelopeState>) -> BeamResult<EnvelopeMatch> {
        if let Some(guess) = guess.filter(EnvelopeState::is_physical) {
            match self.newton(model, guess) {
                Ok(found) => return Ok(found),
                Err(e) if e.is_derivation_failure() => {
                    log::debug!("warm start failed ({e}), falling back to continuation");
                }
                Err(e) => return Err(e),
            }
        }

        let mut state = self.courant_snyder_seed(&model.with_perveance(0.0))?;
        let stages = self.settings.continuation_stages;
        let mut last = None;
        let mut total_iterations = 0;
        for stage in 1..=stages {
            let fraction = stage as f64 / stages as f64;
            let staged = model.with_perveance(model.perveance * fraction);
            let found = self.newton(&staged, state).map_err(|e| match e {
                BeamError::SolverDiverged { iteration, message } => BeamError::NoMatchedSolution(
                    format!("continuation stage {stage}/{stages} diverged at iteration {iteration}: {message}"),
                ),
                other => other,
            })?;
            log::debug!(
                "continuation {stage}/{stages}: a = {:.6e}, b = {:.6e}, σ = {:.4}°",
                found.state.a,
                found.state.b,
                found.sigma_deg()
            );
            total_iterations += found.iterations;
            state = found.state;
            last = Some(found);
        }
        let mut found = last.ok_or_else(|| BeamError::NoMatchedSolution("no continuation stages".to_string()))?;
        found.iterations = total_iterations;
        Ok(found)
    }

    /// Matched envelope at `gradient` for the calculator's beam.
    pub fn match_envelope(&self, gradient: f64, guess: Option<EnvelopeState>) -> BeamResult<EnvelopeMatch> {
        let model = self.model(gradient)?;
        let found = self.match_model(&model, guess)?;
        log::info!(
            "matched envelope at z = {}: a = {:.6} mm, b = {:.6} mm, σ = {:.4}°",
            self.z_match,
            found.state.a * 1e3,
            found.state.b * 1e3,
            found.sigma_deg()
        );
        Ok(found)
    }

    /// Newton iteration on `Φ(x) − x` with a finite-difference Jacobian.
    fn newton(&self, model: &EnvelopeModel, initial: EnvelopeState) -> BeamResult<EnvelopeMatch> {
        let tol = self.settings.tolerance;
        let mut x = initial;
        let mut image = model.period_map(x, self.z_match)?;

        for iter in 0..=self.settings.max_iterations {
            let residual = x.mismatch(&image.state);
            if !residual.is_finite() {
                break;
            }
            if residual <= tol {
                return Ok(finish(x, &image, residual, iter));
            }
            if iter == self.settings.max_iterations {
                break;
            }

            let xv = x.to_array();
            let fx = residual_vector(&xv, &image.state.to_array());
            let mut jac = Array2::<f64>::zeros((4, 4));
            for j in 0..4 {
                let d = JACOBIAN_STEP * xv[j].abs().max(1e-3);
                let mut shifted = xv;
                shifted[j] += d;
                let img = model.period_map(EnvelopeState::from_array(shifted), self.z_match)?;
                let f_shift = residual_vector(&shifted, &img.state.to_array());
                for i in 0..4 {
                    jac[[i, j]] = (f_shift[i] - fx[i]) / d;
                }
            }
            let rhs = Array1::from_iter(fx.iter().map(|v| -v));
            let delta = solve_dense(&jac, &rhs).map_err(|e| BeamError::SolverDiverged {
                iteration: iter,
                message: format!("singular Newton system: {e}"),
            })?;

            // Halve the step until the trial state stays physical and maps.
            let mut lambda = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_DAMPING_HALVINGS {
                let trial =
                    EnvelopeState::from_array(std::array::from_fn(|i| xv[i] + lambda * delta[i]));
                if trial.is_physical() {
                    if let Ok(img) = model.period_map(trial, self.z_match) {
                        accepted = Some((trial, img));
                        break;
                    }
                }
                lambda *= 0.5;
            }
            let Some((trial, img)) = accepted else {
                return Err(BeamError::SolverDiverged {
                    iteration: iter,
                    message: "no physical Newton step after damping".to_string(),
                });
            };

            let step_size = (0..4)
                .map(|i| (trial.to_array()[i] - xv[i]).abs() / xv[i].abs().max(1e-3))
                .fold(0.0_f64, f64::max);
            x = trial;
            image = img;
            // Round-off floor: the step no longer moves the state.
            if step_size <= 16.0 * f64::EPSILON {
                let residual = x.mismatch(&image.state);
                if residual <= tol.max(1e-9) {
                    return Ok(finish(x, &image, residual, iter + 1));
                }
            }
        }

        Err(BeamError::SolverDiverged {
            iteration: self.settings.max_iterations,
            message: format!(
                "periodicity residual {:.3e} above tolerance {tol:.1e}",
                x.mismatch(&image.state)
            ),
        })
    }

    /// Emittance (x plane; the y/x ratio is kept) whose matched envelope
    /// has depressed phase advance `sigma_deg` at `gradient`.
    pub fn solve_emittance(
        &self,
        gradient: f64,
        sigma_deg: f64,
        guess: Option<EnvelopeState>,
    ) -> BeamResult<(f64, EnvelopeMatch)> {
        let sigma0 = self.sigma0_deg(gradient)?.ok_or_else(|| {
            BeamError::NoMatchedSolution(format!("lattice unstable at {gradient} T/m"))
        })?;
        check_sigma(sigma_deg, sigma0)?;

        let base = self.model(gradient)?;
        let ratio = base.emittance_y / base.emittance_x;
        let mut warm = guess;
        let mut residual_at = |ln_eps: f64| -> BeamResult<f64> {
            let eps = ln_eps.exp();
            let model = base.with_emittance(eps, eps * ratio);
            let found = self.match_model(&model, warm)?;
            warm = Some(found.state);
            Ok(found.sigma_deg() - sigma_deg)
        };

        let x0 = base.emittance_x.ln();
        let f0 = residual_at(x0)?;
        let (ln_eps, refinements) = if f0 == 0.0 {
            (x0, 0)
        } else {
            // σ grows with ε: too small a σ needs a larger emittance.
            let direction = if f0 < 0.0 { 1.0 } else { -1.0 };
            let step = EMITTANCE_BRACKET_FACTOR.ln() * direction;
            let (mut x_prev, mut f_prev) = (x0, f0);
            let mut bracket = None;
            for _ in 0..MAX_BRACKET_EXPANSIONS {
                let x = x_prev + step;
                let f = residual_at(x)?;
                if f.signum() != f_prev.signum() {
                    bracket = Some(if x < x_prev {
                        Bracket { lo: x, hi: x_prev, f_lo: f, f_hi: f_prev }
                    } else {
                        Bracket { lo: x_prev, hi: x, f_lo: f_prev, f_hi: f }
                    });
                    break;
                }
                x_prev = x;
                f_prev = f;
            }
            let bracket = bracket.ok_or_else(|| {
                BeamError::NoMatchedSolution(format!("no emittance brackets σ = {sigma_deg}°"))
            })?;
            let root = refine(
                &mut residual_at,
                bracket,
                RootConfig {
                    x_tol: 1e-12,
                    f_tol: 1e-9,
                    max_iters: 100,
                },
                "emittance",
            )?;
            (root.x, root.iterations)
        };

        let eps = ln_eps.exp();
        let model = base.with_emittance(eps, eps * ratio);
        let found = self.match_model(&model, warm)?;
        log::info!(
            "emittance {:.6e} m·rad gives σ = {:.4}° ({refinements} refinements)",
            eps,
            found.sigma_deg()
        );
        Ok((eps, found))
    }

    /// Full chain driven by `cfg`: gradient (solved or `fixed_gradient`),
    /// optional emittance shooting, then the matched envelope.
    pub fn run(
        &self,
        cfg: &MatchingConfig,
        fixed_gradient: Option<f64>,
        guess: Option<EnvelopeState>,
    ) -> BeamResult<MatchedBeam> {
        let gradient = match fixed_gradient {
            Some(g) if !cfg.solve_gradient => g,
            _ => self.solve_gradient(cfg.sigma0_deg)?,
        };
        let sigma0_deg = self.sigma0_deg(gradient)?.ok_or_else(|| {
            BeamError::NoMatchedSolution(format!("lattice unstable at {gradient} T/m"))
        })?;

        let (emittance, found) = match (cfg.solve_emittance, cfg.sigma_deg) {
            (true, Some(sigma)) => self.solve_emittance(gradient, sigma, guess)?,
            (true, None) => {
                return Err(BeamError::ConfigError(
                    "emittance solve requested without a target σ".to_string(),
                ))
            }
            (false, _) => (self.beam.emittance_x, self.match_envelope(gradient, guess)?),
        };

        Ok(MatchedBeam {
            gradient_t_per_m: gradient,
            initial: found.state,
            z_match_m: self.z_match,
            emittance_m_rad: emittance,
            sigma0_deg,
            sigma_x_deg: found.sigma_x.to_degrees(),
            sigma_y_deg: found.sigma_y.to_degrees(),
            residual: found.residual,
            newton_iterations: found.iterations,
        })
    }
}

fn residual_vector(x: &[f64; 4], image: &[f64; 4]) -> [f64; 4] {
    std::array::from_fn(|i| image[i] - x[i])
}

fn finish(state: EnvelopeState, image: &Advance, residual: f64, iterations: usize) -> EnvelopeMatch {
    EnvelopeMatch {
        state,
        sigma_x: image.phase_x,
        sigma_y: image.phase_y,
        residual,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beam_types::config::SimulationConfig;

    fn calculator() -> MatchingCalculator {
        let cfg = SimulationConfig::fodo3d();
        let beam = DerivedBeam::derive(&cfg.beam).unwrap();
        MatchingCalculator::new(
            beam,
            cfg.lattice.half_period_m,
            cfg.lattice.quad_length_m,
            cfg.lattice.start_m,
            cfg.envelope.z_lower_m,
            cfg.envelope.dz_m,
            MatchSettings::from(&cfg.matching),
        )
        .unwrap()
    }

    #[test]
    fn test_gradient_for_72_degrees() {
        let calc = calculator();
        let g = calc.solve_gradient(72.0).unwrap();
        let expected = 0.93230106124518164 / 0.11;
        assert!((g - expected).abs() / expected < 5e-3, "G = {g}, expected ≈ {expected}");
        let sigma0 = calc.sigma0_deg(g).unwrap().unwrap();
        assert!((sigma0 - 72.0).abs() < 1e-8);
    }

    #[test]
    fn test_gradient_increases_with_sigma0() {
        let calc = calculator();
        let g60 = calc.solve_gradient(60.0).unwrap();
        let g90 = calc.solve_gradient(90.0).unwrap();
        assert!(g60 < g90);
    }

    #[test]
    fn test_gradient_near_band_edge() {
        let calc = calculator();
        let g72 = calc.solve_gradient(72.0).unwrap();
        let mut previous = g72;
        for target in [175.0, 179.0, 179.9] {
            let g = calc.solve_gradient(target).unwrap();
            let sigma0 = calc.sigma0_deg(g).unwrap().unwrap();
            assert!((sigma0 - target).abs() < 1e-6, "σ0 = {sigma0}° for {target}°");
            assert!(g > previous);
            previous = g;
        }
    }

    #[test]
    fn test_stalled_refinement_has_no_solution() {
        let bracket = Bracket { lo: 0.0, hi: 1.0, f_lo: -0.3, f_hi: 0.7 };
        let cfg = RootConfig { x_tol: 1e-15, f_tol: 1e-15, max_iters: 1 };
        let err = refine(|x| Ok(x * x * x - 0.3), bracket, cfg, "test").unwrap_err();
        assert!(matches!(err, BeamError::NoMatchedSolution(_)), "{err:?}");

        // Failures of the residual itself keep their class
        let err = refine(
            |_| Err(BeamError::SolverDiverged { iteration: 3, message: "collapsed".into() }),
            bracket,
            cfg,
            "test",
        )
        .unwrap_err();
        assert!(matches!(err, BeamError::SolverDiverged { iteration: 3, .. }));
    }

    #[test]
    fn test_sigma0_outside_band_has_no_solution() {
        let calc = calculator();
        for bad in [0.0, -10.0, 180.0, 200.0] {
            assert!(matches!(
                calc.solve_gradient(bad),
                Err(BeamError::NoMatchedSolution(_))
            ));
        }
        assert!(matches!(
            calc.solve_gradient(f64::NAN),
            Err(BeamError::PhysicsViolation(_))
        ));
    }

    #[test]
    fn test_matched_envelope_fodo3d() {
        let calc = calculator();
        let g = 0.93230106124518164 / 0.11;
        let found = calc.match_envelope(g, None).unwrap();
        let s = found.state;
        assert!((s.a - 8.76e-3).abs() / 8.76e-3 < 1e-2, "a = {}", s.a);
        assert!((s.b - 15.6e-3).abs() / 15.6e-3 < 1e-2, "b = {}", s.b);
        assert!(s.ap.abs() < 1e-6 && s.bp.abs() < 1e-6);
        assert!((found.sigma_deg() - 20.0).abs() < 0.1, "σ = {}", found.sigma_deg());
        assert!(found.residual < 1e-8);
    }

    #[test]
    fn test_warm_start_agrees_with_continuation() {
        let calc = calculator();
        let g = 0.93230106124518164 / 0.11;
        let cold = calc.match_envelope(g, None).unwrap();
        let guess = EnvelopeState::new(8.7e-3, 0.0, 15.5e-3, 0.0);
        let warm = calc.match_envelope(g, Some(guess)).unwrap();
        assert!(cold.state.mismatch(&warm.state) < 1e-7);
    }

    #[test]
    fn test_zero_current_match_is_courant_snyder() {
        let mut calc = calculator();
        calc.beam = calc.beam.with_current_fraction(0.0);
        let g = 0.93230106124518164 / 0.11;
        let model = calc.model(g).unwrap();
        let seed = calc.courant_snyder_seed(&model).unwrap();
        let found = calc.match_model(&model, None).unwrap();
        assert!(seed.mismatch(&found.state) < 1e-4);
        assert!((found.sigma_deg() - 72.0).abs() < 0.1);
    }

    #[test]
    fn test_solve_emittance_for_20_degrees() {
        let calc = calculator();
        let g = 0.93230106124518164 / 0.11;
        let (eps, found) = calc.solve_emittance(g, 20.0, None).unwrap();
        assert!((eps - 6.247e-5).abs() / 6.247e-5 < 1e-2, "ε = {eps}");
        assert!((found.sigma_deg() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_sigma_not_depressed_has_no_solution() {
        let calc = calculator();
        let g = 0.93230106124518164 / 0.11;
        assert!(matches!(
            calc.solve_emittance(g, 75.0, None),
            Err(BeamError::NoMatchedSolution(_))
        ));
        assert!(matches!(
            calc.solve_emittance(g, 0.0, None),
            Err(BeamError::NoMatchedSolution(_))
        ));
    }

    #[test]
    fn test_run_full_chain() {
        let calc = calculator();
        let cfg = MatchingConfig {
            sigma_deg: Some(20.0),
            solve_gradient: true,
            solve_emittance: true,
            ..MatchingConfig::default()
        };
        let matched = calc.run(&cfg, None, None).unwrap();
        assert!((matched.sigma0_deg - 72.0).abs() < 1e-6);
        assert!((0.5 * (matched.sigma_x_deg + matched.sigma_y_deg) - 20.0).abs() < 1e-5);
        assert!((matched.initial.a - 8.76e-3).abs() / 8.76e-3 < 1e-2);
        assert!(matched.residual < 1e-8);
    }

    #[test]
    fn test_malformed_geometry_rejected() {
        let cfg = SimulationConfig::fodo3d();
        let beam = DerivedBeam::derive(&cfg.beam).unwrap();
        let err = MatchingCalculator::new(beam, 0.36, 0.4, 0.0, -0.9, 0.0072, MatchSettings::default())
            .unwrap_err();
        assert!(matches!(err, BeamError::PhysicsViolation(_)));
    }
}
