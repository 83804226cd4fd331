// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Run Setup
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Resolve a `SimulationConfig` into everything a run needs before the
//! first step: derived beam, lattice, matched envelope and time step.

use crate::envelope::EnvelopeModel;
use crate::lattice::Lattice;
use crate::matching::{MatchSettings, MatchingCalculator};
use crate::species::DerivedBeam;
use crate::transfer::{undepressed_phase_advance, Plane};
use beam_types::config::SimulationConfig;
use beam_types::constants::FODO3D_GRADIENT_INTEGRAL;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{EnvelopeSolution, EnvelopeState, MatchedBeam};

#[derive(Debug, Clone)]
pub struct RunSetup {
    pub beam: DerivedBeam,
    pub gradient_t_per_m: f64,
    pub lattice: Lattice,
    /// Present when any matching step ran
    pub matched: Option<MatchedBeam>,
    /// Envelope at `envelope.z_lower_m`
    pub initial: EnvelopeState,
    pub dt_s: f64,
    /// Undepressed phase advance per period [rad]
    pub sigma0_rad: f64,
    pub max_step: f64,
}

impl RunSetup {
    pub fn from_config(config: &SimulationConfig) -> BeamResult<Self> {
        config.validate()?;
        let mut beam = DerivedBeam::derive(&config.beam)?;
        let lat_cfg = &config.lattice;
        let m = &config.matching;
        let calculator = MatchingCalculator::new(
            beam.clone(),
            lat_cfg.half_period_m,
            lat_cfg.quad_length_m,
            lat_cfg.start_m,
            config.envelope.z_lower_m,
            config.envelope.dz_m,
            MatchSettings::from(m),
        )?;

        let configured_initial = EnvelopeState::new(
            config.beam.a0_m,
            config.beam.ap0,
            config.beam.b0_m,
            config.beam.bp0,
        );

        let (gradient, matched, initial) = if m.solve_envelope || m.solve_emittance {
            let matched = calculator.run(m, lat_cfg.gradient_t_per_m, Some(configured_initial))?;
            let emittance_y = matched.emittance_m_rad * beam.emittance_y / beam.emittance_x;
            beam = beam
                .with_emittance(matched.emittance_m_rad, emittance_y)
                .with_radii(matched.initial.a, matched.initial.b);
            (matched.gradient_t_per_m, Some(matched), matched.initial)
        } else {
            let gradient = match lat_cfg.gradient_t_per_m {
                Some(g) if !m.solve_gradient => g,
                _ => calculator.solve_gradient(m.sigma0_deg)?,
            };
            (gradient, None, configured_initial)
        };

        let lattice = Lattice::from_config(lat_cfg, gradient)?;
        let sigma0_rad = undepressed_phase_advance(&lattice, beam.inverse_rigidity(), Plane::X)
            .ok_or_else(|| {
                BeamError::NoMatchedSolution(format!(
                    "gradient {gradient} T/m gives no stable single-particle motion"
                ))
            })?;
        let dt_s = beam.time_step(config.envelope.tune_length_m, config.steps_per_period)?;

        log::info!(
            "setup: {} at {:.1} keV, I = {:.3} mA, G = {:.6} T/m, σ0 = {:.3}°, dt = {:.4e} s",
            beam.species.name,
            beam.ekin_ev * 1e-3,
            beam.current_a * 1e3,
            gradient,
            sigma0_rad.to_degrees(),
            dt_s
        );

        Ok(RunSetup {
            beam,
            gradient_t_per_m: gradient,
            lattice,
            matched,
            initial,
            dt_s,
            sigma0_rad,
            max_step: config.envelope.dz_m,
        })
    }

    pub fn envelope_model(&self) -> BeamResult<EnvelopeModel> {
        EnvelopeModel::from_beam(&self.beam, self.lattice.clone(), self.max_step)
    }

    /// Envelope sampled over the configured range.
    pub fn solve_envelope(&self, config: &SimulationConfig) -> BeamResult<EnvelopeSolution> {
        let env = &config.envelope;
        self.envelope_model()?
            .solve(self.initial, env.z_lower_m, env.z_upper_m, env.dz_m)
    }

    /// Smooth-focusing wavenumber `σ0 / period` [1/m].
    pub fn smooth_focusing_k0(&self) -> f64 {
        self.sigma0_rad / self.lattice.period()
    }
}

/// Matched beam for `config`: every solve it requests, and always the
/// matched envelope.
pub fn match_beam(config: &SimulationConfig) -> BeamResult<MatchedBeam> {
    config.validate()?;
    let beam = DerivedBeam::derive(&config.beam)?;
    let calculator = MatchingCalculator::new(
        beam,
        config.lattice.half_period_m,
        config.lattice.quad_length_m,
        config.lattice.start_m,
        config.envelope.z_lower_m,
        config.envelope.dz_m,
        MatchSettings::from(&config.matching),
    )?;
    calculator.run(&config.matching, config.lattice.gradient_t_per_m, None)
}

/// Gradient from the hand-tuned focusing integral `0.9323 T / L_q`.
pub fn fodo3d_gradient(quad_length_m: f64) -> f64 {
    FODO3D_GRADIENT_INTEGRAL / quad_length_m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_gradient_uses_config_envelope() {
        let cfg = SimulationConfig::fodo3d();
        let setup = RunSetup::from_config(&cfg).unwrap();
        assert!(setup.matched.is_none());
        assert_eq!(setup.gradient_t_per_m, fodo3d_gradient(0.11));
        assert_eq!(setup.initial.a, cfg.beam.a0_m);
        assert!((setup.sigma0_rad.to_degrees() - 72.0).abs() < 0.1);
        assert!((setup.dt_s * setup.beam.velocity_m_s - 0.0144).abs() < 1e-12);
    }

    #[test]
    fn test_solve_envelope_replaces_initial_state() {
        let mut cfg = SimulationConfig::fodo3d();
        cfg.matching.solve_envelope = true;
        let setup = RunSetup::from_config(&cfg).unwrap();
        let matched = setup.matched.unwrap();
        assert_eq!(setup.initial, matched.initial);
        assert!((setup.beam.a0_m - matched.initial.a).abs() < 1e-15);
        assert!((matched.initial.a - cfg.beam.a0_m).abs() / cfg.beam.a0_m < 1e-2);
    }

    #[test]
    fn test_missing_gradient_is_solved() {
        let mut cfg = SimulationConfig::fodo3d();
        cfg.lattice.gradient_t_per_m = None;
        let setup = RunSetup::from_config(&cfg).unwrap();
        let expected = fodo3d_gradient(0.11);
        assert!((setup.gradient_t_per_m - expected).abs() / expected < 5e-3);
    }

    #[test]
    fn test_envelope_solution_from_setup() {
        let cfg = SimulationConfig::fodo3d();
        let setup = RunSetup::from_config(&cfg).unwrap();
        let sol = setup.solve_envelope(&cfg).unwrap();
        assert_eq!(sol.len(), 251);
        // 2.5 periods over [-0.9, 0.9]: five symmetric half periods of 10°
        assert!((sol.phase_x.to_degrees() - 50.0).abs() < 1.5, "{}", sol.phase_x.to_degrees());
    }

    #[test]
    fn test_match_beam_fodo3d() {
        let matched = match_beam(&SimulationConfig::fodo3d()).unwrap();
        assert!((matched.initial.a - 8.76e-3).abs() / 8.76e-3 < 1e-2);
        assert!((matched.initial.b - 15.6e-3).abs() / 15.6e-3 < 1e-2);
        assert!((matched.sigma_x_deg - 20.0).abs() < 0.1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = SimulationConfig::fodo3d();
        cfg.beam.ekin_ev = -1.0;
        assert!(matches!(
            RunSetup::from_config(&cfg),
            Err(BeamError::ConfigError(_))
        ));
    }
}
