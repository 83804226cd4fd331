// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Envelope Package
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Built-in `env` package: the KV envelope stepped through the lattice,
//! one envelope step (`envelope.dz_m`) per engine step.

use crate::engine::{Engine, Package};
use beam_core::envelope::EnvelopeModel;
use beam_core::setup::RunSetup;
use beam_diagnostics::windows::{Moments, WindowSet};
use beam_types::config::SimulationConfig;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::EnvelopeState;

struct EnvelopeRun {
    setup: RunSetup,
    model: EnvelopeModel,
    state: EnvelopeState,
    z: f64,
    z_end: f64,
    dz: f64,
    step: usize,
    time: f64,
    phase_x: f64,
    phase_y: f64,
}

#[derive(Default)]
pub struct EnvelopeEngine {
    run: Option<EnvelopeRun>,
}

impl EnvelopeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self) -> BeamResult<&EnvelopeRun> {
        self.run
            .as_ref()
            .ok_or_else(|| BeamError::Engine("envelope engine used before generate".to_string()))
    }

    pub fn setup(&self) -> Option<&RunSetup> {
        self.run.as_ref().map(|r| &r.setup)
    }

    /// Accumulated depressed phase advance [rad].
    pub fn phase_advance(&self) -> Option<(f64, f64)> {
        self.run.as_ref().map(|r| (r.phase_x, r.phase_y))
    }
}

impl Engine for EnvelopeEngine {
    fn package(&self) -> Package {
        Package::Envelope
    }

    fn generate(&mut self, config: &SimulationConfig) -> BeamResult<()> {
        if self.run.is_some() {
            return Err(BeamError::Engine("generate called twice".to_string()));
        }
        let setup = RunSetup::from_config(config)?;
        let model = setup.envelope_model()?;
        let env = &config.envelope;
        log::info!(
            "env package generated: z = [{}, {}], dz = {} m",
            env.z_lower_m,
            env.z_upper_m,
            env.dz_m
        );
        self.run = Some(EnvelopeRun {
            state: setup.initial,
            setup,
            model,
            z: env.z_lower_m,
            z_end: env.z_upper_m,
            dz: env.dz_m,
            step: 0,
            time: 0.0,
            phase_x: 0.0,
            phase_y: 0.0,
        });
        Ok(())
    }

    fn step(&mut self) -> BeamResult<()> {
        let run = self
            .run
            .as_mut()
            .ok_or_else(|| BeamError::Engine("step called before generate".to_string()))?;
        let remaining = run.z_end - run.z;
        if remaining <= 1e-12 * run.dz {
            return Err(BeamError::Engine(format!(
                "envelope range exhausted at z = {}",
                run.z
            )));
        }
        let h = run.dz.min(remaining);
        let adv = run.model.advance(run.state, run.z, run.z + h)?;
        run.state = adv.state;
        run.phase_x += adv.phase_x;
        run.phase_y += adv.phase_y;
        run.z += h;
        run.step += 1;
        run.time += h / run.setup.beam.velocity_m_s;
        Ok(())
    }

    fn is_generated(&self) -> bool {
        self.run.is_some()
    }

    fn step_index(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.step)
    }

    fn time(&self) -> f64 {
        self.run.as_ref().map_or(0.0, |r| r.time)
    }

    fn beam_frame_z(&self) -> f64 {
        self.run.as_ref().map_or(0.0, |r| r.z)
    }

    fn is_finished(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|r| r.z_end - r.z <= 1e-12 * r.dz)
    }

    fn envelope(&self) -> Option<EnvelopeState> {
        self.run.as_ref().map(|r| r.state)
    }

    /// The envelope is a single transverse slice; every window sees it.
    fn moments(&self, windows: &WindowSet) -> BeamResult<Vec<Moments>> {
        let run = self.run()?;
        let beam = &run.setup.beam;
        let s = run.state;
        let bg = beam.beta * beam.gamma;
        let (ex, ey) = (beam.emittance_x, beam.emittance_y);
        let slice = Moments {
            count: 0,
            x_mean: 0.0,
            y_mean: 0.0,
            x_rms: 0.5 * s.a,
            y_rms: 0.5 * s.b,
            xp_rms: 0.5 * (s.ap * s.ap + ex * ex / (s.a * s.a)).sqrt(),
            yp_rms: 0.5 * (s.bp * s.bp + ey * ey / (s.b * s.b)).sqrt(),
            emittance_x: ex,
            emittance_y: ey,
            emittance_nx: ex * bg,
            emittance_ny: ey * bg,
            vz_mean: beam.velocity_m_s,
            line_charge: beam.line_charge(),
            current: beam.current_a,
        };
        Ok(vec![slice; windows.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_before_generate_fails() {
        let mut engine = EnvelopeEngine::new();
        assert!(matches!(engine.step(), Err(BeamError::Engine(_))));
        assert_eq!(engine.step_index(), 0);
    }

    #[test]
    fn test_generate_twice_fails() {
        let cfg = SimulationConfig::fodo3d();
        let mut engine = EnvelopeEngine::new();
        engine.generate(&cfg).unwrap();
        assert!(matches!(engine.generate(&cfg), Err(BeamError::Engine(_))));
    }

    #[test]
    fn test_steps_advance_dz() {
        let cfg = SimulationConfig::fodo3d();
        let mut engine = EnvelopeEngine::new();
        engine.generate(&cfg).unwrap();
        assert_eq!(engine.envelope().unwrap().a, cfg.beam.a0_m);
        for _ in 0..10 {
            engine.step().unwrap();
        }
        assert_eq!(engine.step_index(), 10);
        assert!((engine.beam_frame_z() - (-0.9 + 10.0 * 0.0072)).abs() < 1e-12);
        let v = engine.setup().unwrap().beam.velocity_m_s;
        assert!((engine.time() * v - 0.072).abs() < 1e-12);
    }

    #[test]
    fn test_full_period_returns_to_match() {
        let cfg = SimulationConfig::fodo3d();
        let mut engine = EnvelopeEngine::new();
        engine.generate(&cfg).unwrap();
        let start = engine.envelope().unwrap();
        for _ in 0..100 {
            engine.step().unwrap();
        }
        let end = engine.envelope().unwrap();
        assert!(start.mismatch(&end) < 5e-3);
        let (sx, _) = engine.phase_advance().unwrap();
        assert!((sx.to_degrees() - 20.0).abs() < 0.5);
    }

    #[test]
    fn test_range_exhausts() {
        let mut cfg = SimulationConfig::fodo3d();
        cfg.envelope.z_upper_m = cfg.envelope.z_lower_m + 2.5 * cfg.envelope.dz_m;
        let mut engine = EnvelopeEngine::new();
        engine.generate(&cfg).unwrap();
        for _ in 0..3 {
            engine.step().unwrap();
        }
        assert!(engine.is_finished());
        assert!(engine.step().is_err());
    }
}
