// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Simulation Runner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Drives an engine and its hooks: `generate` once, then `run(n)`.

use crate::engine::{Engine, Package};
use crate::hooks::{HookAction, StepHook};
use beam_types::config::SimulationConfig;
use beam_types::error::{BeamError, BeamResult};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopReason {
    pub hook: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub package: Package,
    pub steps_taken: usize,
    pub final_step: usize,
    pub time_s: f64,
    pub z_beam_m: f64,
    pub wall_time_ms: f64,
    pub stopped: Option<StopReason>,
    /// Engine ran out of steps
    pub finished: bool,
}

pub struct Simulation<E: Engine> {
    engine: E,
    hooks: Vec<Box<dyn StepHook>>,
    stopped: Option<StopReason>,
}

impl<E: Engine> Simulation<E> {
    pub fn new(engine: E) -> Self {
        Simulation {
            engine,
            hooks: Vec::new(),
            stopped: None,
        }
    }

    pub fn add_hook(&mut self, hook: Box<dyn StepHook>) {
        self.hooks.push(hook);
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn stopped(&self) -> Option<&StopReason> {
        self.stopped.as_ref()
    }

    /// Generate the engine, then give every hook its step-0 call.
    pub fn generate(&mut self, config: &SimulationConfig) -> BeamResult<()> {
        self.engine.generate(config)?;
        self.dispatch()
    }

    /// Call every hook; the first stop request wins. All hooks still run.
    fn dispatch(&mut self) -> BeamResult<()> {
        for hook in &mut self.hooks {
            if let HookAction::Stop(reason) = hook.after_step(&self.engine)? {
                log::info!("hook '{}' requested stop: {reason}", hook.name());
                if self.stopped.is_none() {
                    self.stopped = Some(StopReason {
                        hook: hook.name().to_string(),
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    /// Take up to `n` steps, ending early on a hook stop or when the
    /// engine is finished.
    pub fn run(&mut self, n: usize) -> BeamResult<RunReport> {
        if !self.engine.is_generated() {
            return Err(BeamError::Engine("run called before generate".to_string()));
        }
        let t_start = Instant::now();
        let mut taken = 0;
        while taken < n && self.stopped.is_none() && !self.engine.is_finished() {
            self.engine.step()?;
            taken += 1;
            self.dispatch()?;
        }
        let wall_time_ms = t_start.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "{} package: {taken} steps, t = {:.4e} s, z = {:.4} m",
            self.engine.package(),
            self.engine.time(),
            self.engine.beam_frame_z()
        );
        Ok(RunReport {
            package: self.engine.package(),
            steps_taken: taken,
            final_step: self.engine.step_index(),
            time_s: self.engine.time(),
            z_beam_m: self.engine.beam_frame_z(),
            wall_time_ms,
            stopped: self.stopped.clone(),
            finished: self.engine.is_finished(),
        })
    }
}
