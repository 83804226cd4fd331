// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Step Hooks
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Listeners invoked once after `generate` and after every step. Each
//! returns an explicit continue/stop decision.

use crate::engine::Engine;
use beam_diagnostics::history::MomentHistory;
use beam_diagnostics::schedule::ScheduleTrigger;
use beam_diagnostics::windows::WindowSet;
use beam_types::config::PlotSchedule;
use beam_types::error::BeamResult;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    Continue,
    Stop(String),
}

pub trait StepHook {
    fn name(&self) -> &str;

    fn after_step(&mut self, engine: &dyn Engine) -> BeamResult<HookAction>;
}

type Callback = Box<dyn FnMut(&dyn Engine) -> BeamResult<HookAction>>;

/// Runs a callback every `period` steps, counting the post-generate call
/// as step 0.
pub struct PeriodicHook {
    name: String,
    period: usize,
    callback: Callback,
    fired: usize,
}

impl PeriodicHook {
    pub fn new<F>(name: &str, period: usize, callback: F) -> Self
    where
        F: FnMut(&dyn Engine) -> BeamResult<HookAction> + 'static,
    {
        PeriodicHook {
            name: name.to_string(),
            period: period.max(1),
            callback: Box::new(callback),
            fired: 0,
        }
    }

    pub fn fired(&self) -> usize {
        self.fired
    }
}

impl StepHook for PeriodicHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn after_step(&mut self, engine: &dyn Engine) -> BeamResult<HookAction> {
        if engine.step_index() % self.period != 0 {
            return Ok(HookAction::Continue);
        }
        self.fired += 1;
        (self.callback)(engine)
    }
}

/// Runs a callback whenever the beam frame crosses the next point of a
/// distance schedule.
pub struct ScheduleHook {
    name: String,
    trigger: ScheduleTrigger,
    callback: Callback,
}

impl ScheduleHook {
    pub fn new<F>(name: &str, schedule: PlotSchedule, callback: F) -> Self
    where
        F: FnMut(&dyn Engine) -> BeamResult<HookAction> + 'static,
    {
        ScheduleHook {
            name: name.to_string(),
            trigger: ScheduleTrigger::new(schedule),
            callback: Box::new(callback),
        }
    }
}

impl StepHook for ScheduleHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn after_step(&mut self, engine: &dyn Engine) -> BeamResult<HookAction> {
        if self.trigger.check(engine.beam_frame_z()) {
            (self.callback)(engine)
        } else {
            Ok(HookAction::Continue)
        }
    }
}

/// Records window moments into a shared history when due.
pub struct HistoryHook {
    windows: WindowSet,
    history: Rc<RefCell<MomentHistory>>,
}

impl HistoryHook {
    pub fn new(windows: WindowSet, history: MomentHistory) -> Self {
        HistoryHook {
            windows,
            history: Rc::new(RefCell::new(history)),
        }
    }

    /// Shared handle for reading the history after the run.
    pub fn handle(&self) -> Rc<RefCell<MomentHistory>> {
        Rc::clone(&self.history)
    }
}

impl StepHook for HistoryHook {
    fn name(&self) -> &str {
        "history"
    }

    fn after_step(&mut self, engine: &dyn Engine) -> BeamResult<HookAction> {
        let step = engine.step_index();
        if !self.history.borrow().is_due(step) {
            return Ok(HookAction::Continue);
        }
        let moments = engine.moments(&self.windows)?;
        self.history
            .borrow_mut()
            .record(step, engine.time(), engine.beam_frame_z(), &moments)?;
        Ok(HookAction::Continue)
    }
}

/// Stops the run once the envelope reaches the pipe wall.
pub struct ApertureHook {
    pipe_radius: f64,
}

impl ApertureHook {
    pub fn new(pipe_radius: f64) -> Self {
        ApertureHook { pipe_radius }
    }
}

impl StepHook for ApertureHook {
    fn name(&self) -> &str {
        "aperture"
    }

    fn after_step(&mut self, engine: &dyn Engine) -> BeamResult<HookAction> {
        match engine.envelope() {
            Some(s) if s.a.max(s.b) >= self.pipe_radius => Ok(HookAction::Stop(format!(
                "envelope {:.3} mm reached pipe radius {:.3} mm at z = {:.4} m",
                s.a.max(s.b) * 1e3,
                self.pipe_radius * 1e3,
                engine.beam_frame_z()
            ))),
            _ => Ok(HookAction::Continue),
        }
    }
}
