// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Plot Schedule
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Distance-based trigger: fires once each time the beam frame crosses
//! `z_start + k·z_period` inside `[z_start, z_end]`. A zero period
//! disables it.

use beam_types::config::PlotSchedule;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleTrigger {
    schedule: PlotSchedule,
    next: f64,
    fired: usize,
}

impl ScheduleTrigger {
    pub fn new(schedule: PlotSchedule) -> Self {
        ScheduleTrigger {
            schedule,
            next: schedule.z_start_m,
            fired: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.schedule.z_period_m > 0.0 && self.schedule.z_period_m.is_finite()
    }

    /// True if `z_beam` reached the next trigger point. Several crossed
    /// points in one call count as one firing.
    pub fn check(&mut self, z_beam: f64) -> bool {
        if !self.is_enabled() || z_beam < self.next || self.next > self.schedule.z_end_m {
            return false;
        }
        let period = self.schedule.z_period_m;
        let crossed = ((z_beam - self.next) / period).floor() + 1.0;
        self.next += crossed * period;
        self.fired += 1;
        true
    }

    pub fn fired(&self) -> usize {
        self.fired
    }

    pub fn next_z(&self) -> f64 {
        self.next
    }
}
