// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Moment Histories
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Time histories of window moments.
//!
//! Line charge and mean axial velocity are always recorded; the other
//! channels follow the configured flags.

use crate::windows::Moments;
use beam_types::config::{DiagnosticsConfig, HistoryFlags};
use beam_types::error::{BeamError, BeamResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryQuantity {
    LineCharge,
    VzMean,
    XRms,
    YRms,
    EmittanceNx,
    EmittanceNy,
    Current,
}

impl HistoryQuantity {
    pub fn extract(self, m: &Moments) -> f64 {
        match self {
            HistoryQuantity::LineCharge => m.line_charge,
            HistoryQuantity::VzMean => m.vz_mean,
            HistoryQuantity::XRms => m.x_rms,
            HistoryQuantity::YRms => m.y_rms,
            HistoryQuantity::EmittanceNx => m.emittance_nx,
            HistoryQuantity::EmittanceNy => m.emittance_ny,
            HistoryQuantity::Current => m.current,
        }
    }

    /// Channels selected by `flags`, always-on ones first.
    pub fn selected(flags: &HistoryFlags) -> Vec<HistoryQuantity> {
        let mut out = vec![HistoryQuantity::LineCharge, HistoryQuantity::VzMean];
        for (on, q) in [
            (flags.x_rms, HistoryQuantity::XRms),
            (flags.y_rms, HistoryQuantity::YRms),
            (flags.x_emittance_n, HistoryQuantity::EmittanceNx),
            (flags.y_emittance_n, HistoryQuantity::EmittanceNy),
            (flags.current, HistoryQuantity::Current),
        ] {
            if on {
                out.push(q);
            }
        }
        out
    }
}

/// One series per (quantity, window).
#[derive(Debug, Clone, Serialize)]
pub struct MomentHistory {
    period: usize,
    n_windows: usize,
    quantities: Vec<HistoryQuantity>,
    pub steps: Vec<usize>,
    pub times: Vec<f64>,
    pub z_beam: Vec<f64>,
    /// `series[q][w]` holds the samples of quantity `q` in window `w`
    series: Vec<Vec<Vec<f64>>>,
}

impl MomentHistory {
    pub fn new(flags: &HistoryFlags, period: usize, n_windows: usize) -> BeamResult<Self> {
        if period == 0 || n_windows == 0 {
            return Err(BeamError::ConfigError(format!(
                "history needs period >= 1 and at least one window, got {period}, {n_windows}"
            )));
        }
        let quantities = HistoryQuantity::selected(flags);
        let series = vec![vec![Vec::new(); n_windows]; quantities.len()];
        Ok(MomentHistory {
            period,
            n_windows,
            quantities,
            steps: Vec::new(),
            times: Vec::new(),
            z_beam: Vec::new(),
            series,
        })
    }

    pub fn from_config(cfg: &DiagnosticsConfig, n_windows: usize) -> BeamResult<Self> {
        Self::new(&cfg.history, cfg.history_period, n_windows)
    }

    pub fn is_due(&self, step: usize) -> bool {
        step % self.period == 0
    }

    pub fn quantities(&self) -> &[HistoryQuantity] {
        &self.quantities
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append one sample of every channel.
    pub fn record(&mut self, step: usize, time: f64, z_beam: f64, moments: &[Moments]) -> BeamResult<()> {
        if moments.len() != self.n_windows {
            return Err(BeamError::ConfigError(format!(
                "history expects {} windows, got {}",
                self.n_windows,
                moments.len()
            )));
        }
        self.steps.push(step);
        self.times.push(time);
        self.z_beam.push(z_beam);
        for (qi, q) in self.quantities.iter().enumerate() {
            for (w, m) in moments.iter().enumerate() {
                self.series[qi][w].push(q.extract(m));
            }
        }
        Ok(())
    }

    /// Samples of `quantity` in `window`, `None` if not recorded.
    pub fn series(&self, quantity: HistoryQuantity, window: usize) -> Option<&[f64]> {
        let qi = self.quantities.iter().position(|q| *q == quantity)?;
        self.series[qi].get(window).map(Vec::as_slice)
    }
}
