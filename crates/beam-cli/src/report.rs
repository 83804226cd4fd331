// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Run Report
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! JSON summary written at the end of a run.

use beam_control::runner::RunReport;
use beam_core::species::DerivedBeam;
use beam_diagnostics::history::MomentHistory;
use beam_diagnostics::windows::Moments;
use beam_types::config::RunLabels;
use beam_types::state::{EnvelopeSolution, EnvelopeState, Grid3D, MatchedBeam, ParticleSet};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GridSummary {
    pub cells: [usize; 3],
    pub spacing_m: [f64; 3],
    pub x_range_m: [f64; 2],
    pub y_range_m: [f64; 2],
    pub z_range_m: [f64; 2],
}

impl GridSummary {
    pub fn from_grid(grid: &Grid3D) -> Self {
        GridSummary {
            cells: [grid.nx, grid.ny, grid.nz],
            spacing_m: [grid.dx, grid.dy, grid.dz],
            x_range_m: [grid.x[0], grid.x[grid.nx]],
            y_range_m: [grid.y[0], grid.y[grid.ny]],
            z_range_m: [grid.z[0], grid.z[grid.nz]],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnvelopeSummary {
    pub samples: usize,
    pub z_range_m: [f64; 2],
    pub max_radius_m: f64,
    pub initial: EnvelopeState,
    pub last: EnvelopeState,
}

impl EnvelopeSummary {
    pub fn from_solution(sol: &EnvelopeSolution) -> Option<Self> {
        let n = sol.len();
        if n == 0 {
            return None;
        }
        Some(EnvelopeSummary {
            samples: n,
            z_range_m: [sol.z_lower(), sol.z_upper()],
            max_radius_m: sol.max_radius(),
            initial: sol.state(0),
            last: sol.state(n - 1),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LoadSummary {
    pub particles: usize,
    pub weight: f64,
    pub charge_c: f64,
    /// Moments right after loading, window 0 first
    pub windows: Vec<Moments>,
}

impl LoadSummary {
    pub fn new(particles: &ParticleSet, windows: Vec<Moments>) -> Self {
        LoadSummary {
            particles: particles.len(),
            weight: particles.weight,
            charge_c: particles.charge_c,
            windows,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FodoReport {
    pub labels: RunLabels,
    pub beam: DerivedBeam,
    pub gradient_t_per_m: f64,
    pub sigma0_deg: f64,
    pub dt_s: f64,
    pub matched: Option<MatchedBeam>,
    pub run: RunReport,
    pub history: MomentHistory,
    pub grid: GridSummary,
    pub envelope: Option<EnvelopeSummary>,
    pub load: LoadSummary,
}
