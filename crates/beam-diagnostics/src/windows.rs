// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Z-Window Moments
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Longitudinal diagnostic windows and the particle moments inside them.
//!
//! All windows are positioned relative to the beam frame. Window 0 spans
//! the whole grid extent and is not user-settable.

use beam_types::config::DiagnosticsConfig;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::ParticleSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZWindow {
    pub z_min: f64,
    pub z_max: f64,
}

impl ZWindow {
    pub fn new(z_min: f64, z_max: f64) -> BeamResult<Self> {
        if !(z_min.is_finite() && z_max.is_finite()) || z_max <= z_min {
            return Err(BeamError::ConfigError(format!(
                "z window must satisfy min < max, got [{z_min}, {z_max}]"
            )));
        }
        Ok(ZWindow { z_min, z_max })
    }

    pub fn length(&self) -> f64 {
        self.z_max - self.z_min
    }

    /// Lab-frame bounds for a beam frame at `z_beam`.
    pub fn lab_bounds(&self, z_beam: f64) -> (f64, f64) {
        (self.z_min + z_beam, self.z_max + z_beam)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowSet {
    windows: Vec<ZWindow>,
}

impl WindowSet {
    /// Window 0 is `[grid_z_min, grid_z_max]`; user windows follow.
    pub fn from_config(cfg: &DiagnosticsConfig, grid_z_min: f64, grid_z_max: f64) -> BeamResult<Self> {
        let mut windows = vec![ZWindow::new(grid_z_min, grid_z_max)?];
        for w in &cfg.z_windows {
            windows.push(ZWindow::new(w[0], w[1])?);
        }
        log::debug!(
            "{} diagnostic windows, window 0 = [{grid_z_min}, {grid_z_max}]",
            windows.len()
        );
        Ok(WindowSet { windows })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&ZWindow> {
        self.windows.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZWindow> {
        self.windows.iter()
    }

    /// Moments in every window, window 0 first.
    pub fn moments(&self, particles: &ParticleSet, z_beam: f64, beta_gamma: f64) -> Vec<Moments> {
        self.windows
            .iter()
            .map(|w| {
                let (lo, hi) = w.lab_bounds(z_beam);
                compute_moments(particles, lo, hi, beta_gamma)
            })
            .collect()
    }
}

/// First and second moments of the particles in one window.
///
/// Emittances are edge values (four times rms); the normalized ones carry
/// the extra `βγ`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Moments {
    pub count: usize,
    pub x_mean: f64,
    pub y_mean: f64,
    pub x_rms: f64,
    pub y_rms: f64,
    pub xp_rms: f64,
    pub yp_rms: f64,
    pub emittance_x: f64,
    pub emittance_y: f64,
    pub emittance_nx: f64,
    pub emittance_ny: f64,
    pub vz_mean: f64,
    /// [C/m]
    pub line_charge: f64,
    /// [A]
    pub current: f64,
}

#[derive(Default)]
struct Sums {
    n: f64,
    x: f64,
    xx: f64,
    xp: f64,
    xpxp: f64,
    xxp: f64,
}

impl Sums {
    fn add(&mut self, x: f64, xp: f64) {
        self.n += 1.0;
        self.x += x;
        self.xx += x * x;
        self.xp += xp;
        self.xpxp += xp * xp;
        self.xxp += x * xp;
    }

    /// Mean, rms size, rms angle and rms emittance.
    fn reduce(&self) -> (f64, f64, f64, f64) {
        let n = self.n;
        let mx = self.x / n;
        let mxp = self.xp / n;
        let var_x = (self.xx / n - mx * mx).max(0.0);
        let var_xp = (self.xpxp / n - mxp * mxp).max(0.0);
        let cov = self.xxp / n - mx * mxp;
        let emit = (var_x * var_xp - cov * cov).max(0.0).sqrt();
        (mx, var_x.sqrt(), var_xp.sqrt(), emit)
    }
}

/// Moments of the particles with `z_lo <= z < z_hi`.
pub fn compute_moments(particles: &ParticleSet, z_lo: f64, z_hi: f64, beta_gamma: f64) -> Moments {
    let mut sx = Sums::default();
    let mut sy = Sums::default();
    let mut vz_sum = 0.0;
    for i in 0..particles.len() {
        let z = particles.z[i];
        if z < z_lo || z >= z_hi {
            continue;
        }
        let vz = particles.vz[i];
        if vz == 0.0 {
            continue;
        }
        sx.add(particles.x[i], particles.vx[i] / vz);
        sy.add(particles.y[i], particles.vy[i] / vz);
        vz_sum += vz;
    }
    if sx.n == 0.0 {
        return Moments::default();
    }

    let (x_mean, x_rms, xp_rms, ex) = sx.reduce();
    let (y_mean, y_rms, yp_rms, ey) = sy.reduce();
    let vz_mean = vz_sum / sx.n;
    let line_charge = particles.charge_c * particles.weight * sx.n / (z_hi - z_lo);
    Moments {
        count: sx.n as usize,
        x_mean,
        y_mean,
        x_rms,
        y_rms,
        xp_rms,
        yp_rms,
        emittance_x: 4.0 * ex,
        emittance_y: 4.0 * ey,
        emittance_nx: 4.0 * ex * beta_gamma,
        emittance_ny: 4.0 * ey * beta_gamma,
        vz_mean,
        line_charge,
        current: line_charge * vz_mean,
    }
}
