// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Lattice
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Periodic hard-edge quadrupole lattice.
//!
//! Exactly one period is stored. Positions of the stored elements are
//! relative to the phase origin `start`; evaluation at any `z` reduces it
//! into the stored period, which tiles the lattice over all space.

use beam_types::config::LatticeConfig;
use beam_types::error::{BeamError, BeamResult};
use serde::{Deserialize, Serialize};

/// Relative slack when checking element placement inside the period.
const PLACEMENT_EPS: f64 = 1e-12;

/// Hard-edge quadrupole: gradient `db` [T/m] on `[zs, ze)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrupole {
    pub zs: f64,
    pub ze: f64,
    pub db: f64,
}

impl Quadrupole {
    pub fn length(&self) -> f64 {
        self.ze - self.zs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    quads: Vec<Quadrupole>,
    period: f64,
    start: f64,
}

impl Lattice {
    /// Empty lattice with the given periodicity length and phase origin.
    pub fn new(period: f64, start: f64) -> BeamResult<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "lattice period must be finite and > 0, got {period}"
            )));
        }
        if !start.is_finite() {
            return Err(BeamError::PhysicsViolation(format!(
                "lattice start must be finite, got {start}"
            )));
        }
        Ok(Lattice {
            quads: Vec::new(),
            period,
            start,
        })
    }

    /// Register one quadrupole in the period. Elements must fit in
    /// `[0, period]` and must not overlap.
    pub fn add_quad(&mut self, zs: f64, ze: f64, db: f64) -> BeamResult<()> {
        if !(zs.is_finite() && ze.is_finite() && db.is_finite()) {
            return Err(BeamError::PhysicsViolation(format!(
                "quadrupole parameters must be finite, got zs={zs}, ze={ze}, db={db}"
            )));
        }
        if ze <= zs {
            return Err(BeamError::PhysicsViolation(format!(
                "quadrupole end ({ze}) must exceed start ({zs})"
            )));
        }
        let slack = PLACEMENT_EPS * self.period;
        if zs < -slack || ze > self.period + slack {
            return Err(BeamError::PhysicsViolation(format!(
                "quadrupole [{zs}, {ze}] does not fit in one period of {}",
                self.period
            )));
        }
        if let Some(other) = self.quads.iter().find(|q| zs < q.ze && q.zs < ze) {
            return Err(BeamError::PhysicsViolation(format!(
                "quadrupole [{zs}, {ze}] overlaps [{}, {}]",
                other.zs, other.ze
            )));
        }
        let quad = Quadrupole { zs, ze, db };
        let pos = self.quads.partition_point(|q| q.zs < zs);
        self.quads.insert(pos, quad);
        Ok(())
    }

    /// Standard FODO period: focusing quadrupole (`+gradient`) centred at
    /// `half_period/2`, defocusing (`-gradient`) at `3·half_period/2`.
    pub fn fodo(half_period: f64, quad_length: f64, gradient: f64, start: f64) -> BeamResult<Self> {
        if !half_period.is_finite() || half_period <= 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "half period must be finite and > 0, got {half_period}"
            )));
        }
        if !quad_length.is_finite() || quad_length <= 0.0 || quad_length >= half_period {
            return Err(BeamError::PhysicsViolation(format!(
                "quadrupole length must lie in (0, {half_period}), got {quad_length}"
            )));
        }
        let mut lattice = Lattice::new(2.0 * half_period, start)?;
        lattice.add_quad(
            0.5 * half_period - 0.5 * quad_length,
            0.5 * half_period + 0.5 * quad_length,
            gradient,
        )?;
        lattice.add_quad(
            1.5 * half_period - 0.5 * quad_length,
            1.5 * half_period + 0.5 * quad_length,
            -gradient,
        )?;
        Ok(lattice)
    }

    pub fn from_config(cfg: &LatticeConfig, gradient: f64) -> BeamResult<Self> {
        Self::fodo(cfg.half_period_m, cfg.quad_length_m, gradient, cfg.start_m)
    }

    pub fn quads(&self) -> &[Quadrupole] {
        &self.quads
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// Position of `z` inside the stored period, in `[0, period)`.
    pub fn reduce(&self, z: f64) -> f64 {
        (z - self.start).rem_euclid(self.period)
    }

    /// Field gradient [T/m] at `z`.
    pub fn gradient_at(&self, z: f64) -> f64 {
        let zr = self.reduce(z);
        self.quads
            .iter()
            .find(|q| q.zs <= zr && zr < q.ze)
            .map_or(0.0, |q| q.db)
    }

    /// Element edges strictly inside `(z0, z1)`, ascending.
    pub fn edges_between(&self, z0: f64, z1: f64) -> Vec<f64> {
        let mut edges = Vec::new();
        if !(z1 > z0) || self.quads.is_empty() {
            return edges;
        }
        let first = ((z0 - self.start) / self.period).floor() as i64;
        let last = ((z1 - self.start) / self.period).floor() as i64;
        for n in first..=last {
            let origin = self.start + n as f64 * self.period;
            for q in &self.quads {
                for edge in [origin + q.zs, origin + q.ze] {
                    if edge > z0 && edge < z1 {
                        edges.push(edge);
                    }
                }
            }
        }
        edges.sort_by(f64::total_cmp);
        edges.dedup_by(|a, b| (*a - *b).abs() <= PLACEMENT_EPS * self.period);
        edges
    }

    /// Split `[z0, z1]` at element edges so the gradient is constant on
    /// every piece.
    pub fn pieces(&self, z0: f64, z1: f64) -> Vec<(f64, f64)> {
        let mut pieces = Vec::new();
        let mut left = z0;
        for edge in self.edges_between(z0, z1) {
            pieces.push((left, edge));
            left = edge;
        }
        pieces.push((left, z1));
        pieces
    }
}
