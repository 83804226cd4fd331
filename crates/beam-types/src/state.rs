// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Envelope radii and slopes at one longitudinal position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeState {
    pub a: f64,  // x radius [m]
    pub ap: f64, // da/dz
    pub b: f64,  // y radius [m]
    pub bp: f64, // db/dz
}

impl EnvelopeState {
    pub fn new(a: f64, ap: f64, b: f64, bp: f64) -> Self {
        EnvelopeState { a, ap, b, bp }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.a, self.ap, self.b, self.bp]
    }

    pub fn from_array(y: [f64; 4]) -> Self {
        EnvelopeState {
            a: y[0],
            ap: y[1],
            b: y[2],
            bp: y[3],
        }
    }

    pub fn is_physical(&self) -> bool {
        self.a.is_finite()
            && self.ap.is_finite()
            && self.b.is_finite()
            && self.bp.is_finite()
            && self.a > 0.0
            && self.b > 0.0
    }

    /// Mismatch against another state: radii relative, slopes absolute.
    pub fn mismatch(&self, other: &EnvelopeState) -> f64 {
        let da = (self.a - other.a).abs() / self.a.abs().max(f64::MIN_POSITIVE);
        let db = (self.b - other.b).abs() / self.b.abs().max(f64::MIN_POSITIVE);
        let dap = (self.ap - other.ap).abs();
        let dbp = (self.bp - other.bp).abs();
        da.max(db).max(dap).max(dbp)
    }
}

/// Envelope trajectory sampled on a uniform z grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeSolution {
    pub z: Array1<f64>,
    pub a: Array1<f64>,
    pub ap: Array1<f64>,
    pub b: Array1<f64>,
    pub bp: Array1<f64>,
    pub dz: f64,
    /// Phase advance accumulated over the full range [rad].
    pub phase_x: f64,
    pub phase_y: f64,
}

impl EnvelopeSolution {
    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    pub fn state(&self, i: usize) -> EnvelopeState {
        EnvelopeState::new(self.a[i], self.ap[i], self.b[i], self.bp[i])
    }

    pub fn z_lower(&self) -> f64 {
        self.z[0]
    }

    pub fn z_upper(&self) -> f64 {
        self.z[self.z.len() - 1]
    }

    pub fn max_radius(&self) -> f64 {
        self.a
            .iter()
            .chain(self.b.iter())
            .copied()
            .fold(0.0_f64, f64::max)
    }
}

/// 3-D computational grid with precomputed axes.
#[derive(Debug, Clone)]
pub struct Grid3D {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub x: Array1<f64>, // nx+1 node coordinates
    pub y: Array1<f64>,
    pub z: Array1<f64>,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Grid3D {
    /// `n*` are cell counts; node axes have `n* + 1` points.
    pub fn new(
        nx: usize,
        ny: usize,
        nz: usize,
        x_range: (f64, f64),
        y_range: (f64, f64),
        z_range: (f64, f64),
    ) -> Self {
        let x = Array1::linspace(x_range.0, x_range.1, nx + 1);
        let y = Array1::linspace(y_range.0, y_range.1, ny + 1);
        let z = Array1::linspace(z_range.0, z_range.1, nz + 1);
        Grid3D {
            nx,
            ny,
            nz,
            dx: (x_range.1 - x_range.0) / nx as f64,
            dy: (y_range.1 - y_range.0) / ny as f64,
            dz: (z_range.1 - z_range.0) / nz as f64,
            x,
            y,
            z,
        }
    }

    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

/// Macro-particles in structure-of-arrays layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticleSet {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub vz: Vec<f64>,
    /// Charge per macro-particle [C]
    pub charge_c: f64,
    /// Physical particles per macro-particle
    pub weight: f64,
}

impl ParticleSet {
    pub fn with_capacity(n: usize, charge_c: f64) -> Self {
        ParticleSet {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            vx: Vec::with_capacity(n),
            vy: Vec::with_capacity(n),
            vz: Vec::with_capacity(n),
            charge_c,
            weight: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn push(&mut self, pos: [f64; 3], vel: [f64; 3]) {
        self.x.push(pos[0]);
        self.y.push(pos[1]);
        self.z.push(pos[2]);
        self.vx.push(vel[0]);
        self.vy.push(vel[1]);
        self.vz.push(vel[2]);
    }
}

/// Output of the matching calculator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchedBeam {
    /// Quadrupole field gradient magnitude [T/m]
    pub gradient_t_per_m: f64,
    /// Matched envelope at the matching position
    pub initial: EnvelopeState,
    pub z_match_m: f64,
    pub emittance_m_rad: f64,
    /// Undepressed phase advance per period [deg]
    pub sigma0_deg: f64,
    /// Depressed phase advances per period [deg]
    pub sigma_x_deg: f64,
    pub sigma_y_deg: f64,
    /// Relative periodicity residual of `initial`
    pub residual: f64,
    pub newton_iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation_32x32x128() {
        let grid = Grid3D::new(32, 32, 128, (-0.03445, 0.03445), (-0.03445, 0.03445), (-0.72, 0.72));
        assert_eq!(grid.x.len(), 33);
        assert_eq!(grid.z.len(), 129);
        assert_eq!(grid.n_cells(), 32 * 32 * 128);
        assert!((grid.dx - 0.0689 / 32.0).abs() < 1e-15);
        assert!((grid.dz - 1.44 / 128.0).abs() < 1e-15);
        assert!((grid.x[0] + 0.03445).abs() < 1e-15);
        assert!((grid.z[128] - 0.72).abs() < 1e-12);
    }

    #[test]
    fn test_envelope_state_array_roundtrip() {
        let s = EnvelopeState::new(1.0e-3, 2.0e-3, 3.0e-3, -4.0e-3);
        assert_eq!(EnvelopeState::from_array(s.to_array()), s);
        assert!(s.is_physical());
        assert!(!EnvelopeState::new(-1.0, 0.0, 1.0, 0.0).is_physical());
    }

    #[test]
    fn test_envelope_state_mismatch() {
        let s = EnvelopeState::new(0.01, 0.0, 0.02, 0.0);
        let t = EnvelopeState::new(0.0101, 1e-4, 0.02, 0.0);
        assert!((s.mismatch(&t) - 0.01).abs() < 1e-12);
        assert_eq!(s.mismatch(&s), 0.0);
    }

    #[test]
    fn test_particle_set_push() {
        let mut p = ParticleSet::with_capacity(4, 1.6e-19);
        assert!(p.is_empty());
        p.push([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.vz[0], 6.0);
    }
}
