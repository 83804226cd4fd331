// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::constants::{CM, FODO3D_GRADIENT_INTEGRAL, KV, MILLIAMP, MM, POTASSIUM_AMU};
use crate::error::{BeamError, BeamResult};

/// Top-level run configuration.
///
/// Immutable once built; handed to `Engine::generate` as a whole instead of
/// being assigned piecemeal onto shared engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub labels: RunLabels,
    pub beam: BeamConfig,
    pub lattice: LatticeConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    pub envelope: EnvelopeConfig,
    pub grid: GridConfig,
    pub loading: LoadingConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Time steps per lattice period; sets `dt`.
    #[serde(default = "default_steps_per_period")]
    pub steps_per_period: usize,
    /// Steps requested from the 3-D package.
    #[serde(default = "default_steps_per_period")]
    pub n_steps: usize,
}

/// Free-text labels printed with run output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLabels {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub mass_amu: f64,
    pub charge_state: i32,
}

/// Beam descriptor. Velocity and thermal spreads are not listed here:
/// they are derived from energy and emittance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamConfig {
    pub species: SpeciesConfig,
    /// Kinetic energy [eV]
    pub ekin_ev: f64,
    /// Beam current [A]
    pub current_a: f64,
    /// Initial x envelope radius [m]
    pub a0_m: f64,
    /// Initial y envelope radius [m]
    pub b0_m: f64,
    #[serde(default)]
    pub ap0: f64,
    #[serde(default)]
    pub bp0: f64,
    /// Unnormalized edge emittance [m·rad]
    pub emittance_m_rad: f64,
    /// Optional y emittance; defaults to `emittance_m_rad`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emittance_y_m_rad: Option<f64>,
    /// Longitudinal thermal velocity spread [m/s]. When absent, the
    /// transverse spread set by the emittance is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vthz_m_s: Option<f64>,
}

impl BeamConfig {
    pub fn emittance_y(&self) -> f64 {
        self.emittance_y_m_rad.unwrap_or(self.emittance_m_rad)
    }
}

/// FODO lattice geometry. One period holds a focusing quadrupole centred at
/// `start + half_period/2` and a defocusing one at `start + 3·half_period/2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeConfig {
    pub half_period_m: f64,
    pub quad_length_m: f64,
    pub pipe_radius_m: f64,
    /// Quadrupole field gradient [T/m]. Absent means: solve for it from
    /// `matching.sigma0_deg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_t_per_m: Option<f64>,
    /// Start of periodicity relative to the quadrupole positions.
    #[serde(default)]
    pub start_m: f64,
}

impl LatticeConfig {
    pub fn period_m(&self) -> f64 {
        2.0 * self.half_period_m
    }
}

/// Phase-advance targets and solver controls for the matching calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Undepressed phase advance per period [deg]
    #[serde(default = "default_sigma0_deg")]
    pub sigma0_deg: f64,
    /// Depressed phase advance per period [deg]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma_deg: Option<f64>,
    /// Solve the gradient even when the lattice fixes one.
    #[serde(default)]
    pub solve_gradient: bool,
    /// Solve the emittance that yields `sigma_deg`.
    #[serde(default)]
    pub solve_emittance: bool,
    /// Replace `a0, b0, ap0, bp0` with the matched envelope.
    #[serde(default)]
    pub solve_envelope: bool,
    #[serde(default = "default_continuation_stages")]
    pub continuation_stages: usize,
    #[serde(default = "default_matching_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_matching_max_iterations")]
    pub max_iterations: usize,
}

fn default_sigma0_deg() -> f64 {
    72.0
}
fn default_continuation_stages() -> usize {
    4
}
fn default_matching_tolerance() -> f64 {
    1e-10
}
fn default_matching_max_iterations() -> usize {
    40
}
fn default_steps_per_period() -> usize {
    50
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            sigma0_deg: default_sigma0_deg(),
            sigma_deg: None,
            solve_gradient: false,
            solve_emittance: false,
            solve_envelope: false,
            continuation_stages: default_continuation_stages(),
            tolerance: default_matching_tolerance(),
            max_iterations: default_matching_max_iterations(),
        }
    }
}

/// Envelope integration range. Initial conditions apply at `z_lower_m`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    pub z_lower_m: f64,
    pub z_upper_m: f64,
    pub dz_m: f64,
    /// Lattice period length used for phase advances.
    pub tune_length_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldBoundary {
    Dirichlet,
    Periodic,
    Neumann,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleBoundary {
    Absorb,
    Periodic,
    Reflect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBoundaries {
    /// At iz == 0
    pub lower_z: FieldBoundary,
    /// At iz == nz
    pub upper_z: FieldBoundary,
    pub transverse: FieldBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleBoundaries {
    pub lower_z: ParticleBoundary,
    pub upper_z: ParticleBoundary,
    pub transverse: ParticleBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSolverKind {
    #[default]
    Fft,
    Multigrid,
}

/// 3-D field grid descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub x_min_m: f64,
    pub x_max_m: f64,
    pub y_min_m: f64,
    pub y_max_m: f64,
    pub z_min_m: f64,
    pub z_max_m: f64,
    pub field_bounds: FieldBoundaries,
    pub particle_bounds: ParticleBoundaries,
    /// Solve fields in one transverse quadrant and mirror them.
    #[serde(default)]
    pub four_fold_symmetry: bool,
    #[serde(default)]
    pub solver: FieldSolverKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransverseDistribution {
    SemiGaussian,
    Kv,
    Waterbag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongitudinalDistribution {
    Gaussian,
    Uniform,
}

/// Parabolic line-charge taper at both beam ends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CigarConfig {
    /// Untapered fraction of the beam; each end has length `(1 - straight)/2`.
    pub straight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingConfig {
    pub n_particles: usize,
    pub distribution: TransverseDistribution,
    pub longitudinal: LongitudinalDistribution,
    pub z_min_m: f64,
    pub z_max_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cigar: Option<CigarConfig>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    42
}

/// Quantities whose time histories are saved in addition to line charge
/// and mean axial velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFlags {
    #[serde(default)]
    pub x_rms: bool,
    #[serde(default)]
    pub y_rms: bool,
    #[serde(default)]
    pub x_emittance_n: bool,
    #[serde(default)]
    pub y_emittance_n: bool,
    #[serde(default)]
    pub current: bool,
}

/// `[z_start, z_end, z_period]` in beam-frame travel distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlotSchedule {
    pub z_start_m: f64,
    pub z_end_m: f64,
    pub z_period_m: f64,
}

impl Default for PlotSchedule {
    fn default() -> Self {
        PlotSchedule {
            z_start_m: 0.0,
            z_end_m: f64::MAX,
            z_period_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// User windows `[z_min, z_max]` relative to the beam frame. The
    /// whole-extent window is implicit and always first.
    #[serde(default)]
    pub z_windows: Vec<[f64; 2]>,
    #[serde(default)]
    pub history: HistoryFlags,
    /// Save histories every `history_period` steps.
    #[serde(default = "default_history_period")]
    pub history_period: usize,
    #[serde(default)]
    pub plot_schedule: PlotSchedule,
    /// Steps between user runtime diagnostics.
    #[serde(default = "default_steps_per_period")]
    pub runtime_period: usize,
}

fn default_history_period() -> usize {
    1
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        DiagnosticsConfig {
            z_windows: Vec::new(),
            history: HistoryFlags::default(),
            history_period: default_history_period(),
            plot_schedule: PlotSchedule::default(),
            runtime_period: default_steps_per_period(),
        }
    }
}

fn require_positive(value: f64, label: &str) -> BeamResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(BeamError::ConfigError(format!(
            "{label} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

fn require_finite(value: f64, label: &str) -> BeamResult<()> {
    if !value.is_finite() {
        return Err(BeamError::ConfigError(format!(
            "{label} must be finite, got {value}"
        )));
    }
    Ok(())
}

impl SimulationConfig {
    /// Load from JSON file.
    pub fn from_file(path: &str) -> BeamResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Example 3-D K+ beam in a periodic FODO lattice, tune depression
    /// 72° → 20°, semi-Gaussian cigar beam on a 32x32x128 grid.
    pub fn fodo3d() -> Self {
        let hlp = 36.0 * CM;
        let piperad = 3.445 * CM;
        let quadlen = 11.0 * CM;
        let tunelen = 2.0 * hlp;
        let z_lower = -2.5 * hlp;

        SimulationConfig {
            labels: RunLabels {
                title: "Semi-Gaussian cigar beam. 32x32x128".to_string(),
                subtitle: "Example 3D beam in a FODO lattice".to_string(),
                author: "David P. Grote".to_string(),
            },
            beam: BeamConfig {
                species: SpeciesConfig {
                    name: "Potassium".to_string(),
                    mass_amu: POTASSIUM_AMU,
                    charge_state: 1,
                },
                ekin_ev: 80.0 * KV,
                current_a: 2.0 * MILLIAMP,
                a0_m: 8.760439903086566 * MM,
                b0_m: 15.599886448447793 * MM,
                ap0: 0.0,
                bp0: 0.0,
                emittance_m_rad: 6.247186343204832e-05,
                emittance_y_m_rad: None,
                vthz_m_s: None,
            },
            lattice: LatticeConfig {
                half_period_m: hlp,
                quad_length_m: quadlen,
                pipe_radius_m: piperad,
                gradient_t_per_m: Some(FODO3D_GRADIENT_INTEGRAL / quadlen),
                start_m: 0.0,
            },
            matching: MatchingConfig {
                sigma_deg: Some(20.0),
                ..MatchingConfig::default()
            },
            envelope: EnvelopeConfig {
                z_lower_m: z_lower,
                z_upper_m: -z_lower,
                dz_m: tunelen / 100.0,
                tune_length_m: tunelen,
            },
            grid: GridConfig {
                nx: 32,
                ny: 32,
                nz: 128,
                x_min_m: -piperad,
                x_max_m: piperad,
                y_min_m: -piperad,
                y_max_m: piperad,
                z_min_m: -2.0 * hlp,
                z_max_m: 2.0 * hlp,
                field_bounds: FieldBoundaries {
                    lower_z: FieldBoundary::Dirichlet,
                    upper_z: FieldBoundary::Dirichlet,
                    transverse: FieldBoundary::Dirichlet,
                },
                particle_bounds: ParticleBoundaries {
                    lower_z: ParticleBoundary::Absorb,
                    upper_z: ParticleBoundary::Absorb,
                    transverse: ParticleBoundary::Absorb,
                },
                four_fold_symmetry: false,
                solver: FieldSolverKind::Fft,
            },
            loading: LoadingConfig {
                n_particles: 200_000,
                distribution: TransverseDistribution::SemiGaussian,
                longitudinal: LongitudinalDistribution::Gaussian,
                z_min_m: -2.0 * hlp * 0.8,
                z_max_m: 2.0 * hlp * 0.8,
                cigar: Some(CigarConfig { straight: 0.5 }),
                seed: default_seed(),
            },
            diagnostics: DiagnosticsConfig {
                z_windows: vec![[-0.35, -0.3], [-0.25, 0.25], [0.3, 0.35]],
                history: HistoryFlags {
                    x_rms: true,
                    y_rms: true,
                    x_emittance_n: true,
                    y_emittance_n: true,
                    current: true,
                },
                history_period: 1,
                plot_schedule: PlotSchedule {
                    z_start_m: 0.0,
                    z_end_m: 100_000.0,
                    z_period_m: tunelen,
                },
                runtime_period: 50,
            },
            steps_per_period: 50,
            n_steps: 50,
        }
    }

    /// Scalar sanity checks. Geometric containment is checked when the
    /// grid is built.
    pub fn validate(&self) -> BeamResult<()> {
        let beam = &self.beam;
        require_positive(beam.species.mass_amu, "beam.species.mass_amu")?;
        if beam.species.charge_state == 0 {
            return Err(BeamError::ConfigError(
                "beam.species.charge_state must be non-zero".to_string(),
            ));
        }
        require_positive(beam.ekin_ev, "beam.ekin_ev")?;
        require_finite(beam.current_a, "beam.current_a")?;
        if beam.current_a < 0.0 {
            return Err(BeamError::ConfigError(format!(
                "beam.current_a must be >= 0, got {}",
                beam.current_a
            )));
        }
        require_positive(beam.a0_m, "beam.a0_m")?;
        require_positive(beam.b0_m, "beam.b0_m")?;
        require_finite(beam.ap0, "beam.ap0")?;
        require_finite(beam.bp0, "beam.bp0")?;
        require_positive(beam.emittance_m_rad, "beam.emittance_m_rad")?;
        require_positive(beam.emittance_y(), "beam.emittance_y_m_rad")?;
        if let Some(vthz) = beam.vthz_m_s {
            require_finite(vthz, "beam.vthz_m_s")?;
        }

        let lat = &self.lattice;
        require_positive(lat.half_period_m, "lattice.half_period_m")?;
        require_positive(lat.quad_length_m, "lattice.quad_length_m")?;
        require_positive(lat.pipe_radius_m, "lattice.pipe_radius_m")?;
        require_finite(lat.start_m, "lattice.start_m")?;
        if lat.quad_length_m >= lat.half_period_m {
            return Err(BeamError::ConfigError(format!(
                "lattice.quad_length_m ({}) must be < half_period_m ({})",
                lat.quad_length_m, lat.half_period_m
            )));
        }
        if let Some(g) = lat.gradient_t_per_m {
            require_finite(g, "lattice.gradient_t_per_m")?;
        }

        let m = &self.matching;
        require_finite(m.sigma0_deg, "matching.sigma0_deg")?;
        if let Some(sigma) = m.sigma_deg {
            require_finite(sigma, "matching.sigma_deg")?;
        }
        if m.solve_emittance && m.sigma_deg.is_none() {
            return Err(BeamError::ConfigError(
                "matching.solve_emittance requires matching.sigma_deg".to_string(),
            ));
        }
        if m.continuation_stages == 0 || m.max_iterations == 0 {
            return Err(BeamError::ConfigError(
                "matching.continuation_stages and max_iterations must be >= 1".to_string(),
            ));
        }
        require_positive(m.tolerance, "matching.tolerance")?;

        let env = &self.envelope;
        require_finite(env.z_lower_m, "envelope.z_lower_m")?;
        require_finite(env.z_upper_m, "envelope.z_upper_m")?;
        if env.z_upper_m <= env.z_lower_m {
            return Err(BeamError::ConfigError(format!(
                "envelope.z_upper_m ({}) must exceed z_lower_m ({})",
                env.z_upper_m, env.z_lower_m
            )));
        }
        require_positive(env.dz_m, "envelope.dz_m")?;
        require_positive(env.tune_length_m, "envelope.tune_length_m")?;

        let g = &self.grid;
        if g.nx == 0 || g.ny == 0 || g.nz == 0 {
            return Err(BeamError::ConfigError(format!(
                "grid cell counts must be >= 1, got ({}, {}, {})",
                g.nx, g.ny, g.nz
            )));
        }
        for (lo, hi, axis) in [
            (g.x_min_m, g.x_max_m, "x"),
            (g.y_min_m, g.y_max_m, "y"),
            (g.z_min_m, g.z_max_m, "z"),
        ] {
            require_finite(lo, "grid lower extent")?;
            require_finite(hi, "grid upper extent")?;
            if hi <= lo {
                return Err(BeamError::ConfigError(format!(
                    "grid {axis} extent is empty: [{lo}, {hi}]"
                )));
            }
        }

        let load = &self.loading;
        if load.n_particles == 0 {
            return Err(BeamError::ConfigError(
                "loading.n_particles must be >= 1".to_string(),
            ));
        }
        if load.z_max_m <= load.z_min_m {
            return Err(BeamError::ConfigError(format!(
                "loading z range is empty: [{}, {}]",
                load.z_min_m, load.z_max_m
            )));
        }
        if let Some(cigar) = load.cigar {
            if !(0.0..=1.0).contains(&cigar.straight) {
                return Err(BeamError::ConfigError(format!(
                    "loading.cigar.straight must lie in [0, 1], got {}",
                    cigar.straight
                )));
            }
        }

        let diag = &self.diagnostics;
        for (i, w) in diag.z_windows.iter().enumerate() {
            if !(w[0].is_finite() && w[1].is_finite()) || w[1] <= w[0] {
                return Err(BeamError::ConfigError(format!(
                    "diagnostics.z_windows[{i}] must satisfy min < max, got {w:?}"
                )));
            }
        }
        if diag.history_period == 0 || diag.runtime_period == 0 {
            return Err(BeamError::ConfigError(
                "diagnostics periods must be >= 1".to_string(),
            ));
        }
        if self.steps_per_period == 0 {
            return Err(BeamError::ConfigError(
                "steps_per_period must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
