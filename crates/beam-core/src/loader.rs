// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Particle Loader
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Envelope-shaped macro-particle loading.
//!
//! Each particle is matched to the envelope interpolated at its `z`. The
//! edge emittance is four times the rms emittance for every distribution.
//! Cigar beams taper the line charge parabolically at both ends and shrink
//! the transverse size there by the smooth-focusing matched-radius ratio.

use beam_math::interp::interp_uniform;
use beam_types::config::{LoadingConfig, LongitudinalDistribution, TransverseDistribution};
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{EnvelopeSolution, EnvelopeState, ParticleSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::f64::consts::PI;

use crate::species::DerivedBeam;

/// Waterbag edge radius relative to the KV radius at equal rms size.
const WATERBAG_SCALE: f64 = 1.224_744_871_391_589; // sqrt(1.5)

pub struct ParticleLoader<'a> {
    beam: &'a DerivedBeam,
    envelope: &'a EnvelopeSolution,
    /// Smooth-focusing wavenumber σ0/period [1/m]
    k0: f64,
}

impl<'a> ParticleLoader<'a> {
    pub fn new(beam: &'a DerivedBeam, envelope: &'a EnvelopeSolution, k0: f64) -> BeamResult<Self> {
        if envelope.len() < 2 {
            return Err(BeamError::PhysicsViolation(
                "particle loading needs an envelope with at least two samples".to_string(),
            ));
        }
        if !k0.is_finite() || k0 <= 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "smooth-focusing wavenumber must be finite and > 0, got {k0}"
            )));
        }
        Ok(ParticleLoader { beam, envelope, k0 })
    }

    /// Envelope interpolated at `z`.
    pub fn envelope_at(&self, z: f64) -> EnvelopeState {
        let env = self.envelope;
        let z0 = env.z_lower();
        EnvelopeState::new(
            interp_uniform(&env.a, z0, env.dz, z),
            interp_uniform(&env.ap, z0, env.dz, z),
            interp_uniform(&env.b, z0, env.dz, z),
            interp_uniform(&env.bp, z0, env.dz, z),
        )
    }

    /// Smooth-focusing matched radius for a fraction of the full line
    /// charge:  `k0² R⁴ − Q f R² − ε² = 0`.
    fn smooth_radius(&self, fraction: f64) -> f64 {
        let q = self.beam.perveance * fraction;
        let eps2 = self.beam.emittance_x * self.beam.emittance_y;
        let k02 = self.k0 * self.k0;
        ((q + (q * q + 4.0 * k02 * eps2).sqrt()) / (2.0 * k02)).sqrt()
    }

    /// Transverse size factor where the line charge is `fraction` of full.
    pub fn radius_scale(&self, fraction: f64) -> f64 {
        self.smooth_radius(fraction) / self.smooth_radius(1.0)
    }

    pub fn load(&self, cfg: &LoadingConfig) -> BeamResult<ParticleSet> {
        if cfg.n_particles == 0 || !(cfg.z_max_m > cfg.z_min_m) {
            return Err(BeamError::ConfigError(format!(
                "loading needs n_particles >= 1 and z_min < z_max, got {} in [{}, {}]",
                cfg.n_particles, cfg.z_min_m, cfg.z_max_m
            )));
        }
        if cfg.z_min_m < self.envelope.z_lower() || cfg.z_max_m > self.envelope.z_upper() {
            return Err(BeamError::ConfigError(format!(
                "load region [{}, {}] lies outside the envelope solution [{}, {}]",
                cfg.z_min_m,
                cfg.z_max_m,
                self.envelope.z_lower(),
                self.envelope.z_upper()
            )));
        }

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let straight = cfg.cigar.map_or(1.0, |c| c.straight);
        let profile = LineProfile::new(cfg.z_min_m, cfg.z_max_m, straight);
        let v = self.beam.velocity_m_s;
        let vthz = self.beam.vthz_m_s;

        let mut particles = ParticleSet::with_capacity(cfg.n_particles, self.beam.species.charge_c());
        for _ in 0..cfg.n_particles {
            let z = profile.sample(&mut rng);
            let scale = if cfg.cigar.is_some() {
                self.radius_scale(profile.density(z))
            } else {
                1.0
            };
            let env = self.envelope_at(z);
            let env = EnvelopeState::new(env.a * scale, env.ap * scale, env.b * scale, env.bp * scale);
            let [x, xp, y, yp] = self.transverse(&mut rng, cfg.distribution, &env);
            let vz = match cfg.longitudinal {
                LongitudinalDistribution::Gaussian => v + vthz * rng.sample::<f64, _>(StandardNormal),
                LongitudinalDistribution::Uniform => v + vthz * 3.0_f64.sqrt() * (2.0 * rng.gen::<f64>() - 1.0),
            };
            particles.push([x, y, z], [xp * vz, yp * vz, vz]);
        }

        let length = cfg.z_max_m - cfg.z_min_m;
        let physical = self.beam.current_a / (v * self.beam.species.charge_c().abs()) * length * profile.mean_density();
        particles.weight = physical / cfg.n_particles as f64;

        log::info!(
            "loaded {} {:?} particles on [{}, {}], weight {:.4e}",
            particles.len(),
            cfg.distribution,
            cfg.z_min_m,
            cfg.z_max_m,
            particles.weight
        );
        Ok(particles)
    }

    /// `[x, x', y, y']` for one particle inside envelope `env`.
    fn transverse(&self, rng: &mut StdRng, dist: TransverseDistribution, env: &EnvelopeState) -> [f64; 4] {
        let (ex, ey) = (self.beam.emittance_x, self.beam.emittance_y);
        let (a, b) = (env.a, env.b);
        match dist {
            TransverseDistribution::SemiGaussian => {
                let r = rng.gen::<f64>().sqrt();
                let theta = 2.0 * PI * rng.gen::<f64>();
                let x = a * r * theta.cos();
                let y = b * r * theta.sin();
                let xp = env.ap / a * x + 0.5 * ex / a * rng.sample::<f64, _>(StandardNormal);
                let yp = env.bp / b * y + 0.5 * ey / b * rng.sample::<f64, _>(StandardNormal);
                [x, xp, y, yp]
            }
            TransverseDistribution::Kv => {
                let u = unit_4vector(rng);
                let x = a * u[0];
                let y = b * u[2];
                [x, env.ap / a * x + ex / a * u[1], y, env.bp / b * y + ey / b * u[3]]
            }
            TransverseDistribution::Waterbag => {
                let u = unit_4vector(rng);
                let rho = WATERBAG_SCALE * rng.gen::<f64>().powf(0.25);
                let x = a * rho * u[0];
                let y = b * rho * u[2];
                [
                    x,
                    env.ap / a * x + ex / a * rho * u[1],
                    y,
                    env.bp / b * y + ey / b * rho * u[3],
                ]
            }
        }
    }
}

/// Uniformly distributed point on the unit 3-sphere in R⁴.
fn unit_4vector(rng: &mut StdRng) -> [f64; 4] {
    loop {
        let g: [f64; 4] = std::array::from_fn(|_| rng.sample::<f64, _>(StandardNormal));
        let norm = g.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 1e-12 {
            return g.map(|v| v / norm);
        }
    }
}

/// Line-charge profile: flat centre holding the `straight` fraction of
/// the length, parabolic tapers to zero at both ends.
#[derive(Debug, Clone, Copy)]
struct LineProfile {
    z_min: f64,
    z_max: f64,
    taper: f64,
    straight: f64,
}

impl LineProfile {
    fn new(z_min: f64, z_max: f64, straight: f64) -> Self {
        LineProfile {
            z_min,
            z_max,
            taper: 0.5 * (1.0 - straight) * (z_max - z_min),
            straight,
        }
    }

    /// Relative line density in `[0, 1]`.
    fn density(&self, z: f64) -> f64 {
        if self.taper <= 0.0 {
            return 1.0;
        }
        let into = (self.z_min + self.taper - z).max(z - (self.z_max - self.taper));
        if into <= 0.0 {
            1.0
        } else {
            let d = (into / self.taper).min(1.0);
            1.0 - d * d
        }
    }

    /// Average of `density` over the load region.
    fn mean_density(&self) -> f64 {
        self.straight + 2.0 / 3.0 * (1.0 - self.straight)
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        loop {
            let z = self.z_min + (self.z_max - self.z_min) * rng.gen::<f64>();
            if rng.gen::<f64>() < self.density(z) {
                return z;
            }
        }
    }
}
