// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Species and Derived Beam Quantities
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Beam species and the quantities derived from energy, current and
//! emittance: velocity, relativistic factors, rigidity, perveance and
//! thermal spreads.

use beam_types::config::{BeamConfig, SpeciesConfig};
use beam_types::constants::{AMU, C_LIGHT, EPSILON0, EV_TO_J, POTASSIUM_AMU, Q_ELEMENTARY};
use beam_types::error::{BeamError, BeamResult};
use serde::Serialize;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Species {
    pub name: String,
    pub mass_kg: f64,
    pub charge_state: i32,
}

impl Species {
    pub fn from_config(cfg: &SpeciesConfig) -> BeamResult<Self> {
        if !cfg.mass_amu.is_finite() || cfg.mass_amu <= 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "species mass must be finite and > 0, got {} amu",
                cfg.mass_amu
            )));
        }
        if cfg.charge_state == 0 {
            return Err(BeamError::PhysicsViolation(
                "species charge_state must be non-zero".to_string(),
            ));
        }
        Ok(Species {
            name: cfg.name.clone(),
            mass_kg: cfg.mass_amu * AMU,
            charge_state: cfg.charge_state,
        })
    }

    pub fn potassium(charge_state: i32) -> Self {
        Species {
            name: "Potassium".to_string(),
            mass_kg: POTASSIUM_AMU * AMU,
            charge_state,
        }
    }

    /// Signed particle charge [C].
    pub fn charge_c(&self) -> f64 {
        self.charge_state as f64 * Q_ELEMENTARY
    }
}

/// Relativistic kinematics of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kinematics {
    pub gamma: f64,
    pub beta: f64,
    pub velocity_m_s: f64,
}

/// Velocity from kinetic energy [eV] and rest mass [kg].
///
/// `β = sqrt(T (T + 2 mc²)) / (T + mc²)`, written in the form that keeps
/// full precision for `T ≪ mc²`.
pub fn kinematics(mass_kg: f64, ekin_ev: f64) -> BeamResult<Kinematics> {
    if !ekin_ev.is_finite() || ekin_ev <= 0.0 {
        return Err(BeamError::PhysicsViolation(format!(
            "kinetic energy must be finite and > 0, got {ekin_ev} eV"
        )));
    }
    if !mass_kg.is_finite() || mass_kg <= 0.0 {
        return Err(BeamError::PhysicsViolation(format!(
            "particle mass must be finite and > 0, got {mass_kg} kg"
        )));
    }
    let gm1 = ekin_ev * EV_TO_J / (mass_kg * C_LIGHT * C_LIGHT);
    let gamma = 1.0 + gm1;
    let beta = (gm1 * (gm1 + 2.0)).sqrt() / gamma;
    Ok(Kinematics {
        gamma,
        beta,
        velocity_m_s: beta * C_LIGHT,
    })
}

/// Generalized perveance `Q = |q| I / (2π ε0 m γ³ v³)`.
pub fn generalized_perveance(species: &Species, current_a: f64, kin: &Kinematics) -> f64 {
    let v = kin.velocity_m_s;
    species.charge_c().abs() * current_a
        / (2.0 * PI * EPSILON0 * species.mass_kg * kin.gamma.powi(3) * v * v * v)
}

/// Beam descriptor with every derived quantity resolved.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedBeam {
    pub species: Species,
    pub ekin_ev: f64,
    pub current_a: f64,
    pub gamma: f64,
    pub beta: f64,
    pub velocity_m_s: f64,
    /// Magnetic rigidity Bρ [T·m]
    pub rigidity_t_m: f64,
    pub perveance: f64,
    pub emittance_x: f64,
    pub emittance_y: f64,
    /// Reference radii the thermal spreads are set from [m]
    pub a0_m: f64,
    pub b0_m: f64,
    /// Transverse thermal velocity spread [m/s]
    pub vth_perp_m_s: f64,
    /// Longitudinal thermal velocity spread [m/s]
    pub vthz_m_s: f64,
    #[serde(skip)]
    vthz_override: Option<f64>,
}

impl DerivedBeam {
    pub fn derive(beam: &BeamConfig) -> BeamResult<Self> {
        let species = Species::from_config(&beam.species)?;
        for (value, label) in [
            (beam.emittance_m_rad, "emittance"),
            (beam.emittance_y(), "y emittance"),
            (beam.a0_m, "a0"),
            (beam.b0_m, "b0"),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BeamError::PhysicsViolation(format!(
                    "{label} must be finite and > 0, got {value}"
                )));
            }
        }
        if !beam.current_a.is_finite() || beam.current_a < 0.0 {
            return Err(BeamError::PhysicsViolation(format!(
                "current must be finite and >= 0, got {}",
                beam.current_a
            )));
        }
        let kin = kinematics(species.mass_kg, beam.ekin_ev)?;
        let perveance = generalized_perveance(&species, beam.current_a, &kin);
        let rigidity = kin.gamma * species.mass_kg * kin.velocity_m_s / species.charge_c().abs();

        let mut derived = DerivedBeam {
            species,
            ekin_ev: beam.ekin_ev,
            current_a: beam.current_a,
            gamma: kin.gamma,
            beta: kin.beta,
            velocity_m_s: kin.velocity_m_s,
            rigidity_t_m: rigidity,
            perveance,
            emittance_x: beam.emittance_m_rad,
            emittance_y: beam.emittance_y(),
            a0_m: beam.a0_m,
            b0_m: beam.b0_m,
            vth_perp_m_s: 0.0,
            vthz_m_s: 0.0,
            vthz_override: beam.vthz_m_s,
        };
        derived.refresh_thermal();
        Ok(derived)
    }

    fn refresh_thermal(&mut self) {
        let emit = (self.emittance_x * self.emittance_y).sqrt();
        self.vth_perp_m_s = 0.5 * self.velocity_m_s * emit / (self.a0_m * self.b0_m).sqrt();
        self.vthz_m_s = self.vthz_override.unwrap_or(self.vth_perp_m_s);
    }

    /// Same beam with new emittances; thermal spreads follow.
    pub fn with_emittance(&self, emittance_x: f64, emittance_y: f64) -> Self {
        let mut beam = self.clone();
        beam.emittance_x = emittance_x;
        beam.emittance_y = emittance_y;
        beam.refresh_thermal();
        beam
    }

    /// Same beam with new reference radii; thermal spreads follow.
    pub fn with_radii(&self, a0_m: f64, b0_m: f64) -> Self {
        let mut beam = self.clone();
        beam.a0_m = a0_m;
        beam.b0_m = b0_m;
        beam.refresh_thermal();
        beam
    }

    /// Same beam carrying a fraction of its current.
    pub fn with_current_fraction(&self, fraction: f64) -> Self {
        let mut beam = self.clone();
        beam.current_a *= fraction;
        beam.perveance *= fraction;
        beam
    }

    /// Focusing strength κ = q·G / (γ m v) [1/m²] for a gradient [T/m].
    pub fn focusing_strength(&self, gradient_t_per_m: f64) -> f64 {
        gradient_t_per_m * self.charge_sign() / self.rigidity_t_m
    }

    /// Signed `1/Bρ` mapping gradients to focusing strengths.
    pub fn inverse_rigidity(&self) -> f64 {
        self.charge_sign() / self.rigidity_t_m
    }

    fn charge_sign(&self) -> f64 {
        (self.species.charge_state as f64).signum()
    }

    /// Time step giving `steps_per_period` steps per lattice period.
    pub fn time_step(&self, tune_length_m: f64, steps_per_period: usize) -> BeamResult<f64> {
        if steps_per_period == 0 || !tune_length_m.is_finite() || tune_length_m <= 0.0 {
            return Err(BeamError::ConfigError(format!(
                "time step needs tune_length > 0 and steps_per_period >= 1, got {tune_length_m}, {steps_per_period}"
            )));
        }
        Ok(tune_length_m / steps_per_period as f64 / self.velocity_m_s)
    }

    /// Line charge density λ = I / v [C/m].
    pub fn line_charge(&self) -> f64 {
        self.current_a / self.velocity_m_s
    }
}
