// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Engine Interface
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Explicit `package` / `generate` / `step` state machine.
//!
//! An engine is created for one package, receives an immutable
//! configuration in `generate`, then advances one step at a time.
//! Stepping before `generate` is an `Engine` error.

use beam_diagnostics::windows::{Moments, WindowSet};
use beam_types::config::SimulationConfig;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{EnvelopeState, ParticleSet};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    /// Envelope model (`env`)
    Envelope,
    /// Full 3-D PIC (`w3d`)
    ThreeD,
}

impl FromStr for Package {
    type Err = BeamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(Package::Envelope),
            "w3d" => Ok(Package::ThreeD),
            other => Err(BeamError::ConfigError(format!(
                "unknown package '{other}', expected 'env' or 'w3d'"
            ))),
        }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Package::Envelope => write!(f, "env"),
            Package::ThreeD => write!(f, "w3d"),
        }
    }
}

pub trait Engine {
    fn package(&self) -> Package;

    /// Derive everything the run needs from `config`. Called once.
    fn generate(&mut self, config: &SimulationConfig) -> BeamResult<()>;

    /// Advance one step.
    fn step(&mut self) -> BeamResult<()>;

    fn is_generated(&self) -> bool;

    /// Number of completed steps.
    fn step_index(&self) -> usize;

    /// Simulated time [s].
    fn time(&self) -> f64;

    /// Beam-frame position [m].
    fn beam_frame_z(&self) -> f64;

    /// No further steps possible.
    fn is_finished(&self) -> bool {
        false
    }

    fn particles(&self) -> Option<&ParticleSet> {
        None
    }

    fn envelope(&self) -> Option<EnvelopeState> {
        None
    }

    /// Moments in each window, window 0 first.
    fn moments(&self, windows: &WindowSet) -> BeamResult<Vec<Moments>>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn package(&self) -> Package {
        (**self).package()
    }

    fn generate(&mut self, config: &SimulationConfig) -> BeamResult<()> {
        (**self).generate(config)
    }

    fn step(&mut self) -> BeamResult<()> {
        (**self).step()
    }

    fn is_generated(&self) -> bool {
        (**self).is_generated()
    }

    fn step_index(&self) -> usize {
        (**self).step_index()
    }

    fn time(&self) -> f64 {
        (**self).time()
    }

    fn beam_frame_z(&self) -> f64 {
        (**self).beam_frame_z()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn particles(&self) -> Option<&ParticleSet> {
        (**self).particles()
    }

    fn envelope(&self) -> Option<EnvelopeState> {
        (**self).envelope()
    }

    fn moments(&self, windows: &WindowSet) -> BeamResult<Vec<Moments>> {
        (**self).moments(windows)
    }
}

/// Engine for `package`. The 3-D PIC package is provided by an external
/// engine and cannot be created here.
pub fn engine_for(package: Package) -> BeamResult<Box<dyn Engine>> {
    match package {
        Package::Envelope => Ok(Box::new(crate::envelope_engine::EnvelopeEngine::new())),
        Package::ThreeD => Err(BeamError::Engine(
            "package 'w3d' needs an external PIC engine".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_parsing() {
        assert_eq!("env".parse::<Package>().unwrap(), Package::Envelope);
        assert_eq!(" W3D ".parse::<Package>().unwrap(), Package::ThreeD);
        assert!(matches!("xy".parse::<Package>(), Err(BeamError::ConfigError(_))));
        assert_eq!(Package::ThreeD.to_string(), "w3d");
    }

    #[test]
    fn test_engine_for_packages() {
        let engine = engine_for(Package::Envelope).unwrap();
        assert_eq!(engine.package(), Package::Envelope);
        assert!(!engine.is_generated());
        assert!(matches!(engine_for(Package::ThreeD), Err(BeamError::Engine(_))));
    }
}
