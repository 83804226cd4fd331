// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Property-Based Tests (proptest) for beam-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for beam-types using proptest.
//!
//! Covers: Grid3D construction invariants, config validation.

use beam_types::config::SimulationConfig;
use beam_types::state::Grid3D;
use proptest::prelude::*;

// ── Grid3D Construction Invariants ───────────────────────────────────

proptest! {
    /// Axis lengths are cell counts plus one.
    #[test]
    fn grid_axis_lengths(
        nx in 1usize..64,
        ny in 1usize..64,
        nz in 1usize..256,
    ) {
        let grid = Grid3D::new(nx, ny, nz, (-1.0, 1.0), (-2.0, 2.0), (-5.0, 5.0));
        prop_assert_eq!(grid.x.len(), nx + 1);
        prop_assert_eq!(grid.y.len(), ny + 1);
        prop_assert_eq!(grid.z.len(), nz + 1);
        prop_assert_eq!(grid.n_cells(), nx * ny * nz);
    }

    /// End nodes land on the requested extents.
    #[test]
    fn grid_boundary_values(
        nz in 2usize..200,
        z_min in -10.0f64..0.0,
        len in 0.1f64..20.0,
    ) {
        let z_max = z_min + len;
        let grid = Grid3D::new(4, 4, nz, (-1.0, 1.0), (-1.0, 1.0), (z_min, z_max));
        prop_assert!((grid.z[0] - z_min).abs() < 1e-12);
        prop_assert!((grid.z[nz] - z_max).abs() < 1e-9);
        prop_assert!((grid.dz * nz as f64 - len).abs() < 1e-9);
    }

    /// Node spacing is uniform and matches dz.
    #[test]
    fn grid_z_uniform_spacing(nz in 3usize..128) {
        let grid = Grid3D::new(4, 4, nz, (-1.0, 1.0), (-1.0, 1.0), (-0.72, 0.72));
        for i in 1..=nz {
            let delta = grid.z[i] - grid.z[i - 1];
            prop_assert!((delta - grid.dz).abs() < 1e-12,
                "Non-uniform z spacing at {}: delta={}, dz={}", i, delta, grid.dz);
        }
    }
}

// ── Config Validation ────────────────────────────────────────────────

proptest! {
    /// Any quadrupole shorter than the half period passes validation.
    #[test]
    fn short_quadrupoles_accepted(frac in 0.01f64..0.99) {
        let mut cfg = SimulationConfig::fodo3d();
        cfg.lattice.quad_length_m = frac * cfg.lattice.half_period_m;
        prop_assert!(cfg.validate().is_ok());
    }

    /// Quadrupoles at least as long as the half period are rejected.
    #[test]
    fn long_quadrupoles_rejected(frac in 1.0f64..3.0) {
        let mut cfg = SimulationConfig::fodo3d();
        cfg.lattice.quad_length_m = frac * cfg.lattice.half_period_m;
        prop_assert!(cfg.validate().is_err());
    }

    /// Non-positive kinetic energy is rejected.
    #[test]
    fn non_positive_energy_rejected(ekin in -1.0e6f64..=0.0) {
        let mut cfg = SimulationConfig::fodo3d();
        cfg.beam.ekin_ev = ekin;
        prop_assert!(cfg.validate().is_err());
    }
}
