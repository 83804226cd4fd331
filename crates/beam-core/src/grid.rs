// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Grid Construction
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Build the 3-D field grid and check that it contains the beam.

use beam_types::config::SimulationConfig;
use beam_types::error::{BeamError, BeamResult};
use beam_types::state::{EnvelopeSolution, Grid3D};

/// Build the grid after checking containment:
/// - transverse extents enclose the pipe radius (with four-fold symmetry
///   the lower bounds may sit on the `x = 0` / `y = 0` mirror planes),
/// - the longitudinal extent encloses the particle load region,
/// - the envelope solution, when given, covers the load region.
pub fn build_grid(config: &SimulationConfig, envelope: Option<&EnvelopeSolution>) -> BeamResult<Grid3D> {
    let g = &config.grid;
    let r = config.lattice.pipe_radius_m;

    for (lo, hi, axis) in [(g.x_min_m, g.x_max_m, "x"), (g.y_min_m, g.y_max_m, "y")] {
        let lower_ok = lo <= -r || (g.four_fold_symmetry && lo == 0.0);
        if hi < r || !lower_ok {
            return Err(BeamError::ConfigError(format!(
                "grid {axis} extent [{lo}, {hi}] does not enclose pipe radius {r}"
            )));
        }
    }

    let load = &config.loading;
    if load.z_min_m < g.z_min_m || load.z_max_m > g.z_max_m {
        return Err(BeamError::ConfigError(format!(
            "load region [{}, {}] exceeds grid z extent [{}, {}]",
            load.z_min_m, load.z_max_m, g.z_min_m, g.z_max_m
        )));
    }

    if let Some(env) = envelope {
        if env.is_empty() || env.z_lower() > load.z_min_m || env.z_upper() < load.z_max_m {
            return Err(BeamError::ConfigError(format!(
                "envelope range does not cover load region [{}, {}]",
                load.z_min_m, load.z_max_m
            )));
        }
        let max_radius = env.max_radius();
        if max_radius >= r {
            log::warn!(
                "envelope reaches {:.3} mm, beyond pipe radius {:.3} mm",
                max_radius * 1e3,
                r * 1e3
            );
        }
    }

    let grid = Grid3D::new(
        g.nx,
        g.ny,
        g.nz,
        (g.x_min_m, g.x_max_m),
        (g.y_min_m, g.y_max_m),
        (g.z_min_m, g.z_max_m),
    );
    log::debug!(
        "grid {}x{}x{}, dx = {:.4e} m, dz = {:.4e} m, solver {:?}",
        grid.nx,
        grid.ny,
        grid.nz,
        grid.dx,
        grid.dz,
        g.solver
    );
    Ok(grid)
}
