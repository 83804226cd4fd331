// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — FODO Run Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Derive and match the beam, step the envelope package through the
//! lattice, load the matched particles and write a JSON report.

mod report;

use beam_control::engine::Engine;
use beam_control::envelope_engine::EnvelopeEngine;
use beam_control::hooks::{ApertureHook, HistoryHook, HookAction, PeriodicHook, ScheduleHook};
use beam_control::runner::Simulation;
use beam_core::grid::build_grid;
use beam_core::loader::ParticleLoader;
use beam_diagnostics::history::MomentHistory;
use beam_diagnostics::windows::WindowSet;
use beam_types::config::SimulationConfig;
use clap::Parser;
use log::LevelFilter;
use report::{EnvelopeSummary, FodoReport, GridSummary, LoadSummary};
use std::error::Error;
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "beam-fodo",
    about = "Matched KV envelope and particle load for a periodic FODO channel"
)]
pub struct CommandLineArguments {
    /// JSON run configuration (built-in FODO3D example if omitted)
    #[arg(long, short)]
    config: Option<String>,
    /// Write the JSON report here instead of stdout
    #[arg(long, short)]
    output: Option<String>,
    /// Solve the quadrupole gradient for the configured σ0
    #[arg(long)]
    solve_gradient: bool,
    /// Solve the emittance for the configured depressed σ
    #[arg(long)]
    solve_emittance: bool,
    /// Override the number of engine steps
    #[arg(long)]
    steps: Option<usize>,
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = CommandLineArguments::parse();

    env_logger::builder()
        .format_timestamp_secs()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let now = Instant::now();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::fodo3d(),
    };
    if args.solve_gradient {
        config.matching.solve_gradient = true;
    }
    if args.solve_emittance {
        config.matching.solve_emittance = true;
    }
    if let Some(n) = args.steps {
        config.n_steps = n;
    }
    config.validate()?;
    if !config.labels.title.is_empty() {
        log::info!("{} {}", config.labels.title, config.labels.subtitle);
    }

    // Step the envelope package with the configured diagnostics attached
    let windows = WindowSet::from_config(&config.diagnostics, config.grid.z_min_m, config.grid.z_max_m)?;
    let history = MomentHistory::from_config(&config.diagnostics, windows.len())?;
    let history_hook = HistoryHook::new(windows, history);
    let history_handle = history_hook.handle();

    let mut simulation = Simulation::new(EnvelopeEngine::new());
    simulation.add_hook(Box::new(history_hook));
    simulation.add_hook(Box::new(PeriodicHook::new(
        "runtime",
        config.diagnostics.runtime_period,
        |engine: &dyn Engine| {
            if let Some(s) = engine.envelope() {
                log::info!(
                    "step {:5}  z = {:8.4} m  a = {:7.3} mm  b = {:7.3} mm",
                    engine.step_index(),
                    engine.beam_frame_z(),
                    s.a * 1e3,
                    s.b * 1e3
                );
            }
            Ok(HookAction::Continue)
        },
    )));
    simulation.add_hook(Box::new(ScheduleHook::new(
        "plot_schedule",
        config.diagnostics.plot_schedule,
        |engine: &dyn Engine| {
            log::debug!("plot point at z = {:.4} m", engine.beam_frame_z());
            Ok(HookAction::Continue)
        },
    )));
    simulation.add_hook(Box::new(ApertureHook::new(config.lattice.pipe_radius_m)));

    simulation.generate(&config)?;
    let run = simulation.run(config.n_steps)?;
    if let Some(stop) = &run.stopped {
        log::warn!("run stopped by '{}': {}", stop.hook, stop.reason);
    }

    let engine = simulation.into_engine();
    let setup = engine
        .setup()
        .cloned()
        .ok_or("envelope engine finished without a setup")?;

    // Particle load shaped by the envelope over the full range
    let envelope = setup.solve_envelope(&config)?;
    let grid = build_grid(&config, Some(&envelope))?;
    let loader = ParticleLoader::new(&setup.beam, &envelope, setup.smooth_focusing_k0())?;
    let particles = loader.load(&config.loading)?;
    let load_windows = WindowSet::from_config(&config.diagnostics, config.grid.z_min_m, config.grid.z_max_m)?;
    let bg = setup.beam.beta * setup.beam.gamma;
    let moments = load_windows.moments(&particles, 0.0, bg);

    let history = history_handle.borrow().clone();
    let report = FodoReport {
        labels: config.labels.clone(),
        beam: setup.beam.clone(),
        gradient_t_per_m: setup.gradient_t_per_m,
        sigma0_deg: setup.sigma0_rad.to_degrees(),
        dt_s: setup.dt_s,
        matched: setup.matched,
        run,
        history,
        grid: GridSummary::from_grid(&grid),
        envelope: EnvelopeSummary::from_solution(&envelope),
        load: LoadSummary::new(&particles, moments),
    };

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("report written to {path}");
        }
        None => println!("{json}"),
    }

    log::info!("finished in {:.2} s", now.elapsed().as_secs_f64());
    Ok(())
}
