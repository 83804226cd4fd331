// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Property-Based Tests (proptest) for beam-diagnostics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for beam-diagnostics using proptest.
//!
//! Covers: moment invariance under transverse offsets, window counting,
//! schedule firing counts.

use beam_diagnostics::schedule::ScheduleTrigger;
use beam_diagnostics::windows::compute_moments;
use beam_types::config::PlotSchedule;
use beam_types::state::ParticleSet;
use proptest::prelude::*;

fn cloud(n: usize, seed: u64, dx: f64) -> ParticleSet {
    let mut p = ParticleSet::with_capacity(n, 1.0);
    p.weight = 1.0;
    for i in 0..n {
        let s = (i as f64 + seed as f64 * 0.37).sin();
        let c = (1.3 * i as f64 + seed as f64).cos();
        p.push([0.01 * s + dx, 0.02 * c, i as f64 / n as f64], [10.0 * c, -5.0 * s, 1000.0]);
    }
    p
}

// ── Moment Properties ────────────────────────────────────────────────

proptest! {
    /// Rms size and emittance do not depend on a transverse offset.
    #[test]
    fn moments_offset_invariant(seed in 0u64..500, dx in -0.05f64..0.05) {
        let a = compute_moments(&cloud(400, seed, 0.0), 0.0, 1.0, 1.0);
        let b = compute_moments(&cloud(400, seed, dx), 0.0, 1.0, 1.0);
        prop_assert!((a.x_rms - b.x_rms).abs() < 1e-9);
        prop_assert!((a.emittance_x - b.emittance_x).abs() < 1e-9 * (1.0 + a.emittance_x));
        prop_assert!((b.x_mean - a.x_mean - dx).abs() < 1e-12);
    }
}

proptest! {
    /// Particle counts in disjoint windows add up to the count in their union.
    #[test]
    fn window_counts_additive(split in 0.01f64..0.99) {
        let p = cloud(300, 3, 0.0);
        let left = compute_moments(&p, 0.0, split, 1.0).count;
        let right = compute_moments(&p, split, 1.0, 1.0).count;
        prop_assert_eq!(left + right, 300);
    }
}

// ── Schedule Properties ──────────────────────────────────────────────

proptest! {
    /// Stepping one period per step fires on every step inside the range.
    #[test]
    fn schedule_fires_each_period(period in 0.1f64..2.0, n in 1usize..50) {
        let mut t = ScheduleTrigger::new(PlotSchedule {
            z_start_m: 0.0,
            z_end_m: f64::MAX,
            z_period_m: period,
        });
        let mut fired = 0;
        for k in 0..n {
            // Land just past each trigger point.
            if t.check(k as f64 * period * (1.0 + 1e-12)) {
                fired += 1;
            }
        }
        prop_assert_eq!(fired, n);
    }
}
