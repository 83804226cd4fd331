// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Beam Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Run control: engine interface, built-in envelope package, step hooks
//! and the simulation runner.

pub mod engine;
pub mod envelope_engine;
pub mod hooks;
pub mod runner;
