// ─────────────────────────────────────────────────────────────────────
// SCPN Beam Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Speed of light in vacuum (m/s)
pub const C_LIGHT: f64 = 299_792_458.0;

/// Elementary charge (C)
pub const Q_ELEMENTARY: f64 = 1.602176634e-19;

/// Vacuum permittivity (F/m)
pub const EPSILON0: f64 = 8.8541878128e-12;

/// Atomic mass unit (kg)
pub const AMU: f64 = 1.66053906660e-27;

/// Electron-volt to joule.
pub const EV_TO_J: f64 = Q_ELEMENTARY;

/// Potassium atomic mass (amu)
pub const POTASSIUM_AMU: f64 = 39.0983;

/// Unit multipliers. Lengths are MKS; kinetic energy is carried in eV.
pub const MM: f64 = 1.0e-3;
pub const CM: f64 = 1.0e-2;
pub const MILLIAMP: f64 = 1.0e-3;
pub const KV: f64 = 1.0e3;

/// Hand-tuned focusing integral `G · L_q` [T] giving σ0 = 72° for K+ at 80 keV
/// in a 0.36 m half-period lattice.
pub const FODO3D_GRADIENT_INTEGRAL: f64 = 0.93230106124518164;
