//! Mathematical primitives for SCPN Beam Core.

pub mod interp;
pub mod linalg;
pub mod ode;
pub mod roots;
