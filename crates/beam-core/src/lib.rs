//! FODO lattice, KV envelope solver and matching calculator.
//!
//! Everything upstream of the 3-D PIC engine: derived beam quantities,
//! the lattice descriptor, envelope integration, matching, grid checks
//! and envelope-shaped particle loading.

pub mod envelope;
pub mod grid;
pub mod lattice;
pub mod loader;
pub mod matching;
pub mod setup;
pub mod species;
pub mod transfer;
