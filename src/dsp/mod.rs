//! Signal primitives shared by the analyzer, repair stage and mastering chain.
//!
//! Everything here is a stateless function over sample slices.

pub mod envelope;
pub mod filter;
pub mod level;
pub mod loudness;
pub mod noise;
pub mod spectrum;

/// Floor added before logarithms and divisions so silence never yields
/// `-inf` or NaN
pub const NUMERIC_FLOOR: f64 = 1e-10;
