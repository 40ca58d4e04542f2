//! Deterministic randomness. Every random decision in the pipeline draws
//! from a `Pcg32` derived from the configured seed.

use rand::SeedableRng;
use rand_pcg::Pcg32;

pub fn create_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Independent seed for a sub-stream (attempt, layer, channel...)
pub fn derive_seed(base: u64, index: u64) -> u64 {
    // SplitMix64 finalizer over the combined value
    let mut z = base ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn create_derived_rng(base: u64, index: u64) -> Pcg32 {
    create_rng(derive_seed(base, index))
}
