//! Deterministic RNG using PCG32 with BLAKE3 seed derivation.
//!
//! Every random draw in the backend (currently only timing humanisation)
//! flows through a generator created here from the request seed. There is no
//! process-wide RNG: two runs with the same seed and inputs produce identical
//! charts.

use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Creates a PCG32 RNG from a 32-bit seed.
///
/// The seed is duplicated into both halves of the 64-bit PCG32 state.
pub fn create_rng(seed: u32) -> Pcg32 {
    let seed64 = (seed as u64) | ((seed as u64) << 32);
    Pcg32::seed_from_u64(seed64)
}

/// Derives an independent seed for one strategy from the request seed.
///
/// Hashes the base seed (little-endian) followed by the strategy id with
/// BLAKE3 and keeps the first four bytes.
pub fn derive_strategy_seed(base_seed: u32, strategy_id: &str) -> u32 {
    let mut input = Vec::with_capacity(4 + strategy_id.len());
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(strategy_id.as_bytes());

    let hash = blake3::hash(&input);
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&hash.as_bytes()[..4]);
    u32::from_le_bytes(bytes)
}

/// Creates the RNG used by one strategy attempt.
pub fn create_strategy_rng(base_seed: u32, strategy_id: &str) -> Pcg32 {
    create_rng(derive_strategy_seed(base_seed, strategy_id))
}
