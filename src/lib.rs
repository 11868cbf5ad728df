//! # fermat-census — Fermat Probable-Prime Census
//!
//! Classifies every integer of a bounded range with the randomized Fermat
//! test and resolves each "probably prime" verdict against a precomputed list
//! of Carmichael numbers, the composites that pass Fermat's test for every
//! coprime base.
//!
//! ## Pipeline
//!
//! ```text
//! chunk_ranges ─▶ fermat_test (GmpSampler) ─▶ PseudoprimeOracle ─▶ VerdictRecord ─▶ CsvReport
//! ```
//!
//! - [`oracle`]: sorted pseudoprime list with binary-search membership.
//! - [`witness`]: coprime base sampling by rejection (GMP random state).
//! - [`fermat`]: k-round Fermat test with counter-witness extraction.
//! - [`pipeline`]: per-candidate classification, lazy range iterator and the
//!   rayon-parallel chunk classifier.
//! - [`scan`]: the resumable scan driver used by the CLI.

pub mod arith;
pub mod checkpoint;
pub mod config;
pub mod fermat;
pub mod oracle;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod scan;
pub mod summary;
pub mod witness;

/// Number of bits in the binary representation of `n` (1 for `n = 0`).
pub fn bit_length(n: u64) -> u32 {
    if n == 0 {
        1
    } else {
        u64::BITS - n.leading_zeros()
    }
}

/// Derive the seed for the random stream of the block starting at `block_start`.
///
/// SplitMix64 finalizer over `seed ^ block_start`. Every block gets a
/// statistically independent stream, and the stream depends only on the scan
/// seed and the block position, never on thread scheduling.
pub fn chunk_seed(seed: u64, block_start: u64) -> u64 {
    let mut z = (seed ^ block_start.rotate_left(32)).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
