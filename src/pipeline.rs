//! # Pipeline — Range Classification
//!
//! Turns a contiguous range `[low, high]` into one [`VerdictRecord`] per
//! integer, in strictly ascending candidate order.
//!
//! ## Per-Candidate Flow
//!
//! 1. Time the Fermat test with a monotonic clock (reported, never used for
//!    decisions).
//! 2. Composite verdict: keep the counter-witness, `is_truly_prime = false`
//!    without consulting the oracle.
//! 3. Probable prime: `is_truly_prime = !oracle.contains(n)`.
//!
//! ## Chunking and Parallelism
//!
//! [`chunk_ranges`] partitions the range into contiguous, gap-free chunks
//! (the last one truncated at `high`). Inside a chunk, candidates are grouped
//! into blocks of [`SAMPLER_BLOCK`]; each block owns a [`GmpSampler`] seeded by
//! [`chunk_seed`]`(seed, block_start)`. Blocks are classified in parallel with
//! rayon and reassembled in order, so the sequential and parallel paths emit
//! identical records apart from timings.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Instant;

use crate::fermat;
use crate::oracle::PseudoprimeOracle;
use crate::witness::{GmpSampler, WitnessSampler};
use crate::{bit_length, chunk_seed};

/// Candidates sharing one random stream.
pub const SAMPLER_BLOCK: u64 = 4096;

/// Classification of a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub candidate: u64,
    pub bit_length: u32,
    pub probably_prime: bool,
    /// Present iff `probably_prime` is false and `candidate >= 2`.
    pub counter_witness: Option<u64>,
    pub is_truly_prime: bool,
    /// Wall time of the Fermat test in nanoseconds.
    pub elapsed_ns: u64,
}

/// Classify one candidate against the oracle.
pub fn classify_candidate<S: WitnessSampler>(
    n: u64,
    rounds: u32,
    oracle: &PseudoprimeOracle,
    sampler: &mut S,
) -> VerdictRecord {
    let start = Instant::now();
    let verdict = fermat::fermat_test(n, rounds, sampler);
    let elapsed_ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);

    let is_truly_prime = verdict.probably_prime && !oracle.contains(n);

    VerdictRecord {
        candidate: n,
        bit_length: bit_length(n),
        probably_prime: verdict.probably_prime,
        counter_witness: verdict.counter_witness,
        is_truly_prime,
        elapsed_ns,
    }
}

/// Contiguous sub-ranges of `[low, high]` of at most `chunk_size` values.
///
/// A `chunk_size` of 0 is treated as 1. Empty when `low > high`.
pub fn chunk_ranges(low: u64, high: u64, chunk_size: u64) -> ChunkRanges {
    ChunkRanges {
        next: (low <= high).then_some(low),
        high,
        chunk_size: chunk_size.max(1),
    }
}

#[derive(Debug, Clone)]
pub struct ChunkRanges {
    next: Option<u64>,
    high: u64,
    chunk_size: u64,
}

impl Iterator for ChunkRanges {
    type Item = RangeInclusive<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let end = start.saturating_add(self.chunk_size - 1).min(self.high);
        self.next = if end >= self.high { None } else { Some(end + 1) };
        Some(start..=end)
    }
}

/// Lazily classify every integer of `[low, high]` in ascending order.
pub fn classify_range<S: WitnessSampler>(
    low: u64,
    high: u64,
    rounds: u32,
    chunk_size: u64,
    oracle: &PseudoprimeOracle,
    sampler: S,
) -> ClassifyRange<'_, S> {
    ClassifyRange {
        chunks: chunk_ranges(low, high, chunk_size),
        current: None,
        rounds,
        oracle,
        sampler,
    }
}

pub struct ClassifyRange<'a, S> {
    chunks: ChunkRanges,
    current: Option<RangeInclusive<u64>>,
    rounds: u32,
    oracle: &'a PseudoprimeOracle,
    sampler: S,
}

impl<S: WitnessSampler> Iterator for ClassifyRange<'_, S> {
    type Item = VerdictRecord;

    fn next(&mut self) -> Option<VerdictRecord> {
        loop {
            if let Some(n) = self.current.as_mut().and_then(|range| range.next()) {
                return Some(classify_candidate(
                    n,
                    self.rounds,
                    self.oracle,
                    &mut self.sampler,
                ));
            }
            self.current = Some(self.chunks.next()?);
        }
    }
}

/// Classify one block with its own seeded random stream.
fn classify_block(
    block: RangeInclusive<u64>,
    rounds: u32,
    oracle: &PseudoprimeOracle,
    seed: u64,
) -> Vec<VerdictRecord> {
    let (low, high) = (*block.start(), *block.end());
    let sampler = GmpSampler::from_seed(chunk_seed(seed, low));
    classify_range(low, high, rounds, SAMPLER_BLOCK, oracle, sampler).collect()
}

/// Classify a chunk block by block on the current thread.
pub fn classify_chunk_seq(
    chunk: RangeInclusive<u64>,
    rounds: u32,
    oracle: &PseudoprimeOracle,
    seed: u64,
) -> Vec<VerdictRecord> {
    chunk_ranges(*chunk.start(), *chunk.end(), SAMPLER_BLOCK)
        .flat_map(|block| classify_block(block, rounds, oracle, seed))
        .collect()
}

/// Classify a chunk with blocks spread over the rayon pool.
///
/// Blocks are collected in order before flattening, so the output is
/// ascending regardless of which worker finished first.
pub fn classify_chunk_par(
    chunk: RangeInclusive<u64>,
    rounds: u32,
    oracle: &PseudoprimeOracle,
    seed: u64,
) -> Vec<VerdictRecord> {
    let blocks: Vec<RangeInclusive<u64>> =
        chunk_ranges(*chunk.start(), *chunk.end(), SAMPLER_BLOCK).collect();
    let per_block: Vec<Vec<VerdictRecord>> = blocks
        .into_par_iter()
        .map(|block| classify_block(block, rounds, oracle, seed))
        .collect();
    per_block.into_iter().flatten().collect()
}

/// Dispatch to the parallel or sequential chunk classifier.
pub fn classify_chunk(
    chunk: RangeInclusive<u64>,
    rounds: u32,
    oracle: &PseudoprimeOracle,
    seed: u64,
    parallel: bool,
) -> Vec<VerdictRecord> {
    if parallel {
        classify_chunk_par(chunk, rounds, oracle, seed)
    } else {
        classify_chunk_seq(chunk, rounds, oracle, seed)
    }
}
