//! # Summary — Per-Bit-Length Scan Statistics
//!
//! Aggregates verdict records as they stream to the report, grouped by the
//! bit length of the candidate:
//!
//! - **not_prime**: records with `is_truly_prime = false` (proven composites,
//!   known pseudoprimes, and 0/1).
//! - **false_positives**: the subset that still passed every Fermat round,
//!   i.e. pseudoprimes the oracle caught.
//! - **total_elapsed_ns**: summed Fermat timings, for mean cost per bit length.
//!
//! The summary is serializable so it can ride along in the scan checkpoint
//! and survive a resume.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::pipeline::VerdictRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitLengthStats {
    pub candidates: u64,
    pub not_prime: u64,
    pub false_positives: u64,
    pub total_elapsed_ns: u64,
}

impl BitLengthStats {
    /// Fraction of non-primes that passed the Fermat test.
    pub fn false_positive_rate(&self) -> Option<f64> {
        (self.not_prime > 0).then(|| self.false_positives as f64 / self.not_prime as f64)
    }

    pub fn mean_elapsed_ns(&self) -> Option<f64> {
        (self.candidates > 0).then(|| self.total_elapsed_ns as f64 / self.candidates as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub candidates: u64,
    pub probable_primes: u64,
    pub true_primes: u64,
    pub proven_composites: u64,
    pub pseudoprime_hits: u64,
    pub by_bit_length: BTreeMap<u32, BitLengthStats>,
}

impl ScanSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &VerdictRecord) {
        self.candidates += 1;
        let caught = record.probably_prime && !record.is_truly_prime;
        if record.probably_prime {
            self.probable_primes += 1;
        }
        if record.is_truly_prime {
            self.true_primes += 1;
        }
        if record.counter_witness.is_some() {
            self.proven_composites += 1;
        }
        if caught {
            self.pseudoprime_hits += 1;
        }

        let stats = self.by_bit_length.entry(record.bit_length).or_default();
        stats.candidates += 1;
        stats.total_elapsed_ns = stats.total_elapsed_ns.saturating_add(record.elapsed_ns);
        if !record.is_truly_prime {
            stats.not_prime += 1;
        }
        if caught {
            stats.false_positives += 1;
        }
    }

    /// Overall fraction of non-primes that passed the Fermat test.
    pub fn false_positive_rate(&self) -> Option<f64> {
        let not_prime = self.candidates - self.true_primes;
        (not_prime > 0).then(|| self.pseudoprime_hits as f64 / not_prime as f64)
    }

    /// Flattened view with derived rates, as written to the summary file.
    pub fn report(&self) -> SummaryReport {
        SummaryReport {
            candidates: self.candidates,
            probable_primes: self.probable_primes,
            true_primes: self.true_primes,
            proven_composites: self.proven_composites,
            pseudoprime_hits: self.pseudoprime_hits,
            false_positive_rate: self.false_positive_rate(),
            by_bit_length: self
                .by_bit_length
                .iter()
                .map(|(&bits, stats)| BitLengthRow {
                    bits,
                    candidates: stats.candidates,
                    not_prime: stats.not_prime,
                    false_positives: stats.false_positives,
                    false_positive_rate: stats.false_positive_rate(),
                    mean_elapsed_ns: stats.mean_elapsed_ns(),
                })
                .collect(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.report())?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
        Ok(())
    }

    pub fn log(&self) {
        info!(
            candidates = self.candidates,
            probable_primes = self.probable_primes,
            true_primes = self.true_primes,
            proven_composites = self.proven_composites,
            pseudoprime_hits = self.pseudoprime_hits,
            false_positive_rate = format_args!("{:.6}", self.false_positive_rate().unwrap_or(0.0)),
            "scan summary"
        );
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub candidates: u64,
    pub probable_primes: u64,
    pub true_primes: u64,
    pub proven_composites: u64,
    pub pseudoprime_hits: u64,
    pub false_positive_rate: Option<f64>,
    pub by_bit_length: Vec<BitLengthRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BitLengthRow {
    pub bits: u32,
    pub candidates: u64,
    pub not_prime: u64,
    pub false_positives: u64,
    pub false_positive_rate: Option<f64>,
    pub mean_elapsed_ns: Option<f64>,
}
