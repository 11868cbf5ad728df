//! # Oracle — Known Fermat Pseudoprime Membership
//!
//! Holds the Carmichael numbers up to the scan bound as a flat, strictly
//! increasing `Vec<u64>` and answers membership by binary search. The list is
//! loaded once before the scan starts and shared read-only (`&PseudoprimeOracle`)
//! by every worker; nothing mutates it afterwards.
//!
//! ## Source Format
//!
//! Whitespace-separated decimal integers in ascending order (one per line in
//! the published Carmichael tables). Loading stops at the first value above
//! `max_val`, so only the prefix relevant to the scan is ever parsed. The
//! ascending order of the source is a precondition and is not verified.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Sorted, duplicate-free set of known pseudoprimes `<= max_val`.
#[derive(Debug, Clone, Default)]
pub struct PseudoprimeOracle {
    values: Vec<u64>,
    max_val: u64,
}

impl PseudoprimeOracle {
    /// Read an ascending stream of integers, keeping those `<= max_val`.
    ///
    /// Stops consuming the reader at the first value above `max_val`.
    /// A token that is not a decimal `u64` is an input error.
    pub fn load<R: BufRead>(reader: R, max_val: u64) -> Result<Self> {
        let mut values = Vec::with_capacity(1024);
        'lines: for (idx, line) in reader.lines().enumerate() {
            let line = line
                .with_context(|| format!("failed to read pseudoprime list at line {}", idx + 1))?;
            for token in line.split_whitespace() {
                let value: u64 = token.parse().map_err(|_| {
                    anyhow::anyhow!("invalid pseudoprime '{}' at line {}", token, idx + 1)
                })?;
                if value > max_val {
                    break 'lines;
                }
                values.push(value);
            }
        }
        values.dedup();
        Ok(PseudoprimeOracle { values, max_val })
    }

    /// Open `path` and [`load`](Self::load) it.
    pub fn load_file(path: &Path, max_val: u64) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open pseudoprime list {}", path.display()))?;
        Self::load(BufReader::new(file), max_val)
    }

    /// Build from an in-memory ascending sequence, keeping the prefix `<= max_val`.
    pub fn from_sorted<I: IntoIterator<Item = u64>>(values: I, max_val: u64) -> Self {
        let mut values: Vec<u64> = values.into_iter().take_while(|&v| v <= max_val).collect();
        values.dedup();
        PseudoprimeOracle { values, max_val }
    }

    /// True iff `n` is one of the loaded pseudoprimes. O(log m).
    pub fn contains(&self, n: u64) -> bool {
        self.values.binary_search(&n).is_ok()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound the list was loaded against.
    pub fn max_val(&self) -> u64 {
        self.max_val
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }
}
