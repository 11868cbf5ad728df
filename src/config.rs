//! # Config — Scan Configuration
//!
//! A scan is configured from three layers, later layers winning:
//!
//! 1. Built-in defaults (32-bit census, 16 rounds, 10^6-candidate chunks).
//! 2. An optional TOML file (`--config scan.toml`).
//! 3. CLI flags and their environment variables.
//!
//! ```toml
//! bits = 24
//! rounds = 16
//! chunk_size = 100000
//! seed = 42
//! pseudoprimes = "data/pureCarmichael.txt"
//! output = "data/results.csv"
//! summary = "data/summary.json"
//! ```
//!
//! `bits = B` is shorthand for `high = 2^B - 1` and takes precedence over
//! `high` once [`ScanConfig::resolve`] runs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BITS: u32 = 32;
pub const DEFAULT_ROUNDS: u32 = 16;
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;
pub const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub low: u64,
    pub high: u64,
    pub bits: Option<u32>,
    pub rounds: u32,
    pub chunk_size: u64,
    /// `None` derives a seed from the clock at startup.
    pub seed: Option<u64>,
    pub pseudoprimes: PathBuf,
    pub output: PathBuf,
    pub summary: Option<PathBuf>,
    pub checkpoint_interval_secs: u64,
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            low: 1,
            high: (1u64 << DEFAULT_BITS) - 1,
            bits: None,
            rounds: DEFAULT_ROUNDS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            seed: None,
            pseudoprimes: PathBuf::from("data/pureCarmichael.txt"),
            output: PathBuf::from("data/results.csv"),
            summary: None,
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL_SECS,
            parallel: true,
        }
    }
}

impl ScanConfig {
    /// Fold `bits` into `high` and check the configuration for consistency.
    pub fn resolve(mut self) -> Result<Self> {
        if let Some(bits) = self.bits.take() {
            self.high = max_for_bits(bits)?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.low > self.high {
            anyhow::bail!("scan range is empty: low {} > high {}", self.low, self.high);
        }
        if self.rounds == 0 {
            anyhow::bail!("rounds must be at least 1");
        }
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be at least 1");
        }
        Ok(())
    }

    /// Configured seed, or one derived from the current time.
    pub fn seed_or_now(&self) -> u64 {
        self.seed.unwrap_or_else(time_seed)
    }

    /// Number of candidates in `[low, high]` (saturating at `u64::MAX`).
    pub fn candidate_count(&self) -> u64 {
        (self.high - self.low).saturating_add(1)
    }
}

/// Largest value representable in `bits` bits.
pub fn max_for_bits(bits: u32) -> Result<u64> {
    match bits {
        1..=63 => Ok((1u64 << bits) - 1),
        64 => Ok(u64::MAX),
        _ => anyhow::bail!("bits must be between 1 and 64, got {}", bits),
    }
}

/// Seed from the wall clock in nanoseconds.
pub fn time_seed() -> u64 {
    let now = chrono::Utc::now();
    now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp()) as u64
}

/// Parse a scan configuration from a TOML string.
pub fn parse_toml(content: &str) -> Result<ScanConfig> {
    let config: ScanConfig = toml::from_str(content)?;
    Ok(config)
}

/// Parse a scan configuration from a TOML file path.
pub fn parse_toml_file(path: &Path) -> Result<ScanConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
    parse_toml(&content)
}
