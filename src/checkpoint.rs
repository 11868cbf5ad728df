//! # Checkpoint — Resumable Scan State
//!
//! Saves scan progress as JSON with a SHA-256 integrity checksum and
//! generational backups, so a census interrupted hours into a 32-bit range
//! restarts at the last completed chunk instead of at `low`.
//!
//! ## Atomic Writes
//!
//! Checkpoint files are written to a temp file and renamed into place, so a
//! crash mid-write never leaves a truncated checkpoint behind.
//!
//! ## Integrity
//!
//! The SHA-256 of the pretty-printed data is stored in the envelope and
//! verified on load. A corrupted file is skipped in favour of the most recent
//! valid generation (up to 3 generations kept).
//!
//! ## Resume Contract
//!
//! `output_len` is the size of the CSV report after the last row of chunk
//! `next - 1` was flushed. Resuming truncates the report to that length, so
//! rows written after the checkpoint are never duplicated.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::ScanConfig;
use crate::summary::ScanSummary;

/// Number of backup generations to keep.
const GENERATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCheckpoint {
    /// First candidate not yet written.
    pub next: u64,
    pub low: u64,
    pub high: u64,
    pub rounds: u32,
    pub seed: u64,
    pub pseudoprimes: PathBuf,
    /// Report the scan was writing.
    pub output: PathBuf,
    /// Report size in bytes at checkpoint time.
    pub output_len: u64,
    #[serde(default)]
    pub summary: ScanSummary,
}

impl ScanCheckpoint {
    /// Whether this checkpoint belongs to the scan described by `config`.
    ///
    /// A configuration without an explicit seed adopts the checkpoint's seed.
    /// The report and pseudoprime paths must be the same ones, since
    /// `output_len` only describes the file the checkpoint was taken against.
    pub fn matches(&self, config: &ScanConfig) -> bool {
        self.low == config.low
            && self.high == config.high
            && self.rounds == config.rounds
            && config.seed.map_or(true, |seed| seed == self.seed)
            && self.output == config.output
            && self.pseudoprimes == config.pseudoprimes
            && self.next > self.low
            && self.next <= self.high
    }
}

/// Wrapper that includes a SHA-256 checksum for integrity verification.
#[derive(Serialize, Deserialize)]
struct CheckpointEnvelope {
    checksum: String,
    data: serde_json::Value,
}

/// Compute SHA-256 hex digest of a string.
fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Return the path for generation `gen` (0 = current, 1 = .1, 2 = .2, ...).
fn generation_path(base: &Path, gen: usize) -> PathBuf {
    if gen == 0 {
        base.to_path_buf()
    } else {
        let mut p = base.as_os_str().to_os_string();
        p.push(format!(".{}", gen));
        PathBuf::from(p)
    }
}

/// Save a checkpoint with integrity checksum and rotating generations.
///
/// Rotation: current → .1 → .2 (oldest .2 is discarded).
pub fn save(path: &Path, checkpoint: &ScanCheckpoint) -> Result<()> {
    for gen in (1..GENERATIONS).rev() {
        let src = generation_path(path, gen - 1);
        let dst = generation_path(path, gen);
        if src.exists() {
            let _ = fs::rename(&src, &dst);
        }
    }

    let data = serde_json::to_value(checkpoint)?;
    let data_str = serde_json::to_string_pretty(&data)?;
    let checksum = sha256_hex(&data_str);

    let envelope = CheckpointEnvelope { checksum, data };
    let json = serde_json::to_string_pretty(&envelope)?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;

    Ok(())
}

/// Load the newest valid checkpoint, falling back to older generations on corruption.
pub fn load(path: &Path) -> Option<ScanCheckpoint> {
    for gen in 0..GENERATIONS {
        let p = generation_path(path, gen);
        if let Some(cp) = load_single(&p) {
            if gen > 0 {
                warn!(
                    generation = gen,
                    path = %p.display(),
                    "recovered checkpoint from older generation"
                );
            }
            return Some(cp);
        }
    }
    None
}

/// Try to load and verify a single checkpoint file.
fn load_single(path: &Path) -> Option<ScanCheckpoint> {
    let raw = fs::read_to_string(path).ok()?;
    let envelope: CheckpointEnvelope = serde_json::from_str(&raw).ok()?;

    let data_str = serde_json::to_string_pretty(&envelope.data).ok()?;
    let expected = sha256_hex(&data_str);
    if expected != envelope.checksum {
        warn!(
            path = %path.display(),
            expected = &expected[..12],
            found = &envelope.checksum[..12.min(envelope.checksum.len())],
            "checkpoint integrity check failed"
        );
        return None;
    }

    serde_json::from_value(envelope.data).ok()
}

/// Clear all checkpoint files (current + all generations).
pub fn clear(path: &Path) {
    for gen in 0..GENERATIONS {
        let _ = fs::remove_file(generation_path(path, gen));
    }
    let _ = fs::remove_file(path.with_extension("tmp"));
}
