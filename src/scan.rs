//! # Scan — Census Driver
//!
//! Runs a full census over `[low, high]`: loads the pseudoprime oracle,
//! classifies the range chunk by chunk, streams rows to the CSV report,
//! folds them into the [`ScanSummary`] and checkpoints periodically.
//!
//! A checkpoint is only taken on a chunk boundary after the report has been
//! flushed, so `output_len` always ends on a complete row. A matching
//! checkpoint found at startup resumes from `next` with the recorded seed.
//! A stale one (different range, rounds, seed, report or pseudoprime list)
//! is ignored with a warning, and so is one whose report is missing or
//! shorter than the checkpointed length.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::checkpoint::{self, ScanCheckpoint};
use crate::config::ScanConfig;
use crate::oracle::PseudoprimeOracle;
use crate::pipeline;
use crate::progress::Progress;
use crate::report;
use crate::summary::ScanSummary;

pub fn run(
    config: &ScanConfig,
    progress: &Arc<Progress>,
    checkpoint_path: &Path,
) -> Result<ScanSummary> {
    let oracle = PseudoprimeOracle::load_file(&config.pseudoprimes, config.high)?;
    info!(
        path = %config.pseudoprimes.display(),
        pseudoprimes = oracle.len(),
        max_val = config.high,
        "pseudoprime oracle loaded"
    );

    let resume = match checkpoint::load(checkpoint_path) {
        Some(cp) if cp.matches(config) => {
            let on_disk = fs::metadata(&config.output).map(|m| m.len()).ok();
            if on_disk.is_some_and(|len| len >= cp.output_len) {
                Some(cp)
            } else {
                warn!(
                    path = %checkpoint_path.display(),
                    output = %config.output.display(),
                    expected_len = cp.output_len,
                    found_len = ?on_disk,
                    "report is missing or shorter than its checkpoint, starting fresh"
                );
                None
            }
        }
        Some(cp) => {
            warn!(
                path = %checkpoint_path.display(),
                low = cp.low,
                high = cp.high,
                rounds = cp.rounds,
                output = %cp.output.display(),
                "checkpoint belongs to a different scan, starting fresh"
            );
            None
        }
        None => None,
    };

    let (seed, start, mut summary, mut report) = match resume {
        Some(cp) => {
            info!(next = cp.next, output_len = cp.output_len, "resuming scan");
            let report = report::reopen(&config.output, cp.output_len)?;
            (cp.seed, cp.next, cp.summary, report)
        }
        None => (
            config.seed_or_now(),
            config.low,
            ScanSummary::new(),
            report::create(&config.output)?,
        ),
    };

    info!(
        low = config.low,
        high = config.high,
        start,
        candidates = config.candidate_count(),
        rounds = config.rounds,
        chunk_size = config.chunk_size,
        seed,
        parallel = config.parallel,
        threads = rayon::current_num_threads(),
        output = %config.output.display(),
        "scan starting"
    );

    let mut last_checkpoint = Instant::now();
    for chunk in pipeline::chunk_ranges(start, config.high, config.chunk_size) {
        let end = *chunk.end();
        progress.set_current(format!("[{}..{}]", chunk.start(), end));

        let records =
            pipeline::classify_chunk(chunk, config.rounds, &oracle, seed, config.parallel);

        let mut probable = 0u64;
        let mut caught = 0u64;
        for record in &records {
            report.write_record(record)?;
            summary.observe(record);
            if record.probably_prime {
                probable += 1;
                if !record.is_truly_prime {
                    caught += 1;
                }
            }
        }
        progress.tested.fetch_add(records.len() as u64, Ordering::Relaxed);
        progress.probable.fetch_add(probable, Ordering::Relaxed);
        progress.pseudoprimes.fetch_add(caught, Ordering::Relaxed);

        if end < config.high
            && last_checkpoint.elapsed().as_secs() >= config.checkpoint_interval_secs
        {
            report.flush()?;
            checkpoint::save(
                checkpoint_path,
                &ScanCheckpoint {
                    next: end + 1,
                    low: config.low,
                    high: config.high,
                    rounds: config.rounds,
                    seed,
                    pseudoprimes: config.pseudoprimes.clone(),
                    output: config.output.clone(),
                    output_len: report.bytes_written(),
                    summary: summary.clone(),
                },
            )?;
            debug!(next = end + 1, output_len = report.bytes_written(), "checkpoint saved");
            last_checkpoint = Instant::now();
        }
    }

    let rows = report.rows();
    report.finish()?;
    checkpoint::clear(checkpoint_path);
    info!(rows, output = %config.output.display(), "report written");

    if let Some(path) = &config.summary {
        summary.write_json(path)?;
        info!(path = %path.display(), "summary written");
    }
    summary.log();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(dir: &Path) -> ScanConfig {
        let pseudoprimes = dir.join("carmichael.txt");
        fs::write(&pseudoprimes, "561\n1105\n1729\n2465\n2821\n6601\n8911\n").unwrap();
        ScanConfig {
            low: 1,
            high: 3000,
            rounds: 16,
            chunk_size: 500,
            seed: Some(11),
            pseudoprimes,
            output: dir.join("out").join("results.csv"),
            checkpoint_interval_secs: 0,
            ..ScanConfig::default()
        }
    }

    fn rows_without_timing(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(|line| {
                let mut fields: Vec<&str> = line.split(',').collect();
                fields[3] = "";
                fields.join(",")
            })
            .collect()
    }

    #[test]
    fn full_scan_writes_every_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let progress = Progress::new();
        let cp_path = dir.path().join("scan.checkpoint");

        let summary = run(&config, &progress, &cp_path).unwrap();

        assert_eq!(summary.candidates, 3000);
        // pi(3000) = 430; 561, 1105, 1729, 2465 and 2821 are caught.
        assert_eq!(summary.true_primes, 430);
        assert_eq!(summary.pseudoprime_hits, 5);
        assert_eq!(progress.tested.load(Ordering::Relaxed), 3000);
        assert_eq!(rows_without_timing(&config.output).len(), 3000);
        assert!(!cp_path.exists());
    }

    #[test]
    fn summary_file_is_written_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig {
            high: 100,
            summary: Some(dir.path().join("summary.json")),
            ..setup(dir.path())
        };
        run(&config, &Progress::new(), &dir.path().join("scan.checkpoint")).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(value["candidates"], 100);
        assert_eq!(value["true_primes"], 25);
    }

    #[test]
    fn missing_oracle_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig {
            pseudoprimes: dir.path().join("absent.txt"),
            ..setup(dir.path())
        };
        assert!(run(&config, &Progress::new(), &dir.path().join("cp")).is_err());
    }

    fn checkpoint_at(config: &ScanConfig, next: u64, output_len: u64) -> ScanCheckpoint {
        ScanCheckpoint {
            next,
            low: config.low,
            high: config.high,
            rounds: config.rounds,
            seed: 11,
            pseudoprimes: config.pseudoprimes.clone(),
            output: config.output.clone(),
            output_len,
            summary: ScanSummary::new(),
        }
    }

    /// Run the whole scan, then rewind the report and checkpoint to look like
    /// a crash after chunk [501..1000] with 200 more rows half-written.
    /// Returns the rows of the uninterrupted run.
    fn interrupt_after_two_chunks(config: &ScanConfig, cp_path: &Path) -> Vec<String> {
        run(config, &Progress::new(), cp_path).unwrap();
        let expected = rows_without_timing(&config.output);

        let content = fs::read_to_string(&config.output).unwrap();
        let keep: usize = content.lines().take(1 + 1000).map(|l| l.len() + 1).sum();
        let partial: usize = content.lines().take(1 + 1200).map(|l| l.len() + 1).sum();
        fs::write(&config.output, &content[..partial]).unwrap();

        let oracle = PseudoprimeOracle::load_file(&config.pseudoprimes, config.high).unwrap();
        let mut cp = checkpoint_at(config, 1001, keep as u64);
        for r in pipeline::classify_chunk(1..=1000, config.rounds, &oracle, 11, false) {
            cp.summary.observe(&r);
        }
        checkpoint::save(cp_path, &cp).unwrap();
        expected
    }

    #[test]
    fn resume_matches_uninterrupted_scan() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let cp_path = dir.path().join("scan.checkpoint");
        let expected = interrupt_after_two_chunks(&config, &cp_path);

        let progress = Progress::new();
        let resumed = run(&config, &progress, &cp_path).unwrap();

        assert_eq!(progress.tested.load(Ordering::Relaxed), 2000);
        assert_eq!(resumed.candidates, 3000);
        assert_eq!(resumed.true_primes, 430);
        assert_eq!(rows_without_timing(&config.output), expected);
    }

    #[test]
    fn deleted_report_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let cp_path = dir.path().join("scan.checkpoint");
        let expected = interrupt_after_two_chunks(&config, &cp_path);
        fs::remove_file(&config.output).unwrap();

        let progress = Progress::new();
        let summary = run(&config, &progress, &cp_path).unwrap();

        assert_eq!(progress.tested.load(Ordering::Relaxed), 3000);
        assert_eq!(summary.candidates, 3000);
        assert_eq!(rows_without_timing(&config.output), expected);
        assert!(!cp_path.exists());
    }

    #[test]
    fn truncated_report_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let cp_path = dir.path().join("scan.checkpoint");
        interrupt_after_two_chunks(&config, &cp_path);
        fs::write(&config.output, "n,bit_len\n").unwrap();

        let summary = run(&config, &Progress::new(), &cp_path).unwrap();

        assert_eq!(summary.candidates, 3000);
        let content = fs::read_to_string(&config.output).unwrap();
        assert!(content.starts_with(report::CSV_HEADER));
        assert_eq!(content.lines().count(), 1 + 3000);
    }

    #[test]
    fn new_report_path_does_not_inherit_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let cp_path = dir.path().join("scan.checkpoint");
        interrupt_after_two_chunks(&config, &cp_path);
        let interrupted = fs::read_to_string(&config.output).unwrap();

        // An unrelated file, larger than the checkpointed length.
        let other = dir.path().join("other.csv");
        fs::write(&other, "x".repeat(200_000)).unwrap();
        let config_b = ScanConfig {
            output: other.clone(),
            ..config.clone()
        };

        let summary = run(&config_b, &Progress::new(), &cp_path).unwrap();

        assert_eq!(summary.candidates, 3000);
        let content = fs::read_to_string(&other).unwrap();
        assert!(content.starts_with(report::CSV_HEADER));
        assert!(!content.contains('x'));
        assert_eq!(content.lines().count(), 1 + 3000);
        // The first scan's report is left alone.
        assert_eq!(fs::read_to_string(&config.output).unwrap(), interrupted);
    }

    #[test]
    fn stale_checkpoint_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig {
            high: 200,
            ..setup(dir.path())
        };
        let cp_path = dir.path().join("scan.checkpoint");
        let stale = ScanCheckpoint {
            rounds: config.rounds + 1,
            ..checkpoint_at(&config, 150, 1 << 20)
        };
        checkpoint::save(&cp_path, &stale).unwrap();

        let summary = run(&config, &Progress::new(), &cp_path).unwrap();
        assert_eq!(summary.candidates, 200);
        assert_eq!(rows_without_timing(&config.output).len(), 200);
    }
}
