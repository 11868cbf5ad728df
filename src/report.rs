//! # Report — CSV Output of Verdict Records
//!
//! One header row followed by one row per [`VerdictRecord`]:
//!
//! ```text
//! n,bit_len,is_probably_prime,elapsed_ns,witness,is_really_prime
//! 4,3,0,812,3,0
//! 5,3,1,1490,,1
//! ```
//!
//! Booleans are written as `0`/`1` and an absent witness as an empty field.
//! The writer counts every byte it emits so a resumed scan can truncate the
//! file back to the last checkpointed row boundary and append from there.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::pipeline::VerdictRecord;

pub const CSV_HEADER: &str = "n,bit_len,is_probably_prime,elapsed_ns,witness,is_really_prime";

/// Render one record as a CSV row, including the trailing newline.
pub fn format_row(record: &VerdictRecord) -> String {
    let witness = record
        .counter_witness
        .map(|w| w.to_string())
        .unwrap_or_default();
    format!(
        "{},{},{},{},{},{}\n",
        record.candidate,
        record.bit_length,
        u8::from(record.probably_prime),
        record.elapsed_ns,
        witness,
        u8::from(record.is_truly_prime),
    )
}

#[derive(Debug)]
pub struct CsvReport<W: Write> {
    out: W,
    bytes_written: u64,
    rows: u64,
}

impl<W: Write> CsvReport<W> {
    /// Start a fresh report: writes the header row.
    pub fn new(mut out: W) -> Result<Self> {
        let header = format!("{}\n", CSV_HEADER);
        out.write_all(header.as_bytes())?;
        Ok(CsvReport {
            out,
            bytes_written: header.len() as u64,
            rows: 0,
        })
    }

    /// Continue a report whose first `bytes_written` bytes already exist.
    pub fn resume(out: W, bytes_written: u64) -> Self {
        CsvReport {
            out,
            bytes_written,
            rows: 0,
        }
    }

    pub fn write_record(&mut self, record: &VerdictRecord) -> Result<()> {
        let row = format_row(record);
        self.out.write_all(row.as_bytes())?;
        self.bytes_written += row.len() as u64;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Total size of the report, including bytes written before a resume.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Rows written by this writer (not counting rows before a resume).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Create (or overwrite) the report at `path`, creating parent directories.
pub fn create(path: &Path) -> Result<CsvReport<BufWriter<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    CsvReport::new(BufWriter::new(file))
}

/// Reopen the report at `path`, discard everything past `len` bytes and append.
pub fn reopen(path: &Path, len: u64) -> Result<CsvReport<BufWriter<File>>> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("failed to reopen output file {}", path.display()))?;
    let on_disk = file.metadata()?.len();
    if on_disk < len {
        anyhow::bail!(
            "output file {} is shorter than its checkpoint ({} < {} bytes)",
            path.display(),
            on_disk,
            len
        );
    }
    file.set_len(len)?;
    let file = OpenOptions::new().append(true).open(path)?;
    Ok(CsvReport::resume(BufWriter::new(file), len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        candidate: u64,
        probably_prime: bool,
        witness: Option<u64>,
        truly: bool,
    ) -> VerdictRecord {
        VerdictRecord {
            candidate,
            bit_length: crate::bit_length(candidate),
            probably_prime,
            counter_witness: witness,
            is_truly_prime: truly,
            elapsed_ns: 1500,
        }
    }

    #[test]
    fn composite_row_carries_witness() {
        assert_eq!(format_row(&record(4, false, Some(3), false)), "4,3,0,1500,3,0\n");
    }

    #[test]
    fn prime_row_has_empty_witness() {
        assert_eq!(format_row(&record(97, true, None, true)), "97,7,1,1500,,1\n");
    }

    #[test]
    fn carmichael_row_is_probable_but_not_prime() {
        assert_eq!(format_row(&record(561, true, None, false)), "561,10,1,1500,,0\n");
    }

    #[test]
    fn header_precedes_rows() {
        let mut report = CsvReport::new(Vec::new()).unwrap();
        report.write_record(&record(2, true, None, true)).unwrap();
        report.write_record(&record(4, false, Some(3), false)).unwrap();
        assert_eq!(report.rows(), 2);
        let bytes = report.bytes_written();
        let out = String::from_utf8(report.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "n,bit_len,is_probably_prime,elapsed_ns,witness,is_really_prime\n\
             2,2,1,1500,,1\n\
             4,3,0,1500,3,0\n"
        );
        assert_eq!(bytes, out.len() as u64);
    }

    #[test]
    fn resumed_report_writes_no_header() {
        let mut report = CsvReport::resume(Vec::new(), 100);
        report.write_record(&record(5, true, None, true)).unwrap();
        assert_eq!(report.bytes_written(), 100 + "5,3,1,1500,,1\n".len() as u64);
        let out = String::from_utf8(report.finish().unwrap()).unwrap();
        assert_eq!(out, "5,3,1,1500,,1\n");
    }

    #[test]
    fn create_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.csv");
        let report = create(&path).unwrap();
        report.finish().unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn reopen_truncates_to_checkpoint_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut report = create(&path).unwrap();
        report.write_record(&record(2, true, None, true)).unwrap();
        let checkpoint_len = report.bytes_written();
        // Row written after the checkpoint, lost in a crash.
        report.write_record(&record(3, true, None, true)).unwrap();
        report.finish().unwrap();

        let mut resumed = reopen(&path, checkpoint_len).unwrap();
        resumed.write_record(&record(3, true, None, true)).unwrap();
        resumed.write_record(&record(4, false, Some(3), false)).unwrap();
        resumed.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "2,2,1,1500,,1");
        assert_eq!(lines[2], "3,2,1,1500,,1");
        assert_eq!(lines[3], "4,3,0,1500,3,0");
    }

    #[test]
    fn reopen_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "n\n").unwrap();
        assert!(reopen(&path, 1000).is_err());
    }

    #[test]
    fn reopen_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = reopen(&dir.path().join("gone.csv"), 0).unwrap_err();
        assert!(err.to_string().contains("failed to reopen output file"));
    }
}
