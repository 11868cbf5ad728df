//! # Progress — Atomic Scan Progress Counters
//!
//! Thread-safe progress tracking shared between the scan driver and the
//! background status reporter. Counters are atomics updated once per chunk;
//! the current-chunk label sits behind a Mutex (one writer, one reader).
//!
//! ## Background Reporter
//!
//! A dedicated thread logs tested/probable/pseudoprime counts, the rate in
//! candidates per second and the current chunk at a fixed interval. It polls
//! the `shutdown` flag every [`POLL`] so `stop()` + `join()` returns promptly.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Default interval between progress log lines.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Shutdown polling granularity of the reporter thread.
const POLL: Duration = Duration::from_millis(200);

pub struct Progress {
    pub tested: AtomicU64,
    pub probable: AtomicU64,
    pub pseudoprimes: AtomicU64,
    pub current: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            tested: AtomicU64::new(0),
            probable: AtomicU64::new(0),
            pseudoprimes: AtomicU64::new(0),
            current: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn set_current(&self, label: String) {
        if let Ok(mut current) = self.current.lock() {
            *current = label;
        }
    }

    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || {
            let mut last = Instant::now();
            while !progress.shutdown.load(Ordering::Relaxed) {
                thread::sleep(POLL);
                if last.elapsed() >= interval {
                    progress.print_status();
                    last = Instant::now();
                }
            }
        })
    }

    pub fn print_status(&self) {
        let elapsed = self.start.elapsed();
        let tested = self.tested.load(Ordering::Relaxed);
        let probable = self.probable.load(Ordering::Relaxed);
        let pseudoprimes = self.pseudoprimes.load(Ordering::Relaxed);
        let current = self
            .current
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default();
        let rate = if elapsed.as_secs() > 0 {
            tested as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let h = elapsed.as_secs() / 3600;
        let m = (elapsed.as_secs() % 3600) / 60;
        let s = elapsed.as_secs() % 60;
        info!(
            current = %current,
            tested,
            probable,
            pseudoprimes,
            rate = format_args!("{:.2}", rate),
            elapsed = format_args!("{:02}:{:02}:{:02}", h, m, s),
            "scan progress"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
