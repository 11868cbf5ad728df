//! # CLI Execution Functions
//!
//! Execution logic for each subcommand, kept out of `main.rs`: config
//! layering for `scan`, single-candidate classification, and rayon setup.

use anyhow::{Context, Result};
use fermat_census::config::{self, ScanConfig};
use fermat_census::oracle::PseudoprimeOracle;
use fermat_census::pipeline;
use fermat_census::progress::{self, Progress};
use fermat_census::scan;
use fermat_census::witness::GmpSampler;
use std::path::Path;
use tracing::{info, warn};

use super::{Cli, ScanArgs};

/// Defaults, then the TOML file, then flags.
fn scan_config(args: &ScanArgs) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => config::parse_toml_file(path)?,
        None => ScanConfig::default(),
    };

    if let Some(low) = args.low {
        config.low = low;
    }
    if let Some(high) = args.high {
        config.high = high;
        config.bits = None;
    }
    if let Some(bits) = args.bits {
        config.bits = Some(bits);
    }
    if let Some(rounds) = args.rounds {
        config.rounds = rounds;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(path) = &args.pseudoprimes {
        config.pseudoprimes = path.clone();
    }
    if let Some(path) = &args.output {
        config.output = path.clone();
    }
    if args.summary.is_some() {
        config.summary = args.summary.clone();
    }
    if args.sequential {
        config.parallel = false;
    }
    if let Some(secs) = args.checkpoint_interval {
        config.checkpoint_interval_secs = secs;
    }

    config.resolve()
}

pub fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<()> {
    let config = scan_config(args)?;

    let progress = Progress::new();
    let reporter_handle = progress.start_reporter(progress::REPORT_INTERVAL);

    let result = scan::run(&config, &progress, &cli.checkpoint);

    progress.stop();
    let _ = reporter_handle.join();
    progress.print_status();

    let summary = result?;
    info!(
        candidates = summary.candidates,
        output = %config.output.display(),
        "scan complete"
    );
    Ok(())
}

pub fn run_classify(
    n: u64,
    rounds: u32,
    seed: Option<u64>,
    pseudoprimes: Option<&Path>,
) -> Result<()> {
    if rounds == 0 {
        anyhow::bail!("rounds must be at least 1");
    }
    let oracle = match pseudoprimes {
        Some(path) => PseudoprimeOracle::load_file(path, n)?,
        None => {
            warn!("no pseudoprime list given, probable primes are reported as prime");
            PseudoprimeOracle::default()
        }
    };
    let seed = seed.unwrap_or_else(config::time_seed);
    let mut sampler = GmpSampler::from_seed(seed);

    let record = pipeline::classify_candidate(n, rounds, &oracle, &mut sampler);
    let json = serde_json::to_string_pretty(&record).context("failed to encode record")?;
    println!("{}", json);
    Ok(())
}

/// Size the global rayon pool. `None` or 0 keeps rayon's default.
pub fn configure_rayon(threads: Option<usize>) {
    let num_threads = threads.unwrap_or(0);
    if num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
        {
            warn!(error = %e, "Could not configure rayon thread pool");
        }
    }
}
