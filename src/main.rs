//! # Main — CLI Entry Point
//!
//! Routes the two subcommands to their runners in [`cli`]:
//!
//! - `scan`: classify every integer of a range, writing a CSV report and an
//!   optional JSON summary, with periodic checkpoints.
//! - `classify`: classify a single integer and print its record as JSON.
//!
//! ## Global Options
//!
//! - `--checkpoint`: JSON file for resumable scan state.
//! - `--threads`: Rayon thread pool size (defaults to all logical cores).
//!
//! Logging goes to stderr; `LOG_FORMAT=json` switches to JSON lines and
//! `RUST_LOG` sets the filter (default `info`).

mod cli;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "fermat-census",
    version,
    about = "Census of Fermat probable primes, checked against known pseudoprimes"
)]
struct Cli {
    /// Path to checkpoint file for resuming scans
    #[arg(long, global = true, default_value = "fermat-census.checkpoint")]
    checkpoint: PathBuf,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, global = true, env = "FERMAT_THREADS")]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every integer in [low, high] and write a CSV report
    Scan(ScanArgs),
    /// Classify a single integer and print the record as JSON
    Classify {
        /// Candidate to classify
        n: u64,
        /// Fermat rounds
        #[arg(long, default_value_t = 16)]
        rounds: u32,
        /// Random seed (defaults to the current time)
        #[arg(long, env = "FERMAT_SEED")]
        seed: Option<u64>,
        /// Sorted pseudoprime list used as the ground-truth oracle
        #[arg(long, env = "FERMAT_PSEUDOPRIMES")]
        pseudoprimes: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// TOML file with scan settings (flags override it)
    #[arg(long, env = "FERMAT_CONFIG")]
    config: Option<PathBuf>,
    /// First candidate
    #[arg(long)]
    low: Option<u64>,
    /// Last candidate
    #[arg(long, conflicts_with = "bits")]
    high: Option<u64>,
    /// Scan up to 2^bits - 1
    #[arg(long)]
    bits: Option<u32>,
    /// Fermat rounds per candidate
    #[arg(long)]
    rounds: Option<u32>,
    /// Candidates per chunk (checkpoint granularity)
    #[arg(long)]
    chunk_size: Option<u64>,
    /// Random seed (defaults to the current time)
    #[arg(long, env = "FERMAT_SEED")]
    seed: Option<u64>,
    /// Sorted pseudoprime list used as the ground-truth oracle
    #[arg(long, env = "FERMAT_PSEUDOPRIMES")]
    pseudoprimes: Option<PathBuf>,
    /// CSV report path
    #[arg(long, env = "FERMAT_OUTPUT")]
    output: Option<PathBuf>,
    /// Write a per-bit-length JSON summary here
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Classify on the current thread only
    #[arg(long)]
    sequential: bool,
    /// Seconds between checkpoints
    #[arg(long)]
    checkpoint_interval: Option<u64>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::configure_rayon(cli.threads);

    match &cli.command {
        Commands::Scan(args) => cli::run_scan(&cli, args),
        Commands::Classify {
            n,
            rounds,
            seed,
            pseudoprimes,
        } => cli::run_classify(*n, *rounds, *seed, pseudoprimes.as_deref()),
    }
}
