//! # Main — CLI Entry Point
//!
//! Loads the most advanced checkpoint, runs the trial-division engine for a
//! fixed wall-clock duration, then stops it cooperatively, saves the final
//! snapshot and logs the per-batch timing table.
//!
//! ## Options
//!
//! - `--checkpoint-dir` / `TRIALHUNT_CHECKPOINT_DIR`: snapshot directory.
//! - `--duration`: seconds to run before requesting stop.
//! - `--min-chunk` / `--max-chunk`: per-worker interval thresholds.
//! - `--threads`: pool size (defaults to all cores but one).
//! - `--qos`: macOS QoS P-core scheduling for pool threads.
//! - `--keep-checkpoints`: snapshots retained after saving (0 keeps all).
//! - `--timings-json`: also write the timing records as JSON.
//!
//! Logging: `LOG_FORMAT=json` for JSON lines, human-readable otherwise;
//! `RUST_LOG` filters (default `info`).

mod cli;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "trialhunt", about = "Discover primes by resumable parallel trial division")]
pub struct Cli {
    /// Directory holding <frontier>.prime snapshots
    #[arg(long, env = "TRIALHUNT_CHECKPOINT_DIR", default_value = trialhunt::checkpoint::DEFAULT_DIRECTORY)]
    checkpoint_dir: PathBuf,

    /// Seconds to search before stopping
    #[arg(long, env = "TRIALHUNT_DURATION", default_value_t = 60)]
    duration: u64,

    /// Minimum candidates per worker before a round uses fewer workers
    #[arg(long, env = "TRIALHUNT_MIN_CHUNK", default_value_t = trialhunt::config::DEFAULT_MIN_CHUNK_SIZE)]
    min_chunk: u64,

    /// Maximum candidates per worker in one round
    #[arg(long, env = "TRIALHUNT_MAX_CHUNK", default_value_t = trialhunt::config::DEFAULT_MAX_CHUNK_SIZE)]
    max_chunk: u64,

    /// Number of worker threads (defaults to all logical cores but one)
    #[arg(long, env = "TRIALHUNT_THREADS")]
    threads: Option<usize>,

    /// Set macOS QoS class to user-initiated for worker threads (P-core scheduling on Apple Silicon)
    #[arg(long)]
    qos: bool,

    /// Snapshots to keep after saving (0 keeps all)
    #[arg(long, default_value_t = trialhunt::checkpoint::DEFAULT_KEEP)]
    keep_checkpoints: usize,

    /// Seconds between progress log lines
    #[arg(long, default_value_t = 30)]
    report_interval: u64,

    /// Write per-batch timing records to this JSON file
    #[arg(long)]
    timings_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
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
    cli::run_hunt(&cli)
}
