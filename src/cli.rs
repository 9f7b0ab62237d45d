//! # CLI Execution
//!
//! Extracted from `main.rs` to keep the entry point slim: builds the engine
//! configuration from flags, drives one timed run and persists the result.

use anyhow::Result;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use trialhunt::checkpoint::{self, DirectoryStore};
use trialhunt::{report, Engine, EngineConfig};

use super::Cli;

pub fn engine_config(cli: &Cli) -> EngineConfig {
    EngineConfig {
        min_chunk_size: cli.min_chunk,
        max_chunk_size: cli.max_chunk,
        threads: cli.threads,
        qos: cli.qos,
    }
}

/// Load, search for `--duration` seconds, stop, save, report.
pub fn run_hunt(cli: &Cli) -> Result<()> {
    let store = DirectoryStore::new(&cli.checkpoint_dir);
    let initial = checkpoint::load(&store);

    let mut engine = Engine::new(initial, &engine_config(cli))?;
    info!(
        threads = engine.pool_size(),
        duration_secs = cli.duration,
        checkpoint_dir = %cli.checkpoint_dir.display(),
        "trialhunt starting"
    );

    let progress = engine.progress().clone();
    let reporter = progress.start_reporter(Duration::from_secs(cli.report_interval.max(1)));

    engine.start()?;
    thread::sleep(Duration::from_secs(cli.duration));
    let outcome = engine.request_stop(|outcome| {
        checkpoint::save_reporting(&store, &outcome.snapshot);
    })?;

    progress.stop();
    let _ = reporter.join();
    progress.print_status();

    match checkpoint::prune(&store, cli.keep_checkpoints) {
        Ok(0) => {}
        Ok(removed) => info!(removed, "old checkpoints pruned"),
        Err(e) => warn!(error = %format!("{:#}", e), "checkpoint pruning failed"),
    }

    info!(
        rounds = outcome.rounds,
        frontier = %report::format_grouped(outcome.snapshot.frontier()),
        primes = %report::format_grouped(outcome.snapshot.prime_count()),
        largest = %outcome
            .snapshot
            .largest_prime()
            .map(report::format_grouped)
            .unwrap_or_default(),
        "search complete"
    );
    info!("timings:");
    report::log_timings(&outcome.timings);

    if let Some(path) = &cli.timings_json {
        report::write_timings_json(path, &outcome.timings)?;
        info!(path = %path.display(), "timings written");
    }
    Ok(())
}
