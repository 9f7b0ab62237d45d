//! # Progress — Atomic Search Progress Counters
//!
//! Thread-safe progress tracking shared between the round control thread, the
//! pool workers and the background status reporter. Workers add their tested
//! count once per batch; the control thread publishes the frontier and found
//! count once per round. A Mutex guards only the frontier string, which is
//! written once per round.
//!
//! ## Background Reporter
//!
//! A dedicated thread logs progress every reporting interval: rounds, tested
//! count, found count, rate (candidates/sec) and the current frontier. It
//! polls the `shutdown` flag in short slices so `stop()` takes effect promptly.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub struct Progress {
    pub tested: AtomicU64,
    pub found: AtomicU64,
    pub rounds: AtomicU64,
    frontier: Mutex<String>,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Progress {
            tested: AtomicU64::new(0),
            found: AtomicU64::new(0),
            rounds: AtomicU64::new(0),
            frontier: Mutex::new(String::new()),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn set_frontier(&self, frontier: String) {
        match self.frontier.lock() {
            Ok(mut guard) => *guard = frontier,
            Err(poisoned) => *poisoned.into_inner() = frontier,
        }
    }

    pub fn frontier(&self) -> String {
        match self.frontier.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn start_reporter(self: &Arc<Self>, interval: Duration) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || {
            let mut last_report = Instant::now();
            while !progress.is_stopped() {
                thread::sleep(SHUTDOWN_POLL.min(interval));
                if last_report.elapsed() >= interval {
                    progress.print_status();
                    last_report = Instant::now();
                }
            }
        })
    }

    /// Candidates tested per second since construction.
    pub fn rate(&self) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        if secs < 1.0 {
            return 0.0;
        }
        self.tested.load(Ordering::Relaxed) as f64 / secs
    }

    pub fn print_status(&self) {
        info!(
            frontier = %self.frontier(),
            rounds = self.rounds.load(Ordering::Relaxed),
            tested = self.tested.load(Ordering::Relaxed),
            found = self.found.load(Ordering::Relaxed),
            rate = format_args!("{:.2}", self.rate()),
            elapsed = %format_elapsed(self.start.elapsed()),
            "search progress"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// `HH:MM:SS`; hours are not wrapped.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
