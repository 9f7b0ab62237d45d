//! # Scheduler — Round-Based Partitioning of the Search Frontier
//!
//! Each round extends the verified frontier by one interval, split across a
//! fixed rayon pool:
//!
//! 1. `ceiling = min(frontier², frontier + 2 + max_chunk × W)`, forced odd.
//! 2. Pick the largest worker count whose floor chunk exceeds `min_chunk`
//!    (falling back to one worker), then force the chunk even.
//! 3. Partition `[frontier + 2, ceiling]` into contiguous batches on the odd
//!    grid, run one [`PrimeWorker`] per batch, wait for all of them.
//! 4. Merge the discoveries into the next [`ResultSnapshot`] with
//!    `frontier = ceiling`.
//!
//! ## Why `frontier²`
//!
//! Every composite `c ≤ frontier²` has a prime factor `≤ sqrt(c) ≤ frontier`,
//! and the snapshot holds every odd prime up to `frontier`. Workers therefore
//! never need primes discovered elsewhere in the same round, so the snapshot
//! is shared read-only and no locking happens while workers run.
//!
//! ## Partition Layout
//!
//! With `k` workers and even chunk `s`, batch `i` starts at
//! `frontier + 2 + i·s`. Non-final batches end at `start + s - 2`; the final
//! batch ends at `ceiling` and absorbs the floor-division remainder. Batches
//! are contiguous, disjoint, cover the interval exactly and have even length.

use crate::bigmath;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::progress::Progress;
use crate::snapshot::{Batch, ResultSnapshot, TimingRecord};
use crate::worker::{PrimeWorker, WorkerState};
use rayon::prelude::*;
use rug::Integer;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pool size for `available` cores: one core is left for the control thread.
pub fn pool_size(available: usize) -> usize {
    available.saturating_sub(1).max(1)
}

/// First candidate above `frontier`: `frontier + 2` on the odd grid.
pub fn first_candidate(frontier: &Integer) -> Integer {
    if frontier.is_odd() {
        Integer::from(frontier + 2u32)
    } else {
        Integer::from(frontier + 1u32)
    }
}

/// `min(frontier², first + max_chunk × pool_size)`, lowered to the odd grid.
pub fn round_ceiling(frontier: &Integer, max_chunk: u64, pool_size: usize) -> Integer {
    let square = Integer::from(frontier.square_ref());
    let reach = first_candidate(frontier) + Integer::from(max_chunk) * pool_size as u64;
    let mut ceiling = bigmath::min(square, reach);
    if ceiling.is_even() {
        ceiling -= 1u32;
    }
    ceiling
}

/// Worker count and even chunk size for an interval of `interval_len`.
///
/// Tries `pool_size` workers first and decreases; the first count whose floor
/// chunk exceeds `min_chunk` wins. One worker takes the whole interval when
/// none does.
pub fn split_interval(pool_size: usize, interval_len: &Integer, min_chunk: u64) -> (usize, Integer) {
    for workers in (2..=pool_size).rev() {
        let chunk = Integer::from(interval_len / workers as u64);
        if chunk > min_chunk {
            let chunk = force_even(chunk);
            if chunk >= 2 {
                return (workers, chunk);
            }
        }
    }
    (1, force_even(interval_len.clone()))
}

fn force_even(mut n: Integer) -> Integer {
    if n.is_odd() {
        n -= 1u32;
    }
    n
}

/// Ceiling and split for one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundPlan {
    pub ceiling: Integer,
    pub workers: usize,
    pub chunk_size: Integer,
}

impl RoundPlan {
    /// One worker covering everything from the frontier up to `ceiling`.
    pub fn single(frontier: &Integer, ceiling: Integer) -> Self {
        let chunk_size = force_even(Integer::from(&ceiling - &first_candidate(frontier)));
        RoundPlan {
            ceiling,
            workers: 1,
            chunk_size,
        }
    }

    /// Reject plans whose batches would not tile `[frontier + 2, ceiling]`
    /// exactly, or whose workers would need primes found in the same round.
    ///
    /// A single worker may go past `frontier²`: it also divides by its own
    /// earlier discoveries. Several workers may not.
    pub fn check(&self, frontier: &Integer) -> Result<()> {
        let first = first_candidate(frontier);
        if self.workers == 0 || self.ceiling < first {
            return Err(EngineError::IllegalState("round plan does not extend the frontier"));
        }
        if self.ceiling.is_even() || self.chunk_size.is_odd() {
            return Err(EngineError::IllegalState("round plan is off the odd grid"));
        }
        if self.workers == 1 {
            return Ok(());
        }
        if self.ceiling > Integer::from(frontier.square_ref()) {
            return Err(EngineError::IllegalState(
                "parallel round plan reaches past frontier squared",
            ));
        }
        let last_start = first + Integer::from(&self.chunk_size * (self.workers as u64 - 1));
        if self.chunk_size < 2 || last_start > self.ceiling {
            return Err(EngineError::IllegalState("round plan chunks overrun the ceiling"));
        }
        Ok(())
    }
}

/// Pure round planner: ceiling from the frontier, then the worker split.
pub fn plan_round(pool_size: usize, frontier: &Integer, min_chunk: u64, max_chunk: u64) -> RoundPlan {
    let pool_size = pool_size.max(1);
    let ceiling = round_ceiling(frontier, max_chunk, pool_size);
    let interval = Integer::from(&ceiling - &first_candidate(frontier));
    let (workers, chunk_size) = split_interval(pool_size, &interval, min_chunk);
    RoundPlan {
        ceiling,
        workers,
        chunk_size,
    }
}

/// Split `[first, ceiling]` into `workers` batches of step `chunk`.
pub fn partition(first: &Integer, ceiling: &Integer, workers: usize, chunk: &Integer) -> Vec<Batch> {
    let workers = workers.max(1);
    let mut batches = Vec::with_capacity(workers);
    let mut lowest = first.clone();
    for i in 0..workers {
        let highest = if i + 1 == workers {
            ceiling.clone()
        } else {
            Integer::from(&lowest + chunk) - 2u32
        };
        let next = Integer::from(&highest + 2u32);
        batches.push(Batch::new(lowest, highest));
        lowest = next;
    }
    batches
}

/// State of one in-flight round. Lives only between dispatch and merge.
pub struct RoundContext {
    known: Arc<BTreeSet<Integer>>,
    ceiling: Integer,
    batches: Vec<Batch>,
    completed: AtomicUsize,
}

impl RoundContext {
    pub fn new(snapshot: &ResultSnapshot, plan: &RoundPlan) -> Self {
        let first = first_candidate(snapshot.frontier());
        RoundContext {
            known: snapshot.shared_primes(),
            ceiling: plan.ceiling.clone(),
            batches: partition(&first, &plan.ceiling, plan.workers, &plan.chunk_size),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn known(&self) -> Arc<BTreeSet<Integer>> {
        Arc::clone(&self.known)
    }

    pub fn ceiling(&self) -> &Integer {
        &self.ceiling
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Called by each worker after `generate`; the worker must be Done.
    pub fn worker_done(&self, worker: &PrimeWorker) -> Result<()> {
        if worker.state() != WorkerState::Done {
            return Err(EngineError::IllegalState(
                "worker reported completion before it was done",
            ));
        }
        self.completed.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Every dispatched batch must have reported in.
    pub fn ensure_complete(&self) -> Result<()> {
        let completed = self.completed();
        if completed != self.batches.len() {
            return Err(EngineError::Coordination(format!(
                "round barrier released with {} of {} batches done",
                completed,
                self.batches.len()
            )));
        }
        Ok(())
    }

    fn into_ceiling(self) -> Integer {
        self.ceiling
    }
}

/// Build the dedicated worker pool.
///
/// With `qos` on macOS, pool threads run at user-initiated QoS so Apple
/// Silicon schedules them on performance cores.
pub fn build_pool(threads: usize, qos: bool) -> Result<rayon::ThreadPool> {
    let builder = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("trial-{}", i));

    #[cfg(target_os = "macos")]
    if qos {
        return builder
            .spawn_handler(|thread| {
                let mut b = std::thread::Builder::new();
                if let Some(name) = thread.name() {
                    b = b.name(name.to_owned());
                }
                b.spawn(move || {
                    // SAFETY: pthread_set_qos_class_self_np is a well-defined macOS API
                    // that sets the QoS class for the current thread. No memory safety concerns.
                    unsafe {
                        libc::pthread_set_qos_class_self_np(
                            libc::qos_class_t::QOS_CLASS_USER_INITIATED,
                            0,
                        );
                    }
                    thread.run();
                })?;
                Ok(())
            })
            .build()
            .map_err(|e| EngineError::Coordination(e.to_string()));
    }

    #[cfg(not(target_os = "macos"))]
    if qos {
        warn!("--qos is only effective on macOS, ignoring");
    }

    builder
        .build()
        .map_err(|e| EngineError::Coordination(e.to_string()))
}

/// Drives rounds over a dedicated pool and accumulates timing records.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    pool_size: usize,
    min_chunk: u64,
    max_chunk: u64,
    timings: Vec<TimingRecord>,
    rounds: u64,
    last: Option<ResultSnapshot>,
    progress: Arc<Progress>,
}

impl Scheduler {
    pub fn new(config: &EngineConfig, progress: Arc<Progress>) -> Result<Self> {
        config.validate()?;
        let pool_size = config.worker_threads();
        let pool = build_pool(pool_size, config.qos)?;
        Ok(Scheduler {
            pool,
            pool_size,
            min_chunk: config.min_chunk_size,
            max_chunk: config.max_chunk_size,
            timings: Vec::new(),
            rounds: 0,
            last: None,
            progress,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Plan the next round from `snapshot` with the configured thresholds.
    pub fn plan(&self, snapshot: &ResultSnapshot) -> RoundPlan {
        plan_round(self.pool_size, snapshot.frontier(), self.min_chunk, self.max_chunk)
    }

    /// Run rounds until `running` is cleared. The flag is checked only between
    /// rounds; an in-flight round always runs to completion.
    pub fn run(&mut self, mut snapshot: ResultSnapshot, running: &AtomicBool) -> Result<ResultSnapshot> {
        info!(
            threads = self.pool_size,
            frontier = %snapshot.frontier(),
            known = snapshot.prime_count(),
            "round loop starting"
        );
        while running.load(Ordering::SeqCst) {
            let plan = self.plan(&snapshot);
            snapshot = self.execute_round(snapshot, plan)?;
        }
        info!(rounds = self.rounds, frontier = %snapshot.frontier(), "round loop stopped");
        Ok(snapshot)
    }

    /// Execute one round with an explicit plan and return the merged snapshot.
    ///
    /// Plans are checked with [`RoundPlan::check`] first. On failure the
    /// previous [`last_result`](Self::last_result) and timings are kept.
    pub fn execute_round(&mut self, snapshot: ResultSnapshot, plan: RoundPlan) -> Result<ResultSnapshot> {
        plan.check(snapshot.frontier())?;
        let round_start = Instant::now();
        let context = RoundContext::new(&snapshot, &plan);
        if context.batches().iter().any(Batch::is_empty) {
            return Err(EngineError::IllegalState("round plan produced an empty batch"));
        }

        // Held aside while workers run; dropped before the merge so the prime
        // set is not shared at that point.
        let previous = self.last.take();
        let (timings, discovered) = match self.dispatch(&context) {
            Ok(done) => done,
            Err(e) => {
                self.last = previous;
                return Err(e);
            }
        };
        drop(previous);

        let workers = timings.len();
        let found = discovered.len();
        self.timings.extend(timings);
        let next = snapshot.merge(context.into_ceiling(), discovered);

        self.rounds += 1;
        self.progress.rounds.fetch_add(1, Ordering::Relaxed);
        self.progress.found.fetch_add(found as u64, Ordering::Relaxed);
        self.progress.set_frontier(next.frontier().to_string());
        debug!(
            round = self.rounds,
            frontier = %next.frontier(),
            workers,
            found,
            elapsed_ms = round_start.elapsed().as_millis() as u64,
            "round complete"
        );
        self.last = Some(next.clone());
        Ok(next)
    }

    /// Run one worker per batch on the pool and collect their results.
    fn dispatch(&self, context: &RoundContext) -> Result<(Vec<TimingRecord>, BTreeSet<Integer>)> {
        let mut registry: Vec<PrimeWorker> = context
            .batches()
            .iter()
            .map(|batch| PrimeWorker::new(batch, context.known()))
            .collect();

        let progress = &self.progress;
        self.pool.install(|| {
            registry.par_iter_mut().try_for_each(|worker| {
                worker.generate_with_progress(progress)?;
                context.worker_done(worker)
            })
        })?;
        context.ensure_complete()?;

        let mut timings = Vec::with_capacity(registry.len());
        let mut discovered = BTreeSet::new();
        for worker in registry {
            timings.push(worker.timing_record()?);
            discovered.extend(worker.into_primes()?);
        }
        Ok((timings, discovered))
    }

    /// Timing records of every batch so far, in dispatch order.
    pub fn timings(&self) -> Result<&[TimingRecord]> {
        if self.rounds == 0 {
            return Err(EngineError::IllegalState("no round has completed yet"));
        }
        Ok(&self.timings)
    }

    /// Snapshot produced by the most recent round.
    pub fn last_result(&self) -> Result<&ResultSnapshot> {
        self.last
            .as_ref()
            .ok_or(EngineError::IllegalState("no round has completed yet"))
    }

    pub fn into_timings(self) -> Vec<TimingRecord> {
        self.timings
    }
}
