//! # Worker — Trial Division Over One Batch
//!
//! A [`PrimeWorker`] owns one closed interval of odd candidates for one round
//! and a read-only handle on the round's known-primes snapshot. It runs
//! exactly once (`Ready → Working → Done`) and collects the primes it finds in
//! a private ordered set; it never writes to the shared snapshot.
//!
//! ## Algorithm
//!
//! For each odd candidate `c` in `[lowest, highest]`:
//!
//! 1. `bound = floor(sqrt(c))`, integer-accurate via [`bigmath::integer_sqrt`].
//! 2. Scan the snapshot primes ascending; stop at the first prime `> bound`
//!    (no larger factor can exist) or at the first divisor.
//! 3. If no divisor was found, scan the primes this worker already found in
//!    its own batch the same way.
//!
//! When the round ceiling is at most `frontier²`, step 3 never finds a factor:
//! every composite `c ≤ frontier²` has a prime factor `≤ sqrt(c) ≤ frontier`,
//! and the snapshot holds all of those.

use crate::bigmath;
use crate::error::{EngineError, Result};
use crate::progress::Progress;
use crate::snapshot::{Batch, TimingRecord};
use chrono::Utc;
use rug::Integer;
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Ready,
    Working,
    Done,
}

/// Result of scanning one candidate against an ascending prime sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrialOutcome {
    /// No prime `≤ bound` divides the candidate.
    Prime { divisions: usize },
    /// `factor` is the smallest scanned prime dividing the candidate.
    Composite { factor: Integer, divisions: usize },
}

impl TrialOutcome {
    pub fn is_prime(&self) -> bool {
        matches!(self, TrialOutcome::Prime { .. })
    }

    pub fn divisions(&self) -> usize {
        match self {
            TrialOutcome::Prime { divisions } | TrialOutcome::Composite { divisions, .. } => {
                *divisions
            }
        }
    }
}

/// Trial-divide `candidate` by `primes` (ascending) up to `bound`.
///
/// Stops before testing the first prime greater than `bound` and immediately
/// after the first divisor.
pub fn trial_divide<'a, I>(candidate: &Integer, bound: &Integer, primes: I) -> TrialOutcome
where
    I: IntoIterator<Item = &'a Integer>,
{
    let mut divisions = 0;
    for prime in primes {
        if prime > bound {
            break;
        }
        divisions += 1;
        if candidate.is_divisible(prime) {
            return TrialOutcome::Composite {
                factor: prime.clone(),
                divisions,
            };
        }
    }
    TrialOutcome::Prime { divisions }
}

pub struct PrimeWorker {
    lowest: Integer,
    highest: Integer,
    known: Arc<BTreeSet<Integer>>,
    primes: BTreeSet<Integer>,
    state: WorkerState,
    tested: u64,
    started_at: Option<chrono::DateTime<Utc>>,
    elapsed: Duration,
}

impl PrimeWorker {
    /// Worker for `batch`. An even lower bound is moved up to the next odd value.
    pub fn new(batch: &Batch, known: Arc<BTreeSet<Integer>>) -> Self {
        let mut lowest = batch.lowest.clone();
        if lowest.is_even() {
            lowest += 1u32;
        }
        PrimeWorker {
            lowest,
            highest: batch.highest.clone(),
            known,
            primes: BTreeSet::new(),
            state: WorkerState::Ready,
            tested: 0,
            started_at: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Number of candidates examined so far.
    pub fn tested(&self) -> u64 {
        self.tested
    }

    /// Run trial division over the whole batch. Valid once, from `Ready`.
    pub fn generate(&mut self) -> Result<()> {
        if self.state != WorkerState::Ready {
            return Err(EngineError::IllegalState("worker has already run"));
        }
        self.state = WorkerState::Working;
        self.started_at = Some(Utc::now());
        let start = Instant::now();

        let mut candidate = self.lowest.clone();
        if candidate < 3 {
            candidate = Integer::from(3);
        }
        while candidate <= self.highest {
            let bound = bigmath::integer_sqrt(&candidate)?;
            let mut outcome = trial_divide(&candidate, &bound, self.known.iter());
            if outcome.is_prime() {
                outcome = trial_divide(&candidate, &bound, self.primes.iter());
            }
            if outcome.is_prime() {
                self.primes.insert(candidate.clone());
            }
            self.tested += 1;
            candidate += 2u32;
        }

        self.elapsed = start.elapsed();
        self.state = WorkerState::Done;
        Ok(())
    }

    /// [`generate`](Self::generate), then report the batch to `progress`.
    pub fn generate_with_progress(&mut self, progress: &Progress) -> Result<()> {
        self.generate()?;
        progress.tested.fetch_add(self.tested, Ordering::Relaxed);
        Ok(())
    }

    pub fn primes(&self) -> Result<&BTreeSet<Integer>> {
        self.ensure_done()?;
        Ok(&self.primes)
    }

    pub fn into_primes(self) -> Result<BTreeSet<Integer>> {
        self.ensure_done()?;
        Ok(self.primes)
    }

    pub fn timing_record(&self) -> Result<TimingRecord> {
        self.ensure_done()?;
        Ok(TimingRecord {
            duration: self.elapsed,
            interval_start: self.lowest.clone(),
            interval_end: self.highest.clone(),
            primes_found: self.primes.len(),
            started_at: self.started_at.unwrap_or_else(Utc::now),
        })
    }

    fn ensure_done(&self) -> Result<()> {
        if self.state == WorkerState::Done {
            Ok(())
        } else {
            Err(EngineError::IllegalState("worker has not finished generating"))
        }
    }
}
