//! # Snapshot — Verified Frontier, Batches and Timing Records
//!
//! A [`ResultSnapshot`] pairs the frontier (largest value below which every
//! prime is known) with the complete set of odd primes up to it. Snapshots are
//! immutable: a round produces a new one through [`ResultSnapshot::merge`].
//!
//! The prime 2 is never stored. It is implicit everywhere in the engine and
//! only written out by the checkpoint store for completeness of the file.

use chrono::{DateTime, Utc};
use rug::Integer;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Frontier of a fresh search.
pub const INITIAL_FRONTIER: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultSnapshot {
    frontier: Integer,
    known_primes: Arc<BTreeSet<Integer>>,
}

impl ResultSnapshot {
    pub fn new(frontier: Integer, known_primes: BTreeSet<Integer>) -> Self {
        ResultSnapshot {
            frontier,
            known_primes: Arc::new(known_primes),
        }
    }

    /// `{frontier = 3, known_primes = {3}}`.
    pub fn initial() -> Self {
        let mut primes = BTreeSet::new();
        primes.insert(Integer::from(INITIAL_FRONTIER));
        ResultSnapshot::new(Integer::from(INITIAL_FRONTIER), primes)
    }

    pub fn frontier(&self) -> &Integer {
        &self.frontier
    }

    pub fn known_primes(&self) -> &BTreeSet<Integer> {
        &self.known_primes
    }

    /// Read-only handle on the prime set, shared with a round's workers.
    pub fn shared_primes(&self) -> Arc<BTreeSet<Integer>> {
        Arc::clone(&self.known_primes)
    }

    /// Number of primes up to the frontier, counting the implicit 2.
    pub fn prime_count(&self) -> usize {
        self.known_primes.len() + 1
    }

    /// Largest stored prime.
    pub fn largest_prime(&self) -> Option<&Integer> {
        self.known_primes.last()
    }

    /// Successor snapshot: this round's discoveries added, frontier advanced.
    ///
    /// Consumes `self`; the prime set is reused when no worker still holds it.
    pub fn merge(self, frontier: Integer, discovered: BTreeSet<Integer>) -> Self {
        debug_assert!(frontier >= self.frontier, "frontier must not move backwards");
        let mut primes = Arc::unwrap_or_clone(self.known_primes);
        primes.extend(discovered);
        ResultSnapshot::new(frontier, primes)
    }
}

impl Default for ResultSnapshot {
    fn default() -> Self {
        ResultSnapshot::initial()
    }
}

/// Closed interval of odd candidates handed to one worker for one round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub lowest: Integer,
    pub highest: Integer,
}

impl Batch {
    pub fn new(lowest: Integer, highest: Integer) -> Self {
        Batch { lowest, highest }
    }

    /// `highest - lowest`.
    pub fn len(&self) -> Integer {
        Integer::from(&self.highest - &self.lowest)
    }

    pub fn is_empty(&self) -> bool {
        self.highest < self.lowest
    }
}

/// Per-batch timing, accumulated by the scheduler for reporting.
#[derive(Clone, Debug)]
pub struct TimingRecord {
    pub duration: Duration,
    pub interval_start: Integer,
    pub interval_end: Integer,
    pub primes_found: usize,
    pub started_at: DateTime<Utc>,
}

impl TimingRecord {
    pub fn duration_ms(&self) -> u128 {
        self.duration.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[u32]) -> BTreeSet<Integer> {
        values.iter().map(|&v| Integer::from(v)).collect()
    }

    #[test]
    fn initial_snapshot_is_three() {
        let s = ResultSnapshot::initial();
        assert_eq!(*s.frontier(), 3);
        assert_eq!(*s.known_primes(), set(&[3]));
        assert_eq!(s.prime_count(), 2);
        assert_eq!(s, ResultSnapshot::default());
    }

    #[test]
    fn merge_unions_and_advances() {
        let s = ResultSnapshot::new(Integer::from(9), set(&[3, 5, 7]));
        let next = s.merge(Integer::from(25), set(&[11, 13, 17, 19, 23]));
        assert_eq!(*next.frontier(), 25);
        assert_eq!(*next.known_primes(), set(&[3, 5, 7, 11, 13, 17, 19, 23]));
        assert_eq!(*next.largest_prime().unwrap(), 23);
    }

    #[test]
    fn merge_leaves_shared_set_untouched() {
        let s = ResultSnapshot::new(Integer::from(9), set(&[3, 5, 7]));
        let held = s.shared_primes();
        let next = s.merge(Integer::from(25), set(&[11]));
        assert_eq!(*held, set(&[3, 5, 7]));
        assert!(next.known_primes().contains(&Integer::from(11)));
    }

    #[test]
    fn merge_is_order_independent() {
        let base = ResultSnapshot::new(Integer::from(9), set(&[3, 5, 7]));
        let a = base.clone().merge(Integer::from(25), set(&[11, 13, 17, 19, 23]));
        let b = base.merge(Integer::from(25), set(&[19, 23, 11, 17, 13]));
        assert_eq!(a, b);
    }

    #[test]
    fn batch_length() {
        let b = Batch::new(Integer::from(5), Integer::from(25));
        assert_eq!(b.len(), 20);
        assert!(!b.is_empty());
        assert!(Batch::new(Integer::from(7), Integer::from(5)).is_empty());
    }
}
