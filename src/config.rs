//! Engine configuration: per-worker chunk thresholds and pool sizing.

use crate::error::{EngineError, Result};

/// Below this many candidates per worker a round uses fewer workers.
pub const DEFAULT_MIN_CHUNK_SIZE: u64 = 5_000;

/// Upper bound on the interval handed to each worker in a round.
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 20_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub min_chunk_size: u64,
    pub max_chunk_size: u64,
    /// Pool size override. `None` uses all but one available core.
    pub threads: Option<usize>,
    /// Raise pool threads to user-initiated QoS (macOS only).
    pub qos: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            threads: None,
            qos: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(EngineError::Config("max chunk size must be positive".into()));
        }
        if self.min_chunk_size >= self.max_chunk_size {
            return Err(EngineError::Config(format!(
                "min chunk size {} must be below max chunk size {}",
                self.min_chunk_size, self.max_chunk_size
            )));
        }
        if self.threads == Some(0) {
            return Err(EngineError::Config("thread count must be at least 1".into()));
        }
        Ok(())
    }

    /// Number of pool workers: the override, or `max(1, cores - 1)`.
    pub fn worker_threads(&self) -> usize {
        self.threads
            .unwrap_or_else(|| crate::scheduler::pool_size(available_cores()))
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let c = EngineConfig::default();
        c.validate().unwrap();
        assert_eq!(c.min_chunk_size, 5_000);
        assert_eq!(c.max_chunk_size, 20_000);
        assert!(c.worker_threads() >= 1);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let c = EngineConfig {
            min_chunk_size: 100,
            max_chunk_size: 100,
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_zero_max_and_zero_threads() {
        let zero_max = EngineConfig {
            min_chunk_size: 0,
            max_chunk_size: 0,
            ..EngineConfig::default()
        };
        assert!(zero_max.validate().is_err());

        let zero_threads = EngineConfig {
            threads: Some(0),
            ..EngineConfig::default()
        };
        assert!(zero_threads.validate().is_err());
    }

    #[test]
    fn thread_override_wins() {
        let c = EngineConfig {
            threads: Some(3),
            ..EngineConfig::default()
        };
        assert_eq!(c.worker_threads(), 3);
    }
}
