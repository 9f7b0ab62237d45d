//! # Engine — Start/Stop Control Surface
//!
//! Owns the round control thread. [`Engine::start`] moves the scheduler onto
//! its own thread and returns immediately; [`Engine::request_stop`] clears the
//! run flag, blocks until the in-flight round has merged, then hands the final
//! snapshot and every timing record to a completion callback.
//!
//! Stop is cooperative: the flag is only read between rounds, so a round that
//! is running when stop is requested always completes and is included in the
//! outcome.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::progress::Progress;
use crate::scheduler::Scheduler;
use crate::snapshot::{ResultSnapshot, TimingRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::info;

/// Final state handed to the stop callback.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub snapshot: ResultSnapshot,
    pub timings: Vec<TimingRecord>,
    pub rounds: u64,
}

type ControlHandle = JoinHandle<Result<RunOutcome>>;

pub struct Engine {
    running: Arc<AtomicBool>,
    progress: Arc<Progress>,
    pool_size: usize,
    pending: Option<(Scheduler, ResultSnapshot)>,
    control: Option<ControlHandle>,
}

impl Engine {
    pub fn new(initial: ResultSnapshot, config: &EngineConfig) -> Result<Self> {
        let progress = Progress::new();
        progress.set_frontier(initial.frontier().to_string());
        let scheduler = Scheduler::new(config, Arc::clone(&progress))?;
        Ok(Engine {
            running: Arc::new(AtomicBool::new(false)),
            progress,
            pool_size: scheduler.pool_size(),
            pending: Some((scheduler, initial)),
            control: None,
        })
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Begin the round loop on a dedicated control thread.
    pub fn start(&mut self) -> Result<()> {
        let (mut scheduler, snapshot) = self
            .pending
            .take()
            .ok_or(EngineError::IllegalState("engine has already been started"))?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let spawned = thread::Builder::new()
            .name("round-control".into())
            .spawn(move || -> Result<RunOutcome> {
                let result = scheduler.run(snapshot, &running);
                running.store(false, Ordering::SeqCst);
                let snapshot = result?;
                Ok(RunOutcome {
                    snapshot,
                    rounds: scheduler.rounds(),
                    timings: scheduler.into_timings(),
                })
            });

        match spawned {
            Ok(handle) => {
                self.control = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(EngineError::Coordination(format!(
                    "could not spawn round control thread: {}",
                    e
                )))
            }
        }
    }

    /// Stop after the in-flight round, then call `on_complete` with the result.
    ///
    /// Fails with [`EngineError::IllegalState`] when the engine was never
    /// started or has already been stopped. A fatal error from the round loop
    /// is returned here instead of the outcome.
    pub fn request_stop<F>(&mut self, on_complete: F) -> Result<RunOutcome>
    where
        F: FnOnce(&RunOutcome),
    {
        let handle = self
            .control
            .take()
            .ok_or(EngineError::IllegalState("stop requested while engine is not running"))?;

        self.running.store(false, Ordering::SeqCst);
        info!("stop requested, waiting for in-flight round");
        let outcome = handle
            .join()
            .map_err(|_| EngineError::Coordination("round control thread panicked".into()))??;

        info!(
            rounds = outcome.rounds,
            frontier = %outcome.snapshot.frontier(),
            "engine stopped"
        );
        on_complete(&outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> EngineConfig {
        EngineConfig {
            min_chunk_size: 10,
            max_chunk_size: 500,
            threads: Some(2),
            qos: false,
        }
    }

    #[test]
    fn stop_before_start_is_illegal() {
        let mut engine = Engine::new(ResultSnapshot::initial(), &config()).unwrap();
        assert!(!engine.is_running());
        assert!(matches!(
            engine.request_stop(|_| {}),
            Err(EngineError::IllegalState(_))
        ));
    }

    #[test]
    fn start_twice_is_illegal() {
        let mut engine = Engine::new(ResultSnapshot::initial(), &config()).unwrap();
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::IllegalState(_))));
        engine.request_stop(|_| {}).unwrap();
    }

    #[test]
    fn start_then_stop_advances_frontier() {
        let mut engine = Engine::new(ResultSnapshot::initial(), &config()).unwrap();
        engine.start().unwrap();
        assert!(engine.is_running());
        thread::sleep(Duration::from_millis(100));

        let mut seen = None;
        let outcome = engine
            .request_stop(|o| seen = Some(o.snapshot.frontier().clone()))
            .unwrap();
        assert!(!engine.is_running());
        assert!(outcome.rounds > 0);
        assert!(*outcome.snapshot.frontier() > 3);
        assert_eq!(seen.as_ref(), Some(outcome.snapshot.frontier()));
        assert!(!outcome.timings.is_empty());
    }

    #[test]
    fn second_stop_is_illegal() {
        let mut engine = Engine::new(ResultSnapshot::initial(), &config()).unwrap();
        engine.start().unwrap();
        engine.request_stop(|_| {}).unwrap();
        assert!(matches!(
            engine.request_stop(|_| {}),
            Err(EngineError::IllegalState(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = EngineConfig {
            min_chunk_size: 10,
            max_chunk_size: 5,
            ..config()
        };
        assert!(matches!(
            Engine::new(ResultSnapshot::initial(), &bad),
            Err(EngineError::Config(_))
        ));
    }
}
