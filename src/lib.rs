//! # Trialhunt — Resumable Parallel Trial Division
//!
//! Discovers primes over an unbounded range by trial division, one round at a
//! time. Each round extends the verified frontier by an interval no larger
//! than `frontier²`, split across a rayon pool; results are checkpointed to
//! disk so a later run resumes from the most advanced snapshot.
//!
//! ## Modules
//!
//! - [`bigmath`]: adaptive-precision Newton square root and integer root.
//! - [`worker`]: trial division over one batch.
//! - [`scheduler`]: round planning, partitioning and the round loop.
//! - [`engine`]: start/stop control surface around the round loop.
//! - [`checkpoint`]: versioned snapshot persistence.
//! - [`snapshot`]: frontier/prime-set snapshot, batches, timing records.
//! - [`progress`]: atomic counters and background status reporter.
//! - [`report`]: timing-table formatting and JSON export.

pub mod bigmath;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod report;
pub mod scheduler;
pub mod snapshot;
pub mod worker;

pub use config::EngineConfig;
pub use engine::{Engine, RunOutcome};
pub use error::EngineError;
pub use snapshot::{Batch, ResultSnapshot, TimingRecord};
