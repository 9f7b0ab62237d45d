//! Error types for the trial-division engine.
//!
//! Misuse of the engine surface (querying a worker before it is done, stopping
//! an engine that is not running) is reported as [`EngineError::IllegalState`].
//! Failures of the coordination machinery itself are fatal and reported as
//! [`EngineError::Coordination`]; nothing in the engine retries them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("square root undefined for {value}")]
    Domain { value: String },

    #[error("precision must be at least one significant digit, got {0}")]
    InvalidPrecision(u32),

    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    #[error("coordination failure: {0}")]
    Coordination(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
