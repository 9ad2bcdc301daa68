//! Error types for the distributed multiply
//!
//! Every variant is fatal to the run that raised it. The coordinator never
//! publishes a partial result vector once one of these has been produced.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main error type for a distributed matrix-vector run
#[derive(Debug, Error)]
pub enum MatvecError {
    // Load errors
    #[error("Invalid input at {}: {reason}", location(path, *line))]
    Input {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    // Compute errors
    #[error("Dimension mismatch: expected length {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Dot product overflowed the 64-bit accumulator at row {row}")]
    Overflow { row: usize },

    // Exchange errors
    #[error("Worker {worker} stalled during {phase} (waited {waited:?})")]
    CommunicationStall {
        worker: usize,
        phase: ExchangePhase,
        waited: Duration,
    },

    #[error("Worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },

    #[error("Result vector incomplete: no partial result from {missing:?}")]
    Incomplete { missing: Vec<usize> },

    #[error("Protocol violation at rank {rank}: {reason}")]
    Protocol { rank: usize, reason: String },

    // Ambient errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// `path:line`, or just `path` for whole-file problems (line 0)
fn location(path: &Path, line: usize) -> String {
    if line == 0 {
        path.display().to_string()
    } else {
        format!("{}:{line}", path.display())
    }
}

/// The exchange a participant was blocked on when a deadline expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Dispatch,
    Collect,
}

impl fmt::Display for ExchangePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangePhase::Dispatch => write!(f, "dispatch"),
            ExchangePhase::Collect => write!(f, "collect"),
        }
    }
}

impl MatvecError {
    /// Create an input error for a specific file and 1-based line
    pub fn input(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a protocol violation error
    pub fn protocol(rank: usize, reason: impl Into<String>) -> Self {
        Self::Protocol {
            rank,
            reason: reason.into(),
        }
    }

    /// Create a worker failure error
    pub fn worker_failed(worker: usize, reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            worker,
            reason: reason.into(),
        }
    }

    /// Attribute a worker task's own error to that worker.
    ///
    /// Compute errors keep their type so a run fails the same way however
    /// the rows were partitioned; anything else becomes `WorkerFailed`.
    pub fn from_worker(worker: usize, error: MatvecError) -> Self {
        match error {
            Self::Overflow { .. } | Self::DimensionMismatch { .. } => error,
            other => Self::worker_failed(worker, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MatvecError>;
