//! Coordinator phases
//!
//! ```text
//! Load -> Plan -> Dispatch -> LocalCompute -> Collect -> Publish
//!              \______________/            \__________/
//!               no workers                  no workers
//! ```
//!
//! Phases run strictly in sequence and are never re-entered.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Load,
    Plan,
    Dispatch,
    LocalCompute,
    Collect,
    Publish,
}

impl Phase {
    /// Pure: the phase that follows `self` for a run with `workers` workers.
    ///
    /// Returns `None` once the result has been published.
    pub fn next(self, workers: usize) -> Option<Phase> {
        match self {
            Phase::Load => Some(Phase::Plan),
            Phase::Plan if workers == 0 => Some(Phase::LocalCompute),
            Phase::Plan => Some(Phase::Dispatch),
            Phase::Dispatch => Some(Phase::LocalCompute),
            Phase::LocalCompute if workers == 0 => Some(Phase::Publish),
            Phase::LocalCompute => Some(Phase::Collect),
            Phase::Collect => Some(Phase::Publish),
            Phase::Publish => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Plan => "plan",
            Phase::Dispatch => "dispatch",
            Phase::LocalCompute => "local-compute",
            Phase::Collect => "collect",
            Phase::Publish => "publish",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
