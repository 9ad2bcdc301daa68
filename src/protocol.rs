//! Point-to-point messages between the coordinator and one worker
//!
//! Each coordinator–worker pair owns a [`link`]: one bounded channel per
//! direction. Channels are FIFO, so message order within a pair is preserved
//! end to end; nothing orders messages across different pairs.
//!
//! The stream a worker sees is always:
//!
//! ```text
//! Dimensions (tag 0) -> Vector (tag 0) -> Row tag 1 -> ... -> Row tag stride
//! ```
//!
//! and a worker with `stride == 0` sees only the dimension handshake. The
//! reply is a single [`PartialResult`].

use crate::error::{ExchangePhase, MatvecError, Result};
use crate::math::{Accumulator, Element};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

/// Tag reserved for the dimension and vector handshake
pub const HANDSHAKE_TAG: usize = 0;

/// Message sent from the coordinator to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Rows assigned to the worker, the row width, and the global index of
    /// the first assigned row
    Dimensions {
        stride: usize,
        cols: usize,
        first_row: usize,
    },
    /// Copy of the shared input vector
    Vector(Vec<Element>),
    /// One matrix row, tagged by its local position starting at 1
    Row { tag: usize, values: Vec<Element> },
}

impl Dispatch {
    pub fn tag(&self) -> usize {
        match self {
            Dispatch::Dimensions { .. } | Dispatch::Vector(_) => HANDSHAKE_TAG,
            Dispatch::Row { tag, .. } => *tag,
        }
    }

    /// Tag carried by the row at local index `index`
    pub fn row_tag(index: usize) -> usize {
        index + 1
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Dispatch::Dimensions { .. } => "dimensions",
            Dispatch::Vector(_) => "vector",
            Dispatch::Row { .. } => "row",
        }
    }
}

/// Reply from a worker: its slice of the result vector, in row order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult {
    pub rank: usize,
    pub values: Vec<Accumulator>,
}

impl PartialResult {
    pub fn empty(rank: usize) -> Self {
        Self {
            rank,
            values: Vec::new(),
        }
    }
}

/// Coordinator's end of a link
#[derive(Debug)]
pub struct CoordinatorLink {
    worker: usize,
    to_worker: mpsc::Sender<Dispatch>,
    from_worker: mpsc::Receiver<PartialResult>,
}

/// Worker's end of a link
#[derive(Debug)]
pub struct WorkerLink {
    rank: usize,
    from_coordinator: mpsc::Receiver<Dispatch>,
    to_coordinator: mpsc::Sender<PartialResult>,
}

/// Create the link between the coordinator and worker `worker`.
///
/// `capacity` bounds how many dispatched messages may be in flight before
/// `send` waits for the worker to catch up.
pub fn link(worker: usize, capacity: usize) -> (CoordinatorLink, WorkerLink) {
    let capacity = capacity.max(1);
    let (dispatch_tx, dispatch_rx) = mpsc::channel(capacity);
    let (reply_tx, reply_rx) = mpsc::channel(1);

    (
        CoordinatorLink {
            worker,
            to_worker: dispatch_tx,
            from_worker: reply_rx,
        },
        WorkerLink {
            rank: worker,
            from_coordinator: dispatch_rx,
            to_coordinator: reply_tx,
        },
    )
}

/// Await `fut`, giving up after `deadline` if one is set.
///
/// Returns the configured deadline on expiry.
async fn within<F: Future>(
    deadline: Option<Duration>,
    fut: F,
) -> std::result::Result<F::Output, Duration> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| limit),
        None => Ok(fut.await),
    }
}

impl CoordinatorLink {
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Send one message, blocking while the channel is full.
    pub async fn send(&self, message: Dispatch, deadline: Option<Duration>) -> Result<()> {
        trace!(
            worker = self.worker,
            kind = message.kind(),
            tag = message.tag(),
            "dispatch"
        );
        match within(deadline, self.to_worker.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(MatvecError::worker_failed(
                self.worker,
                "link closed during dispatch",
            )),
            Err(waited) => Err(MatvecError::CommunicationStall {
                worker: self.worker,
                phase: ExchangePhase::Dispatch,
                waited,
            }),
        }
    }

    /// Wait for the worker's partial result.
    pub async fn recv(&mut self, deadline: Option<Duration>) -> Result<PartialResult> {
        match within(deadline, self.from_worker.recv()).await {
            Ok(Some(partial)) => {
                trace!(
                    worker = self.worker,
                    len = partial.values.len(),
                    "partial result"
                );
                Ok(partial)
            }
            Ok(None) => Err(MatvecError::worker_failed(
                self.worker,
                "link closed before partial result arrived",
            )),
            Err(waited) => Err(MatvecError::CommunicationStall {
                worker: self.worker,
                phase: ExchangePhase::Collect,
                waited,
            }),
        }
    }
}

impl WorkerLink {
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Block until the next message from the coordinator.
    pub async fn recv(&mut self) -> Result<Dispatch> {
        self.from_coordinator
            .recv()
            .await
            .ok_or_else(|| MatvecError::protocol(self.rank, "coordinator closed the link"))
    }

    /// Send the partial result back to the coordinator.
    pub async fn send(&self, partial: PartialResult) -> Result<()> {
        self.to_coordinator
            .send(partial)
            .await
            .map_err(|_| MatvecError::protocol(self.rank, "coordinator stopped listening"))
    }
}
