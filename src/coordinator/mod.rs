//! Coordinator: plan, dispatch, compute locally, collect, publish
//!
//! The coordinator is identity 0 of the partition. It owns the input matrix
//! and hands out row slices; workers never see the whole matrix. Its own
//! remainder rows go through the same [`compute_rows`] path the workers use.
//!
//! Without a configured deadline a silent worker blocks collection forever.
//! With one, every pending send and receive is bounded and expiry becomes
//! [`MatvecError::CommunicationStall`].

pub mod assembly;
pub mod phase;

pub use assembly::ResultAssembler;
pub use phase::Phase;

use crate::config::MatvecConfig;
use crate::error::{MatvecError, Result};
use crate::math::{compute_rows, Accumulator, Element};
use crate::matrix::Matrix;
use crate::partition::{partition, Partition, COORDINATOR};
use crate::protocol::{link, CoordinatorLink, Dispatch};
use crate::worker::Worker;
use futures::future::{join_all, try_join_all};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long a failed worker's task gets to report its own error
const REAP_GRACE: Duration = Duration::from_millis(500);

/// Settings for a single run
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorOptions {
    /// Worker count, excluding the coordinator
    pub workers: usize,
    /// Deadline for each send and receive; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Dispatched messages allowed in flight per link
    pub channel_capacity: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            timeout: None,
            channel_capacity: 16,
        }
    }
}

impl From<&MatvecConfig> for CoordinatorOptions {
    fn from(config: &MatvecConfig) -> Self {
        Self {
            workers: config.workers,
            timeout: config.timeout,
            channel_capacity: config.channel_capacity,
        }
    }
}

impl CoordinatorOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }
}

pub struct Coordinator {
    options: CoordinatorOptions,
}

impl Coordinator {
    pub fn new(options: CoordinatorOptions) -> Self {
        Self { options }
    }

    /// Load both input files, then run the distributed multiply.
    pub async fn run_from_files(
        &self,
        vector_path: &Path,
        matrix_path: &Path,
    ) -> Result<Vec<Accumulator>> {
        info!(phase = %Phase::Load, "Loading inputs");
        let (vector, matrix) = crate::io::read_inputs(vector_path, matrix_path).await?;
        self.run(&vector, &matrix).await
    }

    /// Spawn the configured workers, each on its own link, and run.
    pub async fn run(&self, vector: &[Element], matrix: &Matrix) -> Result<Vec<Accumulator>> {
        let mut links = Vec::with_capacity(self.options.workers);
        let mut handles = Vec::with_capacity(self.options.workers);

        for rank in 1..=self.options.workers {
            let (coordinator_end, worker_end) = link(rank, self.options.channel_capacity);
            handles.push(tokio::spawn(Worker::new(worker_end).run()));
            links.push(coordinator_end);
        }

        match self.run_with_links(vector, matrix, links).await {
            Ok(values) => {
                reap_workers(handles).await?;
                Ok(values)
            }
            Err(e) => Err(explain_failure(e, handles).await),
        }
    }

    /// Run against an already established topology.
    ///
    /// `links[i]` must connect to worker `i + 1`. The link count is the
    /// worker count of the run, regardless of `options.workers`.
    pub async fn run_with_links(
        &self,
        vector: &[Element],
        matrix: &Matrix,
        mut links: Vec<CoordinatorLink>,
    ) -> Result<Vec<Accumulator>> {
        let started = Instant::now();
        let workers = links.len();
        check_topology(&links)?;

        // A matrix with no rows cannot disagree with the vector
        if !matrix.is_empty() && matrix.cols() != vector.len() {
            return Err(MatvecError::DimensionMismatch {
                expected: matrix.cols(),
                actual: vector.len(),
            });
        }

        let mut phase = Phase::Plan;
        let plan = partition(matrix.row_count(), workers);
        info!(
            phase = %phase,
            rows = plan.rows,
            workers,
            stride = plan.stride,
            extra = plan.extra,
            "Planned partition"
        );
        let mut assembler = ResultAssembler::new(plan);
        advance(&mut phase, workers);

        if phase == Phase::Dispatch {
            self.dispatch(&plan, vector, matrix, &links).await?;
            advance(&mut phase, workers);
        }

        let local = plan.range(COORDINATOR);
        debug!(phase = %phase, start = local.start, end = local.end, "Computing reserved rows");
        let values = compute_rows(matrix.slice(local.clone()), vector, local.start)?;
        assembler.place(COORDINATOR, &values)?;
        advance(&mut phase, workers);

        if phase == Phase::Collect {
            self.collect(&plan, &mut links, &mut assembler).await?;
            advance(&mut phase, workers);
        }

        let result = assembler.finish()?;
        info!(
            phase = %phase,
            rows = result.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Result vector complete"
        );
        Ok(result)
    }

    async fn dispatch(
        &self,
        plan: &Partition,
        vector: &[Element],
        matrix: &Matrix,
        links: &[CoordinatorLink],
    ) -> Result<()> {
        let timeout = self.options.timeout;
        let sends = links.iter().map(|link| {
            let range = plan.range(link.worker());
            let first_row = range.start;
            let rows = matrix.slice(range);
            async move {
                debug!(worker = link.worker(), rows = rows.len(), "Dispatching");
                link.send(
                    Dispatch::Dimensions {
                        stride: plan.stride,
                        cols: vector.len(),
                        first_row,
                    },
                    timeout,
                )
                .await?;

                // Empty assignments get the handshake only
                if plan.stride > 0 {
                    link.send(Dispatch::Vector(vector.to_vec()), timeout)
                        .await?;
                    for (index, row) in rows.iter().enumerate() {
                        link.send(
                            Dispatch::Row {
                                tag: Dispatch::row_tag(index),
                                values: row.clone(),
                            },
                            timeout,
                        )
                        .await?;
                    }
                }
                Ok::<(), MatvecError>(())
            }
        });

        try_join_all(sends).await?;
        Ok(())
    }

    async fn collect(
        &self,
        plan: &Partition,
        links: &mut [CoordinatorLink],
        assembler: &mut ResultAssembler,
    ) -> Result<()> {
        let timeout = self.options.timeout;
        let replies = links.iter_mut().map(|link| async move {
            let worker = link.worker();
            let partial = link.recv(timeout).await?;
            if partial.rank != worker {
                return Err(MatvecError::worker_failed(
                    worker,
                    format!("reply labelled with rank {}", partial.rank),
                ));
            }
            debug!(worker, offset = plan.offset(worker), "Collected partial result");
            Ok::<_, MatvecError>(partial)
        });

        for partial in try_join_all(replies).await? {
            assembler.place(partial.rank, &partial.values)?;
        }
        Ok(())
    }
}

fn advance(phase: &mut Phase, workers: usize) {
    if let Some(next) = phase.next(workers) {
        debug!(from = %phase, to = %next, "Phase transition");
        *phase = next;
    }
}

fn check_topology(links: &[CoordinatorLink]) -> Result<()> {
    for (index, link) in links.iter().enumerate() {
        if link.worker() != index + 1 {
            return Err(MatvecError::Config(format!(
                "link {index} connects to worker {}, expected worker {}",
                link.worker(),
                index + 1
            )));
        }
    }
    Ok(())
}

/// Wait for every worker task after a successful run.
async fn reap_workers(handles: Vec<JoinHandle<Result<()>>>) -> Result<()> {
    for (index, outcome) in join_all(handles).await.into_iter().enumerate() {
        let rank = index + 1;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(MatvecError::from_worker(rank, e)),
            Err(e) => return Err(MatvecError::worker_failed(rank, e.to_string())),
        }
    }
    Ok(())
}

/// Stop remaining workers and, when a worker's own error explains the
/// failure, report that instead of the bare disconnect. A worker's compute
/// error is returned as is, so an overflow names the same global row
/// whichever participant hit it.
async fn explain_failure(error: MatvecError, handles: Vec<JoinHandle<Result<()>>>) -> MatvecError {
    let failed = match &error {
        MatvecError::WorkerFailed { worker, .. } => Some(*worker),
        _ => None,
    };

    let mut explained = None;
    for (index, mut handle) in handles.into_iter().enumerate() {
        let rank = index + 1;
        if Some(rank) != failed {
            handle.abort();
            continue;
        }
        match tokio::time::timeout(REAP_GRACE, &mut handle).await {
            Ok(Ok(Err(e))) => explained = Some(MatvecError::from_worker(rank, e)),
            Ok(Err(e)) => explained = Some(MatvecError::worker_failed(rank, e.to_string())),
            Ok(Ok(Ok(()))) => {}
            Err(_) => handle.abort(),
        }
    }

    let error = explained.unwrap_or(error);
    warn!(error = %error, "Run aborted, no result published");
    error
}

#[cfg(test)]
mod tests;
