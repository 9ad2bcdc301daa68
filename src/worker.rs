//! Worker side of the exchange
//!
//! A worker talks only to the coordinator. It validates every message it
//! receives against the handshake and fails fast on anything unexpected;
//! there is no retry and no default substitution.

use crate::error::{MatvecError, Result};
use crate::math::{compute_rows, Element};
use crate::protocol::{Dispatch, PartialResult, WorkerLink};
use tracing::{debug, warn};

/// One worker participant
pub struct Worker {
    link: WorkerLink,
}

impl Worker {
    pub fn new(link: WorkerLink) -> Self {
        Self { link }
    }

    pub fn rank(&self) -> usize {
        self.link.rank()
    }

    /// Receive the assignment, compute it, and report the partial result.
    pub async fn run(mut self) -> Result<()> {
        let rank = self.rank();
        let outcome = self.exchange().await;
        if let Err(e) = &outcome {
            warn!(rank, error = %e, "worker aborted");
        }
        outcome
    }

    async fn exchange(&mut self) -> Result<()> {
        let rank = self.rank();

        let (stride, cols, first_row) = match self.link.recv().await? {
            Dispatch::Dimensions {
                stride,
                cols,
                first_row,
            } => (stride, cols, first_row),
            other => return Err(unexpected(rank, "dimensions", &other)),
        };
        debug!(rank, stride, cols, first_row, "received dimensions");

        if stride == 0 {
            debug!(rank, "empty assignment");
            return self.link.send(PartialResult::empty(rank)).await;
        }

        let vector = match self.link.recv().await? {
            Dispatch::Vector(values) => values,
            other => return Err(unexpected(rank, "vector", &other)),
        };
        if vector.len() != cols {
            return Err(MatvecError::protocol(
                rank,
                format!("vector has {} values, expected {cols}", vector.len()),
            ));
        }

        let rows = self.receive_rows(stride, cols).await?;
        let values = compute_rows(&rows, &vector, first_row)?;
        debug!(rank, rows = values.len(), "computed partial result");

        self.link.send(PartialResult { rank, values }).await
    }

    async fn receive_rows(&mut self, stride: usize, cols: usize) -> Result<Vec<Vec<Element>>> {
        let rank = self.rank();
        let mut rows = Vec::with_capacity(stride);

        for index in 0..stride {
            let expected_tag = Dispatch::row_tag(index);
            match self.link.recv().await? {
                Dispatch::Row { tag, values } if tag == expected_tag => {
                    if values.len() != cols {
                        return Err(MatvecError::protocol(
                            rank,
                            format!(
                                "row {tag} has {} values, expected {cols}",
                                values.len()
                            ),
                        ));
                    }
                    rows.push(values);
                }
                Dispatch::Row { tag, .. } => {
                    return Err(MatvecError::protocol(
                        rank,
                        format!("expected row tag {expected_tag}, received {tag}"),
                    ));
                }
                other => return Err(unexpected(rank, "row", &other)),
            }
        }

        Ok(rows)
    }
}

fn unexpected(rank: usize, expected: &str, received: &Dispatch) -> MatvecError {
    MatvecError::protocol(
        rank,
        format!("expected {expected}, received {}", received.kind()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::link;

    #[tokio::test]
    async fn test_worker_computes_rows_in_order() {
        let (mut coord, worker_end) = link(1, 8);
        let handle = tokio::spawn(Worker::new(worker_end).run());

        coord
            .send(
                Dispatch::Dimensions {
                    stride: 2,
                    cols: 3,
                    first_row: 0,
                },
                None,
            )
            .await
            .unwrap();
        coord
            .send(Dispatch::Vector(vec![1, 2, 3]), None)
            .await
            .unwrap();
        for (index, row) in [vec![0, 1, 0], vec![1, 1, 1]].into_iter().enumerate() {
            coord
                .send(
                    Dispatch::Row {
                        tag: Dispatch::row_tag(index),
                        values: row,
                    },
                    None,
                )
                .await
                .unwrap();
        }

        let partial = coord.recv(None).await.unwrap();
        assert_eq!(partial.rank, 1);
        assert_eq!(partial.values, vec![2, 6]);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_worker_with_empty_assignment_replies_immediately() {
        let (mut coord, worker_end) = link(5, 1);
        let handle = tokio::spawn(Worker::new(worker_end).run());

        coord
            .send(
                Dispatch::Dimensions {
                    stride: 0,
                    cols: 4,
                    first_row: 0,
                },
                None,
            )
            .await
            .unwrap();

        let partial = coord.recv(None).await.unwrap();
        assert_eq!(partial, PartialResult::empty(5));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_worker_rejects_vector_before_dimensions() {
        let (coord, worker_end) = link(1, 4);
        let handle = tokio::spawn(Worker::new(worker_end).run());

        coord.send(Dispatch::Vector(vec![1]), None).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, MatvecError::Protocol { rank: 1, .. }));
        assert!(err.to_string().contains("expected dimensions"));
    }

    #[tokio::test]
    async fn test_worker_rejects_out_of_order_row() {
        let (coord, worker_end) = link(2, 4);
        let handle = tokio::spawn(Worker::new(worker_end).run());

        coord
            .send(
                Dispatch::Dimensions {
                    stride: 2,
                    cols: 1,
                    first_row: 0,
                },
                None,
            )
            .await
            .unwrap();
        coord.send(Dispatch::Vector(vec![1]), None).await.unwrap();
        coord
            .send(
                Dispatch::Row {
                    tag: 2,
                    values: vec![1],
                },
                None,
            )
            .await
            .unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("expected row tag 1, received 2"));
    }

    #[tokio::test]
    async fn test_worker_rejects_short_row() {
        let (coord, worker_end) = link(1, 4);
        let handle = tokio::spawn(Worker::new(worker_end).run());

        coord
            .send(
                Dispatch::Dimensions {
                    stride: 1,
                    cols: 2,
                    first_row: 0,
                },
                None,
            )
            .await
            .unwrap();
        coord.send(Dispatch::Vector(vec![1, 1]), None).await.unwrap();
        coord
            .send(
                Dispatch::Row {
                    tag: 1,
                    values: vec![1],
                },
                None,
            )
            .await
            .unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 values, expected 2"));
    }

    #[tokio::test]
    async fn test_worker_fails_when_coordinator_hangs_up() {
        let (coord, worker_end) = link(3, 4);
        let handle = tokio::spawn(Worker::new(worker_end).run());

        coord
            .send(
                Dispatch::Dimensions {
                    stride: 2,
                    cols: 1,
                    first_row: 0,
                },
                None,
            )
            .await
            .unwrap();
        drop(coord);

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, MatvecError::Protocol { rank: 3, .. }));
    }

    #[tokio::test]
    async fn test_worker_overflow_names_global_row() {
        let (mut coord, worker_end) = link(2, 4);
        let handle = tokio::spawn(Worker::new(worker_end).run());

        coord
            .send(
                Dispatch::Dimensions {
                    stride: 2,
                    cols: 2,
                    first_row: 6,
                },
                None,
            )
            .await
            .unwrap();
        coord
            .send(Dispatch::Vector(vec![i32::MIN, i32::MIN]), None)
            .await
            .unwrap();
        for (index, row) in [vec![1, 1], vec![i32::MIN, i32::MIN]]
            .into_iter()
            .enumerate()
        {
            coord
                .send(
                    Dispatch::Row {
                        tag: Dispatch::row_tag(index),
                        values: row,
                    },
                    None,
                )
                .await
                .unwrap();
        }

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, MatvecError::Overflow { row: 7 }));
        assert!(coord.recv(None).await.is_err());
    }
}
