//! Incremental assembly of the result vector
//!
//! Each identity's values are placed at the offset the partition gives it,
//! so arrival order never affects the result. A range is filled exactly
//! once; the vector is only released when every range has been filled.

use crate::error::{MatvecError, Result};
use crate::math::Accumulator;
use crate::partition::Partition;

#[derive(Debug)]
pub struct ResultAssembler {
    partition: Partition,
    values: Vec<Accumulator>,
    reported: Vec<bool>,
}

impl ResultAssembler {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            values: vec![0; partition.rows],
            reported: vec![false; partition.workers + 1],
        }
    }

    /// Fill the range owned by `identity` with `values`.
    pub fn place(&mut self, identity: usize, values: &[Accumulator]) -> Result<()> {
        if identity > self.partition.workers {
            return Err(MatvecError::worker_failed(
                identity,
                "partial result from an identity outside the topology",
            ));
        }
        if self.reported[identity] {
            return Err(MatvecError::worker_failed(
                identity,
                "partial result delivered twice",
            ));
        }

        let range = self.partition.range(identity);
        if values.len() != range.len() {
            return Err(MatvecError::worker_failed(
                identity,
                format!(
                    "partial result has {} values, expected {}",
                    values.len(),
                    range.len()
                ),
            ));
        }

        self.values[range].copy_from_slice(values);
        self.reported[identity] = true;
        Ok(())
    }

    /// Identities that have not reported yet
    pub fn pending(&self) -> Vec<usize> {
        self.reported
            .iter()
            .enumerate()
            .filter(|(_, done)| !**done)
            .map(|(identity, _)| identity)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.reported.iter().all(|done| *done)
    }

    /// Release the result vector once every range is filled.
    pub fn finish(self) -> Result<Vec<Accumulator>> {
        if !self.is_complete() {
            return Err(MatvecError::Incomplete {
                missing: self.pending(),
            });
        }
        Ok(self.values)
    }
}
