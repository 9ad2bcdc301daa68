//! Pure row partitioning
//!
//! Rows `0..n` are split into contiguous ranges. Identity 0 is the
//! coordinator and owns the remainder rows at the top of the matrix;
//! identities `1..=w` are workers, each owning `stride` rows after that.
//!
//! ```text
//!  0        extra    extra+stride          n
//!  ├─ coord ─┼── w1 ───┼── w2 ───┼ ... ┼── ww ───┤
//! ```
//!
//! The split is static: it does not adapt to uneven per-row cost.

use serde::Serialize;
use std::ops::Range;

/// Identity of the coordinator within a partition
pub const COORDINATOR: usize = 0;

/// Static assignment of matrix rows to participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// Total row count `n`
    pub rows: usize,
    /// Worker count `w`, excluding the coordinator
    pub workers: usize,
    /// Rows per worker; zero when there are no workers
    pub stride: usize,
    /// Rows reserved for the coordinator
    pub extra: usize,
}

/// A single row of the partition table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub identity: usize,
    pub start: usize,
    pub end: usize,
}

impl Assignment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Pure: Split `rows` rows across `workers` workers.
///
/// With no workers the coordinator owns every row.
pub fn partition(rows: usize, workers: usize) -> Partition {
    if workers == 0 {
        return Partition {
            rows,
            workers,
            stride: 0,
            extra: rows,
        };
    }

    Partition {
        rows,
        workers,
        stride: rows / workers,
        extra: rows % workers,
    }
}

impl Partition {
    /// Row range owned by `identity`; `0` is the coordinator.
    ///
    /// # Panics
    ///
    /// Panics if `identity` is greater than the worker count.
    pub fn range(&self, identity: usize) -> Range<usize> {
        assert!(
            identity <= self.workers,
            "identity {identity} outside topology of {} workers",
            self.workers
        );
        if identity == COORDINATOR {
            return 0..self.extra;
        }
        let start = self.offset(identity);
        start..start + self.stride
    }

    /// First global row index owned by worker `identity`
    ///
    /// # Panics
    ///
    /// Panics if `identity` is the coordinator.
    pub fn offset(&self, identity: usize) -> usize {
        assert!(
            identity != COORDINATOR,
            "the coordinator's rows start at 0, not at a worker offset"
        );
        self.extra + (identity - 1) * self.stride
    }

    /// Every identity with its range, coordinator first
    pub fn ranges(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        (0..=self.workers).map(move |identity| (identity, self.range(identity)))
    }

    /// The partition as a table, coordinator first
    pub fn assignments(&self) -> Vec<Assignment> {
        self.ranges()
            .map(|(identity, range)| Assignment {
                identity,
                start: range.start,
                end: range.end,
            })
            .collect()
    }
}
