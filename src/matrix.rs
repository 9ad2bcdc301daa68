//! Dense row-major integer matrix

use crate::error::{MatvecError, Result};
use crate::math::{compute_rows, Accumulator, Element};
use std::ops::Range;

/// An `n x m` matrix whose rows all have exactly `m` entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    cols: usize,
    rows: Vec<Vec<Element>>,
}

impl Matrix {
    /// Build a matrix, rejecting rows whose width differs from `cols`.
    pub fn new(cols: usize, rows: Vec<Vec<Element>>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != cols) {
            return Err(MatvecError::DimensionMismatch {
                expected: cols,
                actual: row.len(),
            });
        }
        Ok(Self { cols, rows })
    }

    /// Build a matrix taking the width from the first row.
    ///
    /// With no rows the width is 0; an empty matrix multiplies with a vector
    /// of any length.
    pub fn from_rows(rows: Vec<Vec<Element>>) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        Self::new(cols, rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> &[Element] {
        &self.rows[index]
    }

    /// Rows in `range`, in order
    pub fn slice(&self, range: Range<usize>) -> &[Vec<Element>] {
        &self.rows[range]
    }

    /// Sequential product with no partitioning, for reference and for the
    /// coordinator-only path.
    pub fn multiply(&self, vector: &[Element]) -> Result<Vec<Accumulator>> {
        if !self.is_empty() && vector.len() != self.cols {
            return Err(MatvecError::DimensionMismatch {
                expected: self.cols,
                actual: vector.len(),
            });
        }
        compute_rows(&self.rows, vector, 0)
    }
}
