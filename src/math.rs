//! Integer dot products
//!
//! Elements are `i32`; every product and the running sum are computed in
//! `i64` with checked arithmetic. A product of two `i32` values always fits
//! in `i64`, so only the sum can overflow, and when it does the overflow is
//! reported instead of wrapping.

use crate::error::{MatvecError, Result};
use thiserror::Error;

/// A single matrix or vector entry
pub type Element = i32;

/// A single entry of the result vector
pub type Accumulator = i64;

/// Failure of a checked dot product
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("operands differ in length: {expected} vs {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("accumulator overflow at element {index}")]
    Overflow { index: usize },
}

/// Dot product of two equal-length sequences.
///
/// # Panics
///
/// Panics if the lengths differ or the sum overflows `i64`. Callers that
/// cannot guarantee either should use [`checked_dot`].
pub fn dot(a: &[Element], b: &[Element]) -> Accumulator {
    assert_eq!(
        a.len(),
        b.len(),
        "dot product operands must have equal length"
    );
    match checked_dot(a, b) {
        Ok(sum) => sum,
        Err(e) => panic!("dot product failed: {e}"),
    }
}

/// Dot product that reports length mismatches and overflow as errors.
pub fn checked_dot(a: &[Element], b: &[Element]) -> std::result::Result<Accumulator, MathError> {
    if a.len() != b.len() {
        return Err(MathError::DimensionMismatch {
            expected: b.len(),
            actual: a.len(),
        });
    }

    a.iter()
        .zip(b)
        .enumerate()
        .try_fold(0 as Accumulator, |sum, (index, (&x, &y))| {
            let product = Accumulator::from(x) * Accumulator::from(y);
            sum.checked_add(product)
                .ok_or(MathError::Overflow { index })
        })
}

/// Dot each row with `vector`, preserving row order.
///
/// `first_row` is the global index of `rows[0]`, used only to label an
/// overflow error with the row that caused it.
pub fn compute_rows<R: AsRef<[Element]>>(
    rows: &[R],
    vector: &[Element],
    first_row: usize,
) -> Result<Vec<Accumulator>> {
    rows.iter()
        .enumerate()
        .map(|(offset, row)| {
            checked_dot(row.as_ref(), vector).map_err(|e| match e {
                MathError::DimensionMismatch { actual, .. } => MatvecError::DimensionMismatch {
                    expected: vector.len(),
                    actual,
                },
                MathError::Overflow { .. } => MatvecError::Overflow {
                    row: first_row + offset,
                },
            })
        })
        .collect()
}
