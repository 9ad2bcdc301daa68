//! Reading the input files and rendering the result
//!
//! Vector file: one line of whitespace-separated integers.
//! Matrix file: a line holding the row count `n`, then `n` lines of exactly
//! `m` integers each, where `m` is the vector length. Anything after the
//! `n`th row is ignored.

use crate::config::OutputFormat;
use crate::error::{MatvecError, Result};
use crate::math::{Accumulator, Element};
use crate::matrix::Matrix;
use crate::partition::Partition;
use std::path::Path;
use tracing::{debug, info};

/// Parse the vector file contents.
pub fn parse_vector(path: &Path, content: &str) -> Result<Vec<Element>> {
    let line = content
        .lines()
        .next()
        .ok_or_else(|| MatvecError::input(path, 0, "file is empty"))?;

    let values = parse_line(path, 1, line)?;
    if values.is_empty() {
        return Err(MatvecError::input(path, 1, "vector has no values"));
    }
    Ok(values)
}

/// Parse the matrix file contents, requiring rows of width `cols`.
pub fn parse_matrix(path: &Path, content: &str, cols: usize) -> Result<Matrix> {
    let mut lines = content.lines();

    let header = lines
        .next()
        .ok_or_else(|| MatvecError::input(path, 0, "file is empty"))?;
    let row_count = parse_header(path, header)?;

    let mut rows = Vec::with_capacity(row_count);
    for index in 0..row_count {
        let line_number = index + 2;
        let line = lines.next().ok_or_else(|| {
            MatvecError::input(
                path,
                line_number,
                format!("expected {row_count} rows, found {index}"),
            )
        })?;

        let row = parse_line(path, line_number, line)?;
        if row.len() != cols {
            return Err(MatvecError::input(
                path,
                line_number,
                format!("expected {cols} values, found {}", row.len()),
            ));
        }
        rows.push(row);
    }

    Matrix::new(cols, rows)
}

fn parse_header(path: &Path, line: &str) -> Result<usize> {
    let mut tokens = line.split_whitespace();
    let token = tokens
        .next()
        .ok_or_else(|| MatvecError::input(path, 1, "missing row count"))?;
    if tokens.next().is_some() {
        return Err(MatvecError::input(
            path,
            1,
            "row count line must hold a single integer",
        ));
    }
    token
        .parse::<usize>()
        .map_err(|_| MatvecError::input(path, 1, format!("invalid row count '{token}'")))
}

fn parse_line(path: &Path, line_number: usize, line: &str) -> Result<Vec<Element>> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<Element>().map_err(|_| {
                MatvecError::input(path, line_number, format!("invalid integer '{token}'"))
            })
        })
        .collect()
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MatvecError::input(path, 0, format!("cannot read file: {e}")))
}

/// Read and validate both input files.
pub async fn read_inputs(vector_path: &Path, matrix_path: &Path) -> Result<(Vec<Element>, Matrix)> {
    let vector = parse_vector(vector_path, &read_source(vector_path).await?)?;
    debug!("vector size: {}", vector.len());

    let matrix = parse_matrix(matrix_path, &read_source(matrix_path).await?, vector.len())?;
    info!(
        "Loaded {} x {} matrix and vector of length {}",
        matrix.row_count(),
        matrix.cols(),
        vector.len()
    );

    Ok((vector, matrix))
}

/// Render the result vector in the requested format.
pub fn render(values: &[Accumulator], format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Plain => {
            let joined = values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {joined} }}")
        }
        OutputFormat::Json => serde_json::to_string(values)?,
        OutputFormat::Lines => values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Ok(rendered)
}

/// Render the partition table: one line per identity, coordinator first.
pub fn render_plan(plan: &Partition, format: OutputFormat) -> Result<String> {
    let assignments = plan.assignments();
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&assignments)?),
        OutputFormat::Plain | OutputFormat::Lines => {
            let mut out = format!(
                "rows={} workers={} stride={} extra={}",
                plan.rows, plan.workers, plan.stride, plan.extra
            );
            for a in &assignments {
                let who = if a.identity == 0 {
                    "coordinator".to_string()
                } else {
                    format!("worker {}", a.identity)
                };
                out.push_str(&format!(
                    "\n{who}: rows [{}, {}) ({} rows)",
                    a.start,
                    a.end,
                    a.len()
                ));
            }
            Ok(out)
        }
    }
}
