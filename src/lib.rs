//! # distmatvec
//!
//! Dense matrix-vector multiplication split across a coordinator and a fixed
//! set of workers that share nothing and talk only through ordered
//! point-to-point messages.
//!
//! ## Usage
//!
//! ```bash
//! distmatvec run --vector vector.txt --matrix matrix.txt --workers 4
//! distmatvec plan --rows 10 --workers 3
//! ```
//!
//! ## Modules
//!
//! - `math` - Checked integer dot products (VectorMath)
//! - `partition` - Pure row partitioning between coordinator and workers
//! - `protocol` - Messages and per-worker links
//! - `coordinator` - Plan, dispatch, local compute, collect and publish
//! - `worker` - Receives an assignment and returns its partial result
//! - `matrix` - Dense row-major matrix type
//! - `io` - Input file parsing and result rendering
//! - `config` - Layered run configuration
//! - `error` - Error types shared by every module
//!
//! ## Example
//!
//! ```
//! use distmatvec::coordinator::{Coordinator, CoordinatorOptions};
//! use distmatvec::matrix::Matrix;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let matrix = Matrix::from_rows(vec![vec![1, 0, 0], vec![0, 1, 0], vec![1, 1, 1]]).unwrap();
//! let coordinator = Coordinator::new(CoordinatorOptions::with_workers(2));
//! let result = rt.block_on(coordinator.run(&[1, 2, 3], &matrix)).unwrap();
//! assert_eq!(result, vec![1, 2, 6]);
//! ```
pub mod config;
pub mod coordinator;
pub mod error;
pub mod io;
pub mod math;
pub mod matrix;
pub mod partition;
pub mod protocol;
pub mod worker;

pub use coordinator::{Coordinator, CoordinatorOptions};
pub use error::{MatvecError, Result};
pub use matrix::Matrix;
pub use partition::{partition, Partition};
