//! jacsolv: Jacobi and Gauss-Seidel stationary solvers for dense, diagonally dominant systems.
//!
//! The update rule (Jacobi or Gauss-Seidel) and the execution model (serial, a rayon worker pool,
//! or a device queue) are independent strategies. Iterates are double-buffered and swap roles each
//! sweep; convergence is the L2 norm of successive differences, reduced per partition and
//! aggregated in order.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod device;
pub mod error;
pub mod kernel;
pub mod matrix;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use crate::core::*;
pub use error::*;
pub use matrix::*;
pub use solver::*;
pub use utils::*;

pub use kernel::UpdateRule;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
