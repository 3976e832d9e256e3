//! Solver configuration.

pub mod options;
pub use options::{DEFAULT_PARTITION, Diagnostics, SolverOptions};
