//! Context types that pick an executor and run the solver over it.

pub mod solve_context;
pub use solve_context::{ExecutionModel, SolveContext};
