//! Stationary solver interface, driver and verification.

use crate::utils::convergence::SolveStats;

/// Common interface for any iterative solver.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar: Copy + PartialOrd;
    /// Solve A·x = b, writing result into `x`.
    /// Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        a: &M,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<<Self as LinearSolver<M, V>>::Scalar>, Self::Error>;
}

pub mod jacobi;
pub use jacobi::{JacobiSolver, SolverState};

pub mod verify;
pub use verify::{Verification, verify};
