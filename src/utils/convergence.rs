//! Convergence tracking & tolerance checks for stationary iterations.

use std::fmt;

/// How the iteration loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Residual at or below the tolerance.
    Converged,
    /// Iteration cap reached first. Not an error.
    MaxItersReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Converged => f.write_str("converged"),
            Termination::MaxItersReached => f.write_str("iteration cap reached"),
        }
    }
}

/// Stopping criteria.
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
    pub termination: Termination,
    /// Residual after each sweep, in order.
    pub residual_history: Vec<T>,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Termination reached after `i` completed sweeps with residual `res_norm`, if any.
    ///
    /// Absolute test: the residual is already a norm of successive differences.
    pub fn check(&self, res_norm: T, i: usize) -> Option<Termination> {
        if res_norm <= self.tol {
            Some(Termination::Converged)
        } else if i >= self.max_iters {
            Some(Termination::MaxItersReached)
        } else {
            None
        }
    }

    pub fn stats(&self, res_norm: T, i: usize, termination: Termination, history: Vec<T>) -> SolveStats<T> {
        SolveStats {
            iterations: i,
            final_residual: res_norm,
            converged: termination == Termination::Converged,
            termination,
            residual_history: history,
        }
    }
}
