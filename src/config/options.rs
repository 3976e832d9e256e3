//! Solver options.
//!
//! `SolverOptions` carries everything the driver needs: problem size, stopping criteria, the
//! reduction partition (work-group) size, the update rule and diagnostic switches. The two update
//! rules come with their own defaults, kept independent of each other:
//!
//! | rule         | n     | tol  | max_iters |
//! |--------------|-------|------|-----------|
//! | Jacobi       | 1024  | 1e-3 | 5000      |
//! | Gauss-Seidel | 20000 | 1e-5 | 100000    |

use crate::core::traits::Real;
use crate::error::SolveError;
use crate::kernel::{UpdateRule, check_partition};
use bitflags::bitflags;

pub const DEFAULT_PARTITION: usize = 64;

bitflags! {
    /// Runtime diagnostics, reported through `tracing` at info level when set.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Diagnostics: u32 {
        /// Residual after every sweep.
        const CONVERGENCE_TRACE = 0b0001;
        /// Per-row differences during verification.
        const RESIDUAL_TRACE    = 0b0010;
        /// Dump the coefficient matrix before solving.
        const MATRIX_DUMP       = 0b0100;
        const DEBUG             = Self::CONVERGENCE_TRACE.bits() | Self::RESIDUAL_TRACE.bits();
    }
}

#[derive(Debug, Clone)]
pub struct SolverOptions<T> {
    /// Order of the system.
    pub n: usize,
    /// Stop once the L2 norm of successive differences is at or below this value.
    pub tol: T,
    /// Iteration cap; reaching it ends the solve as non-converged.
    pub max_iters: usize,
    /// Rows per reduction partition (device work-group size).
    pub partition: usize,
    pub rule: UpdateRule,
    pub diagnostics: Diagnostics,
}

impl<T: Real> SolverOptions<T> {
    pub fn jacobi() -> Self {
        Self {
            n: 1024,
            tol: T::of(1e-3),
            max_iters: 5000,
            partition: DEFAULT_PARTITION,
            rule: UpdateRule::Jacobi,
            diagnostics: Diagnostics::empty(),
        }
    }

    pub fn gauss_seidel() -> Self {
        Self {
            n: 20000,
            tol: T::of(1e-5),
            max_iters: 100_000,
            partition: DEFAULT_PARTITION,
            rule: UpdateRule::GaussSeidel,
            diagnostics: Diagnostics::empty(),
        }
    }

    pub fn for_rule(rule: UpdateRule) -> Self {
        match rule {
            UpdateRule::Jacobi => Self::jacobi(),
            UpdateRule::GaussSeidel => Self::gauss_seidel(),
        }
    }

    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    pub fn with_tol(mut self, tol: T) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_partition(mut self, partition: usize) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Checks that do not depend on the system or executor.
    pub fn validate_scalars(&self) -> Result<(), SolveError> {
        if !(self.tol >= T::zero()) || !self.tol.is_finite() {
            return Err(SolveError::config(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tol
            )));
        }
        if self.max_iters == 0 {
            return Err(SolveError::config("iteration cap must be at least 1"));
        }
        if self.partition == 0 {
            return Err(SolveError::config("work-group size must be positive"));
        }
        Ok(())
    }

    /// Full eager validation. Jacobi also needs `n` to be a multiple of the partition size;
    /// Gauss-Seidel sweeps accept a ragged last partition.
    pub fn validate(&self) -> Result<(), SolveError> {
        self.validate_scalars()?;
        if self.n == 0 {
            return Err(SolveError::config("problem size must be positive"));
        }
        if self.rule == UpdateRule::Jacobi {
            check_partition(self.n, self.partition)?;
        }
        Ok(())
    }
}

impl<T: Real> Default for SolverOptions<T> {
    fn default() -> Self {
        Self::jacobi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_defaults_are_independent() {
        let j = SolverOptions::<f64>::jacobi();
        let gs = SolverOptions::<f64>::gauss_seidel();
        assert_eq!((j.n, j.max_iters), (1024, 5000));
        assert_eq!((gs.n, gs.max_iters), (20000, 100_000));
        assert_eq!(j.tol, 1e-3);
        assert_eq!(gs.tol, 1e-5);
    }

    #[test]
    fn validate_rejects_non_dividing_wgsize() {
        let opts = SolverOptions::<f64>::jacobi().with_n(10).with_partition(3);
        assert!(matches!(opts.validate(), Err(SolveError::Configuration(_))));
        assert!(SolverOptions::<f64>::gauss_seidel().with_n(10).with_partition(3).validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_scalars() {
        assert!(SolverOptions::<f64>::jacobi().with_tol(-1.0).validate().is_err());
        assert!(SolverOptions::<f64>::jacobi().with_tol(f64::NAN).validate().is_err());
        assert!(SolverOptions::<f64>::jacobi().with_max_iters(0).validate().is_err());
        assert!(SolverOptions::<f64>::jacobi().validate().is_ok());
    }
}
