//! Stationary iteration driver (Jacobi / Gauss-Seidel).
//!
//! Lifecycle of one solve:
//!
//! ```text
//! Initializing -> Iterating -> { Converged | MaxItersReached } -> Verifying -> Done
//! ```
//!
//! Each pass of `Iterating` swaps iterate roles, runs the update rule through the executor, reduces
//! the per-partition partials and aggregates them in order into the residual. Reaching the iteration
//! cap is a normal outcome reported in the stats; only configuration, resource and device failures
//! are errors.

use std::time::Instant;

use crate::config::{Diagnostics, SolverOptions};
use crate::core::traits::Real;
use crate::error::SolveError;
use crate::kernel::{aggregate, check_partition};
use crate::matrix::{DenseMatrix, LinearSystem};
use crate::parallel::{Executor, Workspace};
use crate::solver::LinearSolver;
use crate::solver::verify::verify;
use crate::utils::convergence::{Convergence, SolveStats, Termination};
use crate::utils::report::SolveReport;
use faer::Mat;
use tracing::{debug, info, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverState {
    Initializing,
    Iterating,
    Converged,
    MaxItersReached,
    Verifying,
    Done,
}

/// Jacobi-family solver over an [`Executor`].
///
/// The update rule comes from the options; the executor decides where sweeps run.
pub struct JacobiSolver<T, E> {
    pub conv: Convergence<T>,
    opts: SolverOptions<T>,
    executor: E,
    state: SolverState,
}

impl<T: Real, E: Executor<T>> JacobiSolver<T, E> {
    /// Rejects invalid tolerance, iteration cap or partition size up front.
    pub fn new(opts: SolverOptions<T>, executor: E) -> Result<Self, SolveError> {
        opts.validate_scalars()?;
        Ok(Self {
            conv: Convergence { tol: opts.tol, max_iters: opts.max_iters },
            opts,
            executor,
            state: SolverState::Initializing,
        })
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn options(&self) -> &SolverOptions<T> {
        &self.opts
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    pub fn run(&mut self, system: &LinearSystem<T>) -> Result<SolveReport<T>, SolveError> {
        self.run_with(&system.a, &system.b)
    }

    /// Solve `A x = b` from a zero initial iterate and verify the result.
    ///
    /// The order of the system is taken from `a`; `opts.n` only sizes generated systems.
    pub fn run_with(&mut self, a: &DenseMatrix<T>, b: &[T]) -> Result<SolveReport<T>, SolveError> {
        self.state = SolverState::Initializing;
        let rule = self.opts.rule;
        let partition = self.opts.partition;
        let diagnostics = self.opts.diagnostics;
        let n = a.nrows();

        if !a.is_square() {
            return Err(SolveError::DimensionMismatch { expected: n, found: a.ncols() });
        }
        if b.len() != n {
            return Err(SolveError::DimensionMismatch { expected: n, found: b.len() });
        }
        if n == 0 {
            return Err(SolveError::config("problem size must be positive"));
        }
        if self.executor.requires_even_partitions(rule) {
            check_partition(n, partition)?;
        }
        if let Some(i) = a.zero_diagonal() {
            return Err(SolveError::ZeroPivot(i));
        }
        if diagnostics.contains(Diagnostics::MATRIX_DUMP) {
            for i in 0..n {
                info!(row = i, values = ?a.row(i), b = %b[i], "system row");
            }
        }

        let device = self.executor.name();
        info!(n, %rule, %device, tol = %self.conv.tol, max_iters = self.conv.max_iters, partition, "starting solve");

        let start = Instant::now();
        let mut ws = self.executor.allocate(a, b, partition)?;
        debug!("iterates allocated at zero");

        // Release on every exit path, device failures included.
        let outcome = self.iterate(&mut ws, a, b);
        let released = self.executor.release(ws);
        let (residual, termination, iters, history, solution) = outcome?;
        released?;
        debug!("workspace released");
        let elapsed = start.elapsed();
        match termination {
            Termination::Converged => {
                info!(iterations = iters, %residual, seconds = elapsed.as_secs_f64(), "converged")
            }
            Termination::MaxItersReached => {
                warn!(iterations = iters, %residual, "iteration cap reached before convergence")
            }
        }

        self.state = SolverState::Verifying;
        let verification = verify(a, b, &solution, diagnostics)?;
        info!(err = %verification.error, checksum = %verification.checksum, "verified");
        self.state = SolverState::Done;

        Ok(SolveReport {
            n,
            device,
            rule,
            tol: self.conv.tol,
            stats: self.conv.stats(residual, iters, termination, history),
            elapsed,
            verification,
            solution,
        })
    }
}

/// Residual, termination, sweep count, residual history and final iterate of one loop.
type LoopOutcome<T> = (T, Termination, usize, Vec<T>, Vec<T>);

impl<T: Real, E: Executor<T>> JacobiSolver<T, E> {
    fn iterate(
        &mut self,
        ws: &mut E::Workspace,
        a: &DenseMatrix<T>,
        b: &[T],
    ) -> Result<LoopOutcome<T>, SolveError> {
        let rule = self.opts.rule;
        self.state = SolverState::Iterating;
        let trace_conv = self.opts.diagnostics.contains(Diagnostics::CONVERGENCE_TRACE);
        let mut history = Vec::new();
        let mut iters = 0;
        let (residual, termination) = loop {
            ws.swap_roles();
            self.executor.update(ws, a, b, rule)?;
            self.executor.reduce(ws, rule)?;
            let residual = aggregate(ws.partials());
            iters += 1;
            history.push(residual);
            if trace_conv {
                info!(iteration = iters, conv = %residual);
            } else {
                trace!(iteration = iters, conv = %residual);
            }
            if let Some(t) = self.conv.check(residual, iters) {
                break (residual, t);
            }
        };
        self.state = match termination {
            Termination::Converged => SolverState::Converged,
            Termination::MaxItersReached => SolverState::MaxItersReached,
        };
        let solution = self.executor.read_solution(ws)?;
        Ok((residual, termination, iters, history, solution))
    }
}

impl<T: Real, E: Executor<T>> LinearSolver<DenseMatrix<T>, Vec<T>> for JacobiSolver<T, E> {
    type Error = SolveError;
    type Scalar = T;

    /// `x` is output only; iteration always starts from zero.
    fn solve(&mut self, a: &DenseMatrix<T>, b: &Vec<T>, x: &mut Vec<T>) -> Result<SolveStats<T>, SolveError> {
        let report = self.run_with(a, b)?;
        *x = report.solution;
        Ok(report.stats)
    }
}

impl<T: Real, E: Executor<T>> LinearSolver<Mat<T>, Vec<T>> for JacobiSolver<T, E> {
    type Error = SolveError;
    type Scalar = T;

    fn solve(&mut self, a: &Mat<T>, b: &Vec<T>, x: &mut Vec<T>) -> Result<SolveStats<T>, SolveError> {
        LinearSolver::<DenseMatrix<T>, Vec<T>>::solve(self, &DenseMatrix::from(a), b, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::host::HostBuffer;
    use crate::device::{Access, Device, DeviceInfo, HostDevice, Kernel, KernelArg, NdRange};
    use crate::kernel::UpdateRule;
    use crate::parallel::{OffloadExecutor, SerialExecutor};

    fn tridiagonal() -> LinearSystem<f64> {
        let a = DenseMatrix::from_rows(&[
            &[4.0, 1.0, 0.0, 0.0],
            &[1.0, 4.0, 1.0, 0.0],
            &[0.0, 1.0, 4.0, 1.0],
            &[0.0, 0.0, 1.0, 4.0],
        ])
        .unwrap();
        LinearSystem::new(a, vec![1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    fn opts(rule: UpdateRule) -> SolverOptions<f64> {
        SolverOptions::for_rule(rule).with_n(4).with_tol(1e-6).with_max_iters(1000).with_partition(2)
    }

    #[test]
    fn jacobi_reaches_done_with_history() {
        let mut solver = JacobiSolver::new(opts(UpdateRule::Jacobi), SerialExecutor).unwrap();
        assert_eq!(solver.state(), SolverState::Initializing);
        let report = solver.run(&tridiagonal()).unwrap();
        assert_eq!(solver.state(), SolverState::Done);
        assert!(report.stats.converged);
        assert!(report.stats.iterations < 50);
        assert_eq!(report.stats.residual_history.len(), report.stats.iterations);
        assert_eq!(report.stats.residual_history.last(), Some(&report.stats.final_residual));
        assert!(report.stats.final_residual <= 1e-6);
    }

    #[test]
    fn gauss_seidel_needs_fewer_sweeps_than_jacobi() {
        let j = JacobiSolver::new(opts(UpdateRule::Jacobi), SerialExecutor)
            .unwrap()
            .run(&tridiagonal())
            .unwrap();
        let gs = JacobiSolver::new(opts(UpdateRule::GaussSeidel), SerialExecutor)
            .unwrap()
            .run(&tridiagonal())
            .unwrap();
        assert!(gs.stats.converged);
        assert!(gs.stats.iterations < j.stats.iterations);
    }

    #[test]
    fn cap_reached_is_not_an_error() {
        let o = opts(UpdateRule::Jacobi).with_max_iters(1);
        let mut solver = JacobiSolver::new(o, SerialExecutor).unwrap();
        let report = solver.run(&tridiagonal()).unwrap();
        assert_eq!(report.stats.termination, Termination::MaxItersReached);
        assert_eq!(report.stats.iterations, 1);
        assert!(report.failed_to_converge());
    }

    #[test]
    fn zero_pivot_is_detected_before_iterating() {
        let a = DenseMatrix::from_rows(&[&[1.0, 0.5], &[0.5, 0.0]]).unwrap();
        let sys = LinearSystem::new(a, vec![1.0, 1.0]).unwrap();
        let mut solver = JacobiSolver::new(opts(UpdateRule::Jacobi), SerialExecutor).unwrap();
        let err = solver.run(&sys).unwrap_err();
        assert!(matches!(err, SolveError::ZeroPivot(1)));
        assert_eq!(solver.state(), SolverState::Initializing);
    }

    #[test]
    fn serial_gauss_seidel_accepts_uneven_partitions() {
        let o = opts(UpdateRule::GaussSeidel).with_partition(3);
        let report = JacobiSolver::new(o, SerialExecutor).unwrap().run(&tridiagonal()).unwrap();
        assert!(report.stats.converged);

        let o = opts(UpdateRule::Jacobi).with_partition(3);
        let err = JacobiSolver::new(o, SerialExecutor).unwrap().run(&tridiagonal()).unwrap_err();
        assert!(matches!(err, SolveError::Configuration(_)));
    }

    #[test]
    fn invalid_scalars_are_rejected_at_construction() {
        let o = opts(UpdateRule::Jacobi).with_max_iters(0);
        assert!(JacobiSolver::new(o, SerialExecutor).is_err());
        let o = opts(UpdateRule::Jacobi).with_tol(f64::NAN);
        assert!(JacobiSolver::new(o, SerialExecutor).is_err());
    }

    #[test]
    fn linear_solver_writes_solution() {
        let sys = tridiagonal();
        let mut solver = JacobiSolver::new(opts(UpdateRule::Jacobi), SerialExecutor).unwrap();
        let mut x = vec![9.0; 4];
        let stats = solver.solve(&sys.a, &sys.b, &mut x).unwrap();
        assert!(stats.converged);
        assert!((x[0] - 0.16268).abs() < 1e-4);
        assert!((x[3] - 0.88995).abs() < 1e-4);
    }

    /// Host device that fails on request.
    struct FaultyDevice {
        inner: HostDevice<f64>,
        fail_enqueue_at: Option<usize>,
        fail_alloc: bool,
        enqueues: usize,
    }

    impl FaultyDevice {
        fn new(fail_enqueue_at: Option<usize>, fail_alloc: bool) -> Self {
            Self { inner: HostDevice::new(), fail_enqueue_at, fail_alloc, enqueues: 0 }
        }
    }

    impl Device<f64> for FaultyDevice {
        type Buffer = HostBuffer;

        fn info(&self) -> &DeviceInfo {
            self.inner.info()
        }

        fn alloc(&mut self, len: usize, access: Access) -> Result<HostBuffer, SolveError> {
            if self.fail_alloc {
                return Err(SolveError::Resource(format!("out of device memory for {len} elements")));
            }
            self.inner.alloc(len, access)
        }

        fn write(&mut self, buffer: &mut HostBuffer, data: &[f64]) -> Result<(), SolveError> {
            self.inner.write(buffer, data)
        }

        fn read(&mut self, buffer: &HostBuffer, out: &mut [f64]) -> Result<(), SolveError> {
            self.inner.read(buffer, out)
        }

        fn enqueue(
            &mut self,
            kernel: Kernel,
            args: &[KernelArg<'_, HostBuffer>],
            range: NdRange,
        ) -> Result<(), SolveError> {
            self.enqueues += 1;
            if self.fail_enqueue_at == Some(self.enqueues) {
                return Err(SolveError::device("enqueueing kernel", format!("{kernel}: device lost")));
            }
            self.inner.enqueue(kernel, args, range)
        }

        fn finish(&mut self) -> Result<(), SolveError> {
            self.inner.finish()
        }

        fn release(&mut self, buffer: HostBuffer) -> Result<(), SolveError> {
            self.inner.release(buffer)
        }
    }

    #[test]
    fn device_failure_aborts_without_retry_and_frees_buffers() {
        let exec = OffloadExecutor::new(FaultyDevice::new(Some(3), false));
        let mut solver = JacobiSolver::new(opts(UpdateRule::Jacobi), exec).unwrap();
        let err = solver.run(&tridiagonal()).unwrap_err();
        assert!(matches!(err, SolveError::DeviceExecution { .. }));
        assert_eq!(solver.state(), SolverState::Iterating);
        let dev = solver.executor().device();
        assert_eq!(dev.enqueues, 3);
        assert_eq!(dev.inner.live_buffers(), 0);
    }

    #[test]
    fn allocation_failure_is_raised_before_iterating() {
        let exec = OffloadExecutor::new(FaultyDevice::new(None, true));
        let mut solver = JacobiSolver::new(opts(UpdateRule::Jacobi), exec).unwrap();
        let err = solver.run(&tridiagonal()).unwrap_err();
        assert!(matches!(err, SolveError::Resource(_)));
        assert_eq!(solver.state(), SolverState::Initializing);
        assert_eq!(solver.executor().device().enqueues, 0);
    }

    #[test]
    fn repeated_offload_solves_hold_no_device_memory() {
        let exec = OffloadExecutor::new(HostDevice::<f64>::new());
        let mut solver = JacobiSolver::new(opts(UpdateRule::Jacobi), exec).unwrap();
        for _ in 0..5 {
            assert!(solver.run(&tridiagonal()).unwrap().stats.converged);
            assert_eq!(solver.executor().device().live_buffers(), 0);
            assert_eq!(solver.executor().device().held_elements(), 0);
        }
    }
}
