//! Factory tying options, execution model and driver together.
//!
//! `SolveContext` picks an executor for the configured [`ExecutionModel`], builds a
//! [`JacobiSolver`] over it and runs the solve. The update rule and the execution model are chosen
//! independently.

use crate::config::SolverOptions;
use crate::device::{self, DeviceScalar, Selected};
use crate::error::SolveError;
use crate::matrix::{LinearSystem, MatrixGenerator};
use crate::parallel::{Executor, OffloadExecutor, SerialExecutor};
use crate::solver::JacobiSolver;
use crate::utils::report::SolveReport;
use tracing::debug;

/// Where sweeps and reductions run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionModel {
    /// Calling thread only.
    Serial,
    /// Worker pool over row blocks; `None` uses one thread per logical CPU.
    HostParallel { threads: Option<usize> },
    /// Device queue at index `device` of [`device::enumerate`].
    Offload { device: usize },
}

impl Default for ExecutionModel {
    fn default() -> Self {
        ExecutionModel::Offload { device: 0 }
    }
}

pub struct SolveContext<T> {
    pub model: ExecutionModel,
    pub opts: SolverOptions<T>,
}

impl<T: DeviceScalar> SolveContext<T> {
    pub fn new(model: ExecutionModel, opts: SolverOptions<T>) -> Self {
        Self { model, opts }
    }

    /// Configuration checks that can run before any system exists.
    ///
    /// Jacobi needs `n` to be a multiple of the partition size on every model. Gauss-Seidel
    /// sweeps are sequential with a fused reduction and accept a ragged last partition.
    pub fn validate(&self) -> Result<(), SolveError> {
        self.opts.validate()
    }

    /// Validate, generate an `opts.n` system, and solve it.
    pub fn generate_and_solve<G: MatrixGenerator<T>>(&self, generator: &mut G) -> Result<SolveReport<T>, SolveError> {
        self.validate()?;
        let system = generator.generate(self.opts.n)?;
        debug!(n = system.order(), "system generated");
        self.solve(&system)
    }

    pub fn solve(&self, system: &LinearSystem<T>) -> Result<SolveReport<T>, SolveError> {
        match self.model {
            ExecutionModel::Serial => self.run(SerialExecutor, system),
            ExecutionModel::HostParallel { threads } => self.run_host_parallel(threads, system),
            ExecutionModel::Offload { device } => match device::select::<T>(device)? {
                Selected::Host(dev) => self.run(OffloadExecutor::new(dev), system),
                #[cfg(feature = "opencl")]
                Selected::OpenCl(dev) => self.run(OffloadExecutor::new(dev), system),
            },
        }
    }

    #[cfg(feature = "rayon")]
    fn run_host_parallel(&self, threads: Option<usize>, system: &LinearSystem<T>) -> Result<SolveReport<T>, SolveError> {
        self.run(crate::parallel::RayonExecutor::new(threads)?, system)
    }

    #[cfg(not(feature = "rayon"))]
    fn run_host_parallel(&self, _threads: Option<usize>, _system: &LinearSystem<T>) -> Result<SolveReport<T>, SolveError> {
        Err(SolveError::config("host-parallel execution requires the `rayon` feature"))
    }

    fn run<E: Executor<T>>(&self, executor: E, system: &LinearSystem<T>) -> Result<SolveReport<T>, SolveError> {
        JacobiSolver::new(self.opts.clone(), executor)?.run(system)
    }
}
