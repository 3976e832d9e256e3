//! Executors: where sweeps and reductions run.
//!
//! An [`Executor`] owns the execution resources (nothing, a worker pool, or a device queue) and
//! produces a [`Workspace`] holding the iterate pair and the partial-residual buffer. The driver
//! only ever asks the workspace to swap roles and to expose its partials; everything else goes
//! through the executor, so the update rule and the execution model vary independently.

use crate::core::traits::Real;
use crate::error::SolveError;
use crate::kernel::UpdateRule;
use crate::matrix::DenseMatrix;

pub mod double_buffer;
pub use double_buffer::{DoubleBuffer, Slot};

pub mod serial;
pub use serial::{HostWorkspace, SerialExecutor};

#[cfg(feature = "rayon")]
pub mod rayon_exec;
#[cfg(feature = "rayon")]
pub use rayon_exec::RayonExecutor;

pub mod offload;
pub use offload::{DeviceWorkspace, OffloadExecutor};

/// Per-solve state owned by an executor.
pub trait Workspace<T> {
    /// Exchange source and destination iterates. No data moves.
    fn swap_roles(&mut self);
    /// Partial residuals of the last completed reduction, in partition order.
    fn partials(&self) -> &[T];
}

pub trait Executor<T: Real> {
    type Workspace: Workspace<T>;

    /// Human-readable name of the compute resource.
    fn name(&self) -> String;

    /// Whether `n` must be a multiple of the partition size for this rule.
    ///
    /// Gauss-Seidel sweeps run sequentially with the reduction fused in, so only Jacobi needs it.
    fn requires_even_partitions(&self, rule: UpdateRule) -> bool {
        rule == UpdateRule::Jacobi
    }

    /// Allocate zeroed iterates and make A and b available to the kernels.
    fn allocate(
        &mut self,
        a: &DenseMatrix<T>,
        b: &[T],
        partition: usize,
    ) -> Result<Self::Workspace, SolveError>;

    /// Fill the destination iterate from the source.
    fn update(
        &mut self,
        ws: &mut Self::Workspace,
        a: &DenseMatrix<T>,
        b: &[T],
        rule: UpdateRule,
    ) -> Result<(), SolveError>;

    /// Make the partial residuals of the last update available through [`Workspace::partials`].
    /// Returns only once they are readable on the host.
    fn reduce(&mut self, ws: &mut Self::Workspace, rule: UpdateRule) -> Result<(), SolveError>;

    /// Copy the latest iterate (the destination role) to the host.
    fn read_solution(&mut self, ws: &mut Self::Workspace) -> Result<Vec<T>, SolveError>;

    /// Give the workspace's buffers back. Host workspaces free themselves on drop.
    fn release(&mut self, ws: Self::Workspace) -> Result<(), SolveError> {
        drop(ws);
        Ok(())
    }
}
