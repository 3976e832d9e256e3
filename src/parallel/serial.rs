// Single-threaded host executor and the host workspace shared with the rayon executor.

use super::{DoubleBuffer, Executor, Workspace};
use crate::core::traits::Real;
use crate::error::{SolveError, try_copied, try_zeroed};
use crate::kernel::update::{gauss_seidel_sweep, jacobi_sweep};
use crate::kernel::{UpdateRule, partial_residuals, partition_count};
use crate::matrix::DenseMatrix;

/// Host-resident iterates and partial residuals.
pub struct HostWorkspace<T> {
    pub(crate) iterates: DoubleBuffer<Vec<T>>,
    pub(crate) partials: Vec<T>,
    pub(crate) partition: usize,
}

impl<T: Real> HostWorkspace<T> {
    pub(crate) fn allocate(n: usize, partition: usize) -> Result<Self, SolveError> {
        Ok(Self {
            iterates: DoubleBuffer::new(try_zeroed(n, "iterate x1")?, try_zeroed(n, "iterate x2")?),
            partials: try_zeroed(partition_count(n, partition), "partial residuals")?,
            partition,
        })
    }

    /// Gauss-Seidel sweep with fused reduction; identical for every host executor.
    pub(crate) fn gauss_seidel(&mut self, a: &DenseMatrix<T>, b: &[T]) {
        let (src, dst) = self.iterates.split_mut();
        gauss_seidel_sweep(a, b, src, dst, self.partition, &mut self.partials);
    }
}

impl<T: Real> Workspace<T> for HostWorkspace<T> {
    fn swap_roles(&mut self) {
        self.iterates.swap();
    }

    fn partials(&self) -> &[T] {
        &self.partials
    }
}

/// Runs every sweep and reduction on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialExecutor;

impl<T: Real> Executor<T> for SerialExecutor {
    type Workspace = HostWorkspace<T>;

    fn name(&self) -> String {
        "host (serial)".to_string()
    }

    fn allocate(
        &mut self,
        a: &DenseMatrix<T>,
        _b: &[T],
        partition: usize,
    ) -> Result<HostWorkspace<T>, SolveError> {
        HostWorkspace::allocate(a.nrows(), partition)
    }

    fn update(
        &mut self,
        ws: &mut HostWorkspace<T>,
        a: &DenseMatrix<T>,
        b: &[T],
        rule: UpdateRule,
    ) -> Result<(), SolveError> {
        match rule {
            UpdateRule::Jacobi => {
                let (src, dst) = ws.iterates.split();
                jacobi_sweep(a, b, src, dst);
            }
            UpdateRule::GaussSeidel => ws.gauss_seidel(a, b),
        }
        Ok(())
    }

    fn reduce(&mut self, ws: &mut HostWorkspace<T>, rule: UpdateRule) -> Result<(), SolveError> {
        if rule == UpdateRule::Jacobi {
            partial_residuals(ws.iterates.source(), ws.iterates.destination(), ws.partition, &mut ws.partials);
        }
        Ok(())
    }

    fn read_solution(&mut self, ws: &mut HostWorkspace<T>) -> Result<Vec<T>, SolveError> {
        try_copied(ws.iterates.destination(), "solution")
    }
}
