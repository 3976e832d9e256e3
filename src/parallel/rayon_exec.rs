// rayon-based host-parallel executor

use super::serial::HostWorkspace;
use super::Executor;
use crate::core::traits::Real;
use crate::error::{SolveError, try_copied};
use crate::kernel::reduce::squared_delta;
use crate::kernel::update::jacobi_block;
use crate::kernel::UpdateRule;
use crate::matrix::DenseMatrix;
use rayon::prelude::*;
use tracing::debug;

/// Fixed-size worker pool over row blocks.
///
/// Each Jacobi sweep hands one block of `partition` rows to a worker; the reduction does the same
/// over partitions. Both calls join before returning, so no worker outlives an iteration.
/// Gauss-Seidel sweeps stay sequential on the calling thread.
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl RayonExecutor {
    /// Pool of `threads` workers; `None` uses one per logical CPU.
    pub fn new(threads: Option<usize>) -> Result<Self, SolveError> {
        let threads = threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("jacsolv-worker-{i}"))
            .build()
            .map_err(|e| SolveError::Resource(format!("building worker pool: {e}")))?;
        debug!(threads, "rayon worker pool ready");
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl<T: Real> Executor<T> for RayonExecutor {
    type Workspace = HostWorkspace<T>;

    fn name(&self) -> String {
        format!("host (rayon, {} threads)", self.threads)
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
                let partition = ws.partition;
                let (src, dst) = ws.iterates.split();
                self.pool.install(|| {
                    dst.par_chunks_mut(partition)
                        .enumerate()
                        .for_each(|(blk, rows)| jacobi_block(a, b, src, rows, blk * partition));
                });
            }
            UpdateRule::GaussSeidel => ws.gauss_seidel(a, b),
        }
        Ok(())
    }

    fn reduce(&mut self, ws: &mut HostWorkspace<T>, rule: UpdateRule) -> Result<(), SolveError> {
        if rule == UpdateRule::Jacobi {
            let partition = ws.partition;
            let (old, new) = (ws.iterates.source(), ws.iterates.destination());
            let partials = &mut ws.partials;
            self.pool.install(|| {
                partials
                    .par_iter_mut()
                    .zip(old.par_chunks(partition).zip(new.par_chunks(partition)))
                    .for_each(|(slot, (o, n))| *slot = squared_delta(o, n));
            });
        }
        Ok(())
    }

    fn read_solution(&mut self, ws: &mut HostWorkspace<T>) -> Result<Vec<T>, SolveError> {
        try_copied(ws.iterates.destination(), "solution")
    }
}
