//! Device-offload executor.
//!
//! A, b and both iterates live in device buffers for the whole solve. Each iteration enqueues the
//! update kernel and the convergence kernel over `n` work-items in groups of `partition`, then reads
//! back only the `n / partition` partial sums and waits for the queue to drain. The iterate itself
//! is read back once, after the loop.

use super::{DoubleBuffer, Executor, Workspace};
use crate::device::{Access, Device, Kernel, KernelArg, NdRange};
use crate::core::traits::Real;
use crate::error::{SolveError, try_zeroed};
use crate::kernel::{UpdateRule, partition_count};
use crate::matrix::DenseMatrix;
use tracing::debug;

pub struct DeviceWorkspace<T, B> {
    a: B,
    b: B,
    iterates: DoubleBuffer<B>,
    conv: B,
    partials: Vec<T>,
    n: usize,
    partition: usize,
}

impl<T: Real, B> Workspace<T> for DeviceWorkspace<T, B> {
    fn swap_roles(&mut self) {
        self.iterates.swap();
    }

    fn partials(&self) -> &[T] {
        &self.partials
    }
}

fn as_uint(v: usize, what: &str) -> Result<u32, SolveError> {
    u32::try_from(v).map_err(|_| SolveError::config(format!("{what} {v} exceeds the device index range")))
}

/// Drives a [`Device`] through the two-kernel pipeline.
pub struct OffloadExecutor<D> {
    device: D,
}

impl<D> OffloadExecutor<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}

impl<T: Real, D: Device<T>> Executor<T> for OffloadExecutor<D> {
    type Workspace = DeviceWorkspace<T, D::Buffer>;

    fn name(&self) -> String {
        self.device.info().name.clone()
    }

    fn allocate(
        &mut self,
        a: &DenseMatrix<T>,
        b: &[T],
        partition: usize,
    ) -> Result<Self::Workspace, SolveError> {
        let n = a.nrows();
        let max_group = self.device.info().max_work_group_size;
        if partition > max_group {
            return Err(SolveError::config(format!(
                "work-group size {partition} exceeds the device limit of {max_group}"
            )));
        }
        as_uint(n, "problem size")?;
        let groups = partition_count(n, partition);
        let dev = &mut self.device;

        let mut d_a = dev.alloc(n * n, Access::ReadOnly)?;
        let mut d_b = dev.alloc(n, Access::ReadOnly)?;
        let mut d_x1 = dev.alloc(n, Access::ReadWrite)?;
        let mut d_x2 = dev.alloc(n, Access::ReadWrite)?;
        let d_conv = dev.alloc(groups, Access::ReadWrite)?;

        let zeros = try_zeroed(n, "initial iterate")?;
        dev.write(&mut d_a, a.as_slice())?;
        dev.write(&mut d_b, b)?;
        dev.write(&mut d_x1, &zeros)?;
        dev.write(&mut d_x2, &zeros)?;
        debug!(n, partition, groups, "device buffers allocated and initialised");

        Ok(DeviceWorkspace {
            a: d_a,
            b: d_b,
            iterates: DoubleBuffer::new(d_x1, d_x2),
            conv: d_conv,
            partials: try_zeroed(groups, "partial residuals")?,
            n,
            partition,
        })
    }

    fn update(
        &mut self,
        ws: &mut Self::Workspace,
        _a: &DenseMatrix<T>,
        _b: &[T],
        rule: UpdateRule,
    ) -> Result<(), SolveError> {
        let n = as_uint(ws.n, "problem size")?;
        let (src, dst) = (ws.iterates.source(), ws.iterates.destination());
        match rule {
            UpdateRule::Jacobi => self.device.enqueue(
                Kernel::Jacobi,
                &[
                    KernelArg::Uint(n),
                    KernelArg::Buffer(&ws.a),
                    KernelArg::Buffer(&ws.b),
                    KernelArg::Buffer(src),
                    KernelArg::Buffer(dst),
                ],
                NdRange::new(ws.n, ws.partition),
            ),
            UpdateRule::GaussSeidel => self.device.enqueue(
                Kernel::GaussSeidel,
                &[
                    KernelArg::Uint(n),
                    KernelArg::Uint(as_uint(ws.partition, "work-group size")?),
                    KernelArg::Buffer(&ws.a),
                    KernelArg::Buffer(&ws.b),
                    KernelArg::Buffer(src),
                    KernelArg::Buffer(dst),
                    KernelArg::Buffer(&ws.conv),
                ],
                NdRange::new(1, 1),
            ),
        }
    }

    fn reduce(&mut self, ws: &mut Self::Workspace, rule: UpdateRule) -> Result<(), SolveError> {
        if rule == UpdateRule::Jacobi {
            self.device.enqueue(
                Kernel::Convergence,
                &[
                    KernelArg::Buffer(ws.iterates.source()),
                    KernelArg::Buffer(ws.iterates.destination()),
                    KernelArg::Local(ws.partition),
                    KernelArg::Buffer(&ws.conv),
                ],
                NdRange::new(ws.n, ws.partition),
            )?;
        }
        self.device.read(&ws.conv, &mut ws.partials)?;
        self.device.finish()
    }

    fn read_solution(&mut self, ws: &mut Self::Workspace) -> Result<Vec<T>, SolveError> {
        self.device.finish()?;
        let mut x = try_zeroed(ws.n, "solution")?;
        self.device.read(ws.iterates.destination(), &mut x)?;
        Ok(x)
    }

    fn release(&mut self, ws: Self::Workspace) -> Result<(), SolveError> {
        let (x1, x2) = ws.iterates.into_parts();
        for buffer in [ws.a, ws.b, x1, x2, ws.conv] {
            self.device.release(buffer)?;
        }
        debug!("device buffers released");
        Ok(())
    }
}
