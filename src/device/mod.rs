//! Compute device abstraction for the offload executor.
//!
//! A [`Device`] exposes the capabilities the solver needs from an accelerator queue: allocate a
//! buffer, write it, enqueue a named kernel over a 1-D range split into fixed-size groups, read a
//! buffer back, and block until the queue drains. Every call is fallible and any failure is
//! reported as [`SolveError::DeviceExecution`]; callers do not retry.
//!
//! Two implementations exist:
//! - [`HostDevice`]: always available, runs the kernels on host threads with work-group semantics.
//! - `OpenClDevice` (feature `opencl`): runs `kernels/jacobi.cl` through an OpenCL queue.

use crate::core::traits::Real;
use crate::error::SolveError;
use std::fmt;

pub mod host;
pub use host::HostDevice;

#[cfg(feature = "opencl")]
pub mod opencl;
#[cfg(feature = "opencl")]
pub use opencl::OpenClDevice;

/// Kernels of the solver program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// `(n: uint, A, b, xold, xnew)`, one work-item per row.
    Jacobi,
    /// `(xold, xnew, local scratch[group], conv)`, one partial per work-group.
    Convergence,
    /// `(n: uint, group: uint, A, b, xold, xnew, conv)`, single work-item sequential sweep.
    GaussSeidel,
}

impl Kernel {
    pub fn name(self) -> &'static str {
        match self {
            Kernel::Jacobi => "jacobi",
            Kernel::Convergence => "convergence",
            Kernel::GaussSeidel => "gauss_seidel",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kernel argument bound at enqueue time.
pub enum KernelArg<'a, B> {
    Buffer(&'a B),
    Uint(u32),
    /// Work-group local scratch of the given number of scalar elements.
    Local(usize),
}

/// Index space of one enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdRange {
    pub global: usize,
    pub local: usize,
}

impl NdRange {
    pub fn new(global: usize, local: usize) -> Self {
        Self { global, local }
    }

    pub fn groups(&self) -> usize {
        self.global / self.local
    }
}

/// Buffer access mode, mirrored onto device memory flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Host,
    Cpu,
    Gpu,
    Accelerator,
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub kind: DeviceKind,
    pub max_work_group_size: usize,
}

/// Scalar types that have a device program build.
pub trait DeviceScalar: Real {
    /// Preprocessor definitions selecting `TYPE` in the kernel source.
    const BUILD_OPTIONS: &'static str;
}

impl DeviceScalar for f32 {
    const BUILD_OPTIONS: &'static str = "-DTYPE=float";
}

impl DeviceScalar for f64 {
    const BUILD_OPTIONS: &'static str = "-DTYPE=double -DDOUBLE";
}

/// Device/queue capability set.
pub trait Device<T> {
    type Buffer;

    fn info(&self) -> &DeviceInfo;

    fn alloc(&mut self, len: usize, access: Access) -> Result<Self::Buffer, SolveError>;

    fn write(&mut self, buffer: &mut Self::Buffer, data: &[T]) -> Result<(), SolveError>;

    /// Blocking read of the first `out.len()` elements.
    fn read(&mut self, buffer: &Self::Buffer, out: &mut [T]) -> Result<(), SolveError>;

    fn enqueue(
        &mut self,
        kernel: Kernel,
        args: &[KernelArg<'_, Self::Buffer>],
        range: NdRange,
    ) -> Result<(), SolveError>;

    /// Block until all enqueued work has completed.
    fn finish(&mut self) -> Result<(), SolveError>;

    /// Free a buffer. The handle is consumed.
    fn release(&mut self, buffer: Self::Buffer) -> Result<(), SolveError>;
}

/// All devices visible to this build, in `--device` index order.
///
/// OpenCL devices (when compiled in) come first; the host emulator is always last.
pub fn enumerate() -> Vec<DeviceInfo> {
    #[allow(unused_mut)]
    let mut devices = Vec::new();
    #[cfg(feature = "opencl")]
    devices.extend(opencl::discover_devices());
    devices.push(host::host_info());
    devices
}

/// A device opened by index.
pub enum Selected<T: DeviceScalar> {
    Host(HostDevice<T>),
    #[cfg(feature = "opencl")]
    OpenCl(OpenClDevice<T>),
}

/// Open the device at `index` in [`enumerate`] order.
pub fn select<T: DeviceScalar>(index: usize) -> Result<Selected<T>, SolveError> {
    let available = enumerate().len();
    if index >= available {
        return Err(SolveError::InvalidDevice { index, available });
    }
    #[cfg(feature = "opencl")]
    if index + 1 < available {
        return Ok(Selected::OpenCl(OpenClDevice::open(index)?));
    }
    Ok(Selected::Host(HostDevice::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_device_is_always_listed_last() {
        let devices = enumerate();
        let last = devices.last().unwrap();
        assert_eq!(last.kind, DeviceKind::Host);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let available = enumerate().len();
        let err = select::<f64>(available).err().unwrap();
        assert!(matches!(err, SolveError::InvalidDevice { .. }));
    }

    #[test]
    fn kernel_names_match_program() {
        assert_eq!(Kernel::Jacobi.name(), "jacobi");
        assert_eq!(Kernel::Convergence.to_string(), "convergence");
        assert_eq!(Kernel::GaussSeidel.name(), "gauss_seidel");
    }

    #[test]
    fn gauss_seidel_kernel_indexes_with_size_t() {
        let program = include_str!("../../kernels/jacobi.cl");
        let start = program.find("kernel void gauss_seidel").unwrap();
        let body = &program[start..];
        for index in ["unsigned g", "unsigned i", "unsigned j"] {
            assert!(!body.contains(index), "{index}");
        }
        assert!(body.contains("A[i * nn + j]"));
    }
}
