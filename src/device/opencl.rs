//! OpenCL device backed by `opencl3`.
//!
//! The solver program (`kernels/jacobi.cl`) is embedded at compile time and built once per device
//! with the scalar's `TYPE` definition. Every OpenCL call is checked and mapped to
//! [`SolveError::DeviceExecution`]; there is no retry.
//!
//! Only available with the `opencl` feature:
//! ```bash
//! cargo build --features opencl
//! ```

use super::{Access, Device, DeviceInfo, DeviceKind, DeviceScalar, Kernel, KernelArg, NdRange};
use crate::error::SolveError;
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{
    CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_GPU, Device as ClDevice,
    get_all_devices,
};
use opencl3::kernel::{ExecuteKernel, Kernel as ClKernel};
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY};
use opencl3::program::Program;
use opencl3::types::{CL_BLOCKING, cl_device_type};
use std::marker::PhantomData;
use std::ptr;
use tracing::debug;

const SOLVER_SOURCE: &str = include_str!("../../kernels/jacobi.cl");

fn kind_of(dev_type: cl_device_type) -> DeviceKind {
    if dev_type & CL_DEVICE_TYPE_GPU != 0 {
        DeviceKind::Gpu
    } else if dev_type & CL_DEVICE_TYPE_ACCELERATOR != 0 {
        DeviceKind::Accelerator
    } else {
        DeviceKind::Cpu
    }
}

fn describe(dev: &ClDevice) -> DeviceInfo {
    DeviceInfo {
        name: dev.name().unwrap_or_default().trim().to_string(),
        vendor: dev.vendor().unwrap_or_default().trim().to_string(),
        kind: kind_of(dev.dev_type().unwrap_or(0)),
        max_work_group_size: dev.max_work_group_size().unwrap_or(1),
    }
}

/// All OpenCL devices across all platforms. Empty when no runtime is installed.
pub fn discover_devices() -> Vec<DeviceInfo> {
    get_all_devices(CL_DEVICE_TYPE_ALL)
        .unwrap_or_default()
        .into_iter()
        .map(|id| describe(&ClDevice::new(id)))
        .collect()
}

pub struct OpenClDevice<T> {
    info: DeviceInfo,
    context: Context,
    queue: CommandQueue,
    jacobi: ClKernel,
    convergence: ClKernel,
    gauss_seidel: ClKernel,
    _scalar: PhantomData<T>,
}

impl<T: DeviceScalar> OpenClDevice<T> {
    /// Open the OpenCL device at `index` and build the solver program for `T`.
    pub fn open(index: usize) -> Result<Self, SolveError> {
        let ids = get_all_devices(CL_DEVICE_TYPE_ALL).map_err(|e| SolveError::device("getting devices", format!("{e:?}")))?;
        let id = *ids
            .get(index)
            .ok_or(SolveError::InvalidDevice { index, available: ids.len() })?;
        let device = ClDevice::new(id);
        let info = describe(&device);

        let context = Context::from_device(&device)
            .map_err(|e| SolveError::device("creating context", format!("{e:?}")))?;
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, 0)
            .map_err(|e| SolveError::device("creating command queue", format!("{e:?}")))?;
        let program = Program::create_and_build_from_source(&context, SOLVER_SOURCE, T::BUILD_OPTIONS)
            .map_err(|log| SolveError::device("building program", log))?;
        let create = |kernel: Kernel| {
            ClKernel::create(&program, kernel.name())
                .map_err(|e| SolveError::device("creating kernel", format!("{kernel}: {e:?}")))
        };
        let jacobi = create(Kernel::Jacobi)?;
        let convergence = create(Kernel::Convergence)?;
        let gauss_seidel = create(Kernel::GaussSeidel)?;
        debug!(device = %info.name, options = T::BUILD_OPTIONS, "OpenCL solver program built");

        Ok(Self { info, context, queue, jacobi, convergence, gauss_seidel, _scalar: PhantomData })
    }

    fn kernel(&self, kernel: Kernel) -> &ClKernel {
        match kernel {
            Kernel::Jacobi => &self.jacobi,
            Kernel::Convergence => &self.convergence,
            Kernel::GaussSeidel => &self.gauss_seidel,
        }
    }
}

impl<T: DeviceScalar> Device<T> for OpenClDevice<T> {
    type Buffer = Buffer<T>;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc(&mut self, len: usize, access: Access) -> Result<Buffer<T>, SolveError> {
        let flags = match access {
            Access::ReadOnly => CL_MEM_READ_ONLY,
            Access::WriteOnly => CL_MEM_WRITE_ONLY,
            Access::ReadWrite => CL_MEM_READ_WRITE,
        };
        unsafe { Buffer::<T>::create(&self.context, flags, len, ptr::null_mut()) }
            .map_err(|e| SolveError::Resource(format!("creating device buffer of {len} elements: {e:?}")))
    }

    fn write(&mut self, buffer: &mut Buffer<T>, data: &[T]) -> Result<(), SolveError> {
        let event = unsafe { self.queue.enqueue_write_buffer(buffer, CL_BLOCKING, 0, data, &[]) }
            .map_err(|e| SolveError::device("writing buffer", format!("{e:?}")))?;
        event.wait().map_err(|e| SolveError::device("writing buffer", format!("{e:?}")))
    }

    fn read(&mut self, buffer: &Buffer<T>, out: &mut [T]) -> Result<(), SolveError> {
        let event = unsafe { self.queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[]) }
            .map_err(|e| SolveError::device("reading buffer", format!("{e:?}")))?;
        event.wait().map_err(|e| SolveError::device("reading buffer", format!("{e:?}")))
    }

    fn enqueue(
        &mut self,
        kernel: Kernel,
        args: &[KernelArg<'_, Buffer<T>>],
        range: NdRange,
    ) -> Result<(), SolveError> {
        let mut exec = ExecuteKernel::new(self.kernel(kernel));
        for arg in args {
            unsafe {
                match arg {
                    KernelArg::Buffer(buffer) => exec.set_arg(*buffer),
                    KernelArg::Uint(value) => exec.set_arg(value),
                    KernelArg::Local(len) => exec.set_arg_local_buffer(len * std::mem::size_of::<T>()),
                };
            }
        }
        exec.set_global_work_size(range.global).set_local_work_size(range.local);
        unsafe { exec.enqueue_nd_range(&self.queue) }
            .map_err(|e| SolveError::device("enqueueing kernel", format!("{kernel}: {e:?}")))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SolveError> {
        self.queue
            .finish()
            .map_err(|e| SolveError::device("running kernels", format!("{e:?}")))
    }

    fn release(&mut self, buffer: Buffer<T>) -> Result<(), SolveError> {
        // clReleaseMemObject runs in Buffer's Drop.
        drop(buffer);
        Ok(())
    }
}
