//! Host emulation of a compute device.
//!
//! Buffers live in an arena owned by the device; a [`HostBuffer`] is only an index into it.
//! Released slots are emptied and handed out again by later allocations. Kernels
//! run synchronously inside `enqueue`, one task per work-group, following the same argument
//! layout and work-group semantics as `kernels/jacobi.cl`.

use super::{Access, Device, DeviceInfo, DeviceKind, Kernel, KernelArg, NdRange};
use crate::core::traits::Real;
use crate::error::{SolveError, try_zeroed};
use crate::kernel::update::{gauss_seidel_rows, jacobi_row};
use std::marker::PhantomData;
use tracing::trace;

const HOST_MAX_WORK_GROUP: usize = 1024;

pub(crate) fn host_info() -> DeviceInfo {
    #[cfg(feature = "rayon")]
    let name = format!("Host device emulator ({} threads)", rayon::current_num_threads());
    #[cfg(not(feature = "rayon"))]
    let name = "Host device emulator (1 thread)".to_string();
    DeviceInfo {
        name,
        vendor: "jacsolv".to_string(),
        kind: DeviceKind::Host,
        max_work_group_size: HOST_MAX_WORK_GROUP,
    }
}

/// Handle to an arena buffer.
#[derive(Debug)]
pub struct HostBuffer {
    id: usize,
    len: usize,
}

pub struct HostDevice<T> {
    info: DeviceInfo,
    arena: Vec<Vec<T>>,
    access: Vec<Access>,
    free: Vec<usize>,
    enqueued: usize,
    _scalar: PhantomData<T>,
}

impl<T: Real> HostDevice<T> {
    pub fn new() -> Self {
        Self {
            info: host_info(),
            arena: Vec::new(),
            access: Vec::new(),
            free: Vec::new(),
            enqueued: 0,
            _scalar: PhantomData,
        }
    }

    /// Number of kernels enqueued since the last `finish`.
    pub fn pending(&self) -> usize {
        self.enqueued
    }

    /// Buffers allocated and not yet released.
    pub fn live_buffers(&self) -> usize {
        self.arena.len() - self.free.len()
    }

    /// Elements held across all live buffers.
    pub fn held_elements(&self) -> usize {
        self.arena.iter().map(Vec::len).sum()
    }
}

impl<T: Real> Default for HostDevice<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn bad_args(kernel: Kernel, what: &str) -> SolveError {
    SolveError::device("setting kernel arguments", format!("{kernel}: {what}"))
}

fn buffer_arg<'b>(
    args: &[KernelArg<'b, HostBuffer>],
    k: usize,
    kernel: Kernel,
) -> Result<&'b HostBuffer, SolveError> {
    match args.get(k) {
        Some(KernelArg::Buffer(b)) => Ok(*b),
        _ => Err(bad_args(kernel, &format!("argument {k} must be a buffer"))),
    }
}

fn uint_arg(args: &[KernelArg<'_, HostBuffer>], k: usize, kernel: Kernel) -> Result<usize, SolveError> {
    match args.get(k) {
        Some(KernelArg::Uint(v)) => Ok(*v as usize),
        _ => Err(bad_args(kernel, &format!("argument {k} must be an unsigned integer"))),
    }
}

fn local_arg(args: &[KernelArg<'_, HostBuffer>], k: usize, kernel: Kernel) -> Result<usize, SolveError> {
    match args.get(k) {
        Some(KernelArg::Local(len)) => Ok(*len),
        _ => Err(bad_args(kernel, &format!("argument {k} must be local memory"))),
    }
}

fn require_len(buf: &HostBuffer, len: usize, kernel: Kernel) -> Result<(), SolveError> {
    if buf.len < len {
        return Err(bad_args(kernel, &format!("buffer {} holds {} elements, needs {len}", buf.id, buf.len)));
    }
    Ok(())
}

fn require_distinct(ids: &[usize], kernel: Kernel) -> Result<(), SolveError> {
    for (k, a) in ids.iter().enumerate() {
        if ids[k + 1..].contains(a) {
            return Err(bad_args(kernel, "written buffer aliases another argument"));
        }
    }
    Ok(())
}

/// In-place tree reduction over `scratch`, valid for any group size.
pub(crate) fn group_reduce<T: Real>(scratch: &mut [T]) -> T {
    let mut live = scratch.len();
    while live > 1 {
        let half = live.div_ceil(2);
        for lid in 0..live - half {
            scratch[lid] = scratch[lid] + scratch[lid + half];
        }
        live = half;
    }
    scratch.first().copied().unwrap_or_else(T::zero)
}

impl<T: Real> HostDevice<T> {
    fn run_jacobi(&mut self, args: &[KernelArg<'_, HostBuffer>], range: NdRange) -> Result<(), SolveError> {
        let kernel = Kernel::Jacobi;
        let n = uint_arg(args, 0, kernel)?;
        let (a, b, xold, xnew) = (
            buffer_arg(args, 1, kernel)?,
            buffer_arg(args, 2, kernel)?,
            buffer_arg(args, 3, kernel)?,
            buffer_arg(args, 4, kernel)?,
        );
        if range.global > n {
            return Err(bad_args(kernel, "global size exceeds the number of rows"));
        }
        require_len(a, n * n, kernel)?;
        require_len(b, n, kernel)?;
        require_len(xold, n, kernel)?;
        require_len(xnew, n, kernel)?;
        require_distinct(&[xnew.id, a.id, b.id, xold.id], kernel)?;

        let mut dst = std::mem::take(&mut self.arena[xnew.id]);
        {
            let (a, b, src) = (&self.arena[a.id], &self.arena[b.id], &self.arena[xold.id]);
            let group = |(g, chunk): (usize, &mut [T])| {
                for (l, out) in chunk.iter_mut().enumerate() {
                    let i = g * range.local + l;
                    *out = jacobi_row(&a[i * n..(i + 1) * n], i, b[i], &src[..n]);
                }
            };
            #[cfg(feature = "rayon")]
            {
                use rayon::prelude::*;
                dst[..range.global].par_chunks_mut(range.local).enumerate().for_each(group);
            }
            #[cfg(not(feature = "rayon"))]
            {
                dst[..range.global].chunks_mut(range.local).enumerate().for_each(group);
            }
        }
        self.arena[xnew.id] = dst;
        Ok(())
    }

    fn run_convergence(&mut self, args: &[KernelArg<'_, HostBuffer>], range: NdRange) -> Result<(), SolveError> {
        let kernel = Kernel::Convergence;
        let (x1, x2) = (buffer_arg(args, 0, kernel)?, buffer_arg(args, 1, kernel)?);
        let scratch_len = local_arg(args, 2, kernel)?;
        let conv = buffer_arg(args, 3, kernel)?;
        if scratch_len < range.local {
            return Err(bad_args(kernel, "local scratch smaller than the work-group"));
        }
        require_len(x1, range.global, kernel)?;
        require_len(x2, range.global, kernel)?;
        require_len(conv, range.groups(), kernel)?;
        require_distinct(&[conv.id, x1.id, x2.id], kernel)?;

        let mut out = std::mem::take(&mut self.arena[conv.id]);
        {
            let (old, new) = (&self.arena[x1.id], &self.arena[x2.id]);
            let group = |(g, slot): (usize, &mut T)| {
                let base = g * range.local;
                let mut scratch: Vec<T> = (base..base + range.local)
                    .map(|k| {
                        let d = new[k] - old[k];
                        d * d
                    })
                    .collect();
                *slot = group_reduce(&mut scratch);
            };
            #[cfg(feature = "rayon")]
            {
                use rayon::prelude::*;
                out[..range.groups()].par_iter_mut().enumerate().for_each(group);
            }
            #[cfg(not(feature = "rayon"))]
            {
                out[..range.groups()].iter_mut().enumerate().for_each(group);
            }
        }
        self.arena[conv.id] = out;
        Ok(())
    }

    fn run_gauss_seidel(&mut self, args: &[KernelArg<'_, HostBuffer>]) -> Result<(), SolveError> {
        let kernel = Kernel::GaussSeidel;
        let n = uint_arg(args, 0, kernel)?;
        let group = uint_arg(args, 1, kernel)?;
        let (a, b, xold, xnew, conv) = (
            buffer_arg(args, 2, kernel)?,
            buffer_arg(args, 3, kernel)?,
            buffer_arg(args, 4, kernel)?,
            buffer_arg(args, 5, kernel)?,
            buffer_arg(args, 6, kernel)?,
        );
        if group == 0 {
            return Err(bad_args(kernel, "group size must be positive"));
        }
        require_len(a, n * n, kernel)?;
        require_len(b, n, kernel)?;
        require_len(xold, n, kernel)?;
        require_len(xnew, n, kernel)?;
        require_len(conv, n.div_ceil(group), kernel)?;
        require_distinct(&[xold.id, xnew.id, conv.id, a.id, b.id], kernel)?;

        let mut src = std::mem::take(&mut self.arena[xold.id]);
        let mut dst = std::mem::take(&mut self.arena[xnew.id]);
        let mut partials = std::mem::take(&mut self.arena[conv.id]);
        gauss_seidel_rows(
            &self.arena[a.id],
            n,
            &self.arena[b.id],
            &mut src[..n],
            &mut dst[..n],
            group,
            &mut partials[..n.div_ceil(group)],
        );
        self.arena[xold.id] = src;
        self.arena[xnew.id] = dst;
        self.arena[conv.id] = partials;
        Ok(())
    }
}

impl<T: Real> Device<T> for HostDevice<T> {
    type Buffer = HostBuffer;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc(&mut self, len: usize, access: Access) -> Result<HostBuffer, SolveError> {
        let storage = try_zeroed(len, "device buffer")?;
        let id = match self.free.pop() {
            Some(id) => {
                self.arena[id] = storage;
                self.access[id] = access;
                id
            }
            None => {
                self.arena.push(storage);
                self.access.push(access);
                self.arena.len() - 1
            }
        };
        trace!(id, len, ?access, "host device buffer allocated");
        Ok(HostBuffer { id, len })
    }

    fn write(&mut self, buffer: &mut HostBuffer, data: &[T]) -> Result<(), SolveError> {
        if data.len() > buffer.len {
            return Err(SolveError::device(
                "writing buffer",
                format!("{} elements into a buffer of {}", data.len(), buffer.len),
            ));
        }
        self.arena[buffer.id][..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buffer: &HostBuffer, out: &mut [T]) -> Result<(), SolveError> {
        if out.len() > buffer.len {
            return Err(SolveError::device(
                "reading buffer",
                format!("{} elements from a buffer of {}", out.len(), buffer.len),
            ));
        }
        if self.access[buffer.id] == Access::WriteOnly {
            trace!(id = buffer.id, "reading back a kernel write-only buffer");
        }
        out.copy_from_slice(&self.arena[buffer.id][..out.len()]);
        Ok(())
    }

    fn enqueue(
        &mut self,
        kernel: Kernel,
        args: &[KernelArg<'_, HostBuffer>],
        range: NdRange,
    ) -> Result<(), SolveError> {
        if range.local == 0 || range.global % range.local != 0 {
            return Err(SolveError::device(
                "enqueueing kernel",
                format!("{kernel}: global size {} is not a multiple of work-group size {}", range.global, range.local),
            ));
        }
        if range.local > self.info.max_work_group_size {
            return Err(SolveError::device(
                "enqueueing kernel",
                format!("{kernel}: work-group size {} exceeds device limit {}", range.local, self.info.max_work_group_size),
            ));
        }
        match kernel {
            Kernel::Jacobi => self.run_jacobi(args, range)?,
            Kernel::Convergence => self.run_convergence(args, range)?,
            Kernel::GaussSeidel => self.run_gauss_seidel(args)?,
        }
        self.enqueued += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SolveError> {
        trace!(kernels = self.enqueued, "host device queue drained");
        self.enqueued = 0;
        Ok(())
    }

    fn release(&mut self, buffer: HostBuffer) -> Result<(), SolveError> {
        if buffer.id >= self.arena.len() || self.free.contains(&buffer.id) {
            return Err(SolveError::device("releasing buffer", format!("unknown buffer {}", buffer.id)));
        }
        self.arena[buffer.id] = Vec::new();
        self.free.push(buffer.id);
        trace!(id = buffer.id, "host device buffer released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_reduction_handles_odd_groups() {
        for len in 1..20usize {
            let mut scratch: Vec<f64> = (1..=len).map(|v| v as f64).collect();
            let expected = (len * (len + 1) / 2) as f64;
            assert_eq!(group_reduce(&mut scratch), expected);
        }
    }

    #[test]
    fn buffers_round_trip_through_the_arena() {
        let mut dev = HostDevice::<f64>::new();
        let mut buf = dev.alloc(4, Access::ReadWrite).unwrap();
        dev.write(&mut buf, &[1.0, 2.0, 3.0]).unwrap();
        let mut out = vec![0.0; 4];
        dev.read(&buf, &mut out).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 0.0]);
        assert!(dev.write(&mut buf, &[0.0; 5]).is_err());
    }

    #[test]
    fn released_slots_are_reused() {
        let mut dev = HostDevice::<f64>::new();
        let a = dev.alloc(8, Access::ReadOnly).unwrap();
        let b = dev.alloc(4, Access::ReadWrite).unwrap();
        assert_eq!((dev.live_buffers(), dev.held_elements()), (2, 12));
        dev.release(a).unwrap();
        assert_eq!((dev.live_buffers(), dev.held_elements()), (1, 4));
        let c = dev.alloc(2, Access::ReadWrite).unwrap();
        assert_eq!(c.id, 0);
        dev.release(b).unwrap();
        dev.release(c).unwrap();
        assert_eq!((dev.live_buffers(), dev.held_elements()), (0, 0));
    }

    #[test]
    fn convergence_kernel_produces_one_partial_per_group() {
        let mut dev = HostDevice::<f64>::new();
        let mut x1 = dev.alloc(6, Access::ReadWrite).unwrap();
        let mut x2 = dev.alloc(6, Access::ReadWrite).unwrap();
        let conv = dev.alloc(2, Access::WriteOnly).unwrap();
        dev.write(&mut x1, &[0.0; 6]).unwrap();
        dev.write(&mut x2, &[1.0, 2.0, 3.0, 1.0, 1.0, 1.0]).unwrap();
        dev.enqueue(
            Kernel::Convergence,
            &[KernelArg::Buffer(&x1), KernelArg::Buffer(&x2), KernelArg::Local(3), KernelArg::Buffer(&conv)],
            NdRange::new(6, 3),
        )
        .unwrap();
        dev.finish().unwrap();
        let mut partials = vec![0.0; 2];
        dev.read(&conv, &mut partials).unwrap();
        assert_eq!(partials, vec![14.0, 3.0]);
    }

    #[test]
    fn rejects_ragged_range_and_wrong_arguments() {
        let mut dev = HostDevice::<f64>::new();
        let x = dev.alloc(10, Access::ReadWrite).unwrap();
        let err = dev
            .enqueue(Kernel::Jacobi, &[KernelArg::Uint(10), KernelArg::Buffer(&x)], NdRange::new(10, 3))
            .unwrap_err();
        assert!(matches!(err, SolveError::DeviceExecution { .. }));
        let err = dev
            .enqueue(Kernel::Jacobi, &[KernelArg::Uint(10), KernelArg::Buffer(&x)], NdRange::new(10, 5))
            .unwrap_err();
        assert!(matches!(err, SolveError::DeviceExecution { .. }));
    }
}
