//! Convergence reduction: per-partition partial sums of squared deltas.

use crate::core::traits::Real;
use crate::error::SolveError;

/// Number of partials produced for `n` rows split into partitions of `partition` rows.
pub fn partition_count(n: usize, partition: usize) -> usize {
    n.div_ceil(partition)
}

/// Reject partition sizes that do not evenly divide the problem.
pub fn check_partition(n: usize, partition: usize) -> Result<(), SolveError> {
    if partition == 0 {
        return Err(SolveError::config("partition size must be positive"));
    }
    if n % partition != 0 {
        return Err(SolveError::config(format!(
            "problem size {n} must be divisible by work-group size of {partition}"
        )));
    }
    Ok(())
}

/// Σ (new[k] - old[k])² over one partition, in index order.
#[inline]
pub fn squared_delta<T: Real>(old: &[T], new: &[T]) -> T {
    old.iter().zip(new).fold(T::zero(), |acc, (&o, &n)| {
        let d = n - o;
        acc + d * d
    })
}

/// Fill `out[g]` with the squared-delta sum of partition `g`.
pub fn partial_residuals<T: Real>(old: &[T], new: &[T], partition: usize, out: &mut [T]) {
    debug_assert_eq!(out.len(), partition_count(old.len(), partition));
    for ((o, n), slot) in old.chunks(partition).zip(new.chunks(partition)).zip(out.iter_mut()) {
        *slot = squared_delta(o, n);
    }
}

/// Global L2 norm from partials: ordered sum, then square root.
pub fn aggregate<T: Real>(partials: &[T]) -> T {
    partials.iter().fold(T::zero(), |acc, &p| acc + p).sqrt()
}
