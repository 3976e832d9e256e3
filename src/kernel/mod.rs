//! Host implementations of the sweep and reduction kernels.

pub mod reduce;
pub mod update;

pub use reduce::{aggregate, check_partition, partial_residuals, partition_count};
pub use update::UpdateRule;
