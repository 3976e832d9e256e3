//! Core traits and their implementations for the standard vector and matrix types.

pub mod traits;
pub mod wrappers;

pub use traits::{Indexing, InnerProduct, MatVec, Real};
