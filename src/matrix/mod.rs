//! Matrix module: dense row-major storage and system generators.

pub mod dense;
pub use dense::DenseMatrix;
pub mod generator;
pub use generator::{DiagDominant, LinearSystem, MatrixGenerator, NearIdentity};
