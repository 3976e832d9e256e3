//! Core linear-algebra traits for jacsolv.

use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display, LowerExp};
use std::iter::Sum;

/// Scalar type the solvers are generic over (`f32` or `f64`).
pub trait Real:
    Float + FromPrimitive + Default + Send + Sync + Debug + Display + LowerExp + Sum + 'static
{
    /// Lossy conversion from an `f64` constant.
    fn of(v: f64) -> Self {
        Self::from_f64(v).unwrap_or_else(Self::nan)
    }
}

impl<T> Real for T where
    T: Float + FromPrimitive + Default + Send + Sync + Debug + Display + LowerExp + Sum + 'static
{
}

/// Matrix–vector product: y ← A x.
pub trait MatVec<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V);
}

/// Inner products & norms.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
}

/// Uniform indexing into vectors and matrices.
pub trait Indexing {
    /// Number of rows (or length for a vector).
    fn nrows(&self) -> usize;
}
