//! Trait implementations for `Vec<T>` and `faer::Mat<T>`.
//!
//! Inner products here accumulate in index order. Verification and convergence numbers built on
//! them must be reproducible run to run, so no parallel reduction is used.

use crate::core::traits::{Indexing, InnerProduct, MatVec, Real};
use faer::Mat;

/// Implements matrix-vector multiplication for `faer::Mat`.
impl<T: Real> MatVec<Vec<T>> for Mat<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.nrows(), y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols(), x.len(), "Input vector x has incorrect length");
        for i in 0..self.nrows() {
            y[i] = T::zero();
            for j in 0..self.ncols() {
                y[i] = y[i] + self[(i, j)] * x[j];
            }
        }
    }
}

impl<T: Real> InnerProduct<Vec<T>> for () {
    type Scalar = T;
    /// Computes the dot product of two vectors: `x^T y`.
    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        x.iter()
            .zip(y.iter())
            .map(|(xi, yi)| *xi * *yi)
            .fold(T::zero(), |acc, v| acc + v)
    }
    /// Computes the Euclidean norm of a vector: `||x||_2`.
    fn norm(&self, x: &Vec<T>) -> T {
        x.iter()
            .map(|xi| *xi * *xi)
            .fold(T::zero(), |acc, v| acc + v)
            .sqrt()
    }
}

impl<T> Indexing for Vec<T> {
    fn nrows(&self) -> usize {
        self.len()
    }
}

impl<T> Indexing for Mat<T> {
    fn nrows(&self) -> usize {
        self.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_and_norm_accumulate_in_order() {
        let x = vec![3.0f64, 4.0];
        let y = vec![1.0f64, -2.0];
        assert_eq!(().dot(&x, &y), -5.0);
        assert_eq!(().norm(&x), 5.0);
    }

    #[test]
    fn faer_matvec_and_rows() {
        let a = Mat::from_fn(2, 3, |i, j| (i + j) as f64);
        let x = vec![1.0, 1.0, 1.0];
        let mut y = vec![0.0; 2];
        a.matvec(&x, &mut y);
        assert_eq!(y, vec![3.0, 6.0]);
        assert_eq!(Indexing::nrows(&a), 2);
        assert_eq!(Indexing::nrows(&x), 3);
    }
}
