//! Post-solve check of `A·x = b`.

use crate::config::Diagnostics;
use crate::core::traits::{Indexing, InnerProduct, MatVec, Real};
use crate::error::{SolveError, try_copied, try_zeroed};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verification<T> {
    /// `‖A·x − b‖₂`.
    pub error: T,
    /// `Σ x[i]`.
    pub checksum: T,
}

/// Recompute `A·x` on the host and compare with `b`.
///
/// Pure: repeated calls on the same inputs give bit-identical results.
pub fn verify<T: Real, M: MatVec<Vec<T>> + Indexing>(
    a: &M,
    b: &[T],
    x: &[T],
    diagnostics: Diagnostics,
) -> Result<Verification<T>, SolveError> {
    let n = a.nrows();
    for len in [b.len(), x.len()] {
        if len != n {
            return Err(SolveError::DimensionMismatch { expected: n, found: len });
        }
    }
    let x = try_copied(x, "verification iterate")?;
    let mut r = try_zeroed(n, "verification residual")?;
    a.matvec(&x, &mut r);
    let trace = diagnostics.contains(Diagnostics::RESIDUAL_TRACE);
    for (i, (ri, &bi)) in r.iter_mut().zip(b).enumerate() {
        let computed = *ri;
        let diff = computed - bi;
        *ri = diff;
        if trace {
            info!(i, %diff, %computed, input = %bi, "verification row");
        }
    }
    Ok(Verification {
        error: ().norm(&r),
        checksum: x.iter().fold(T::zero(), |acc, &v| acc + v),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;
    use faer::Mat;

    #[test]
    fn exact_solution_has_zero_error() {
        let a = DenseMatrix::<f64>::from_rows(&[&[2.0, 0.0], &[0.0, 4.0]]).unwrap();
        let v = verify(&a, &[2.0, 2.0], &[1.0, 0.5], Diagnostics::empty()).unwrap();
        assert_eq!(v.error, 0.0);
        assert_eq!(v.checksum, 1.5);
    }

    #[test]
    fn repeated_verification_is_bit_identical() {
        let a = DenseMatrix::<f64>::from_rows(&[&[3.0, 0.1, 0.2], &[0.3, 5.0, 0.7], &[0.1, 0.9, 4.0]])
            .unwrap();
        let b = [0.37, 0.11, 0.42];
        let x = [0.1, 0.02, 0.1];
        let first = verify(&a, &b, &x, Diagnostics::RESIDUAL_TRACE).unwrap();
        let second = verify(&a, &b, &x, Diagnostics::RESIDUAL_TRACE).unwrap();
        assert_eq!(first.error.to_bits(), second.error.to_bits());
        assert_eq!(first.checksum.to_bits(), second.checksum.to_bits());
    }

    #[test]
    fn faer_and_dense_storage_verify_identically() {
        let a = DenseMatrix::<f64>::from_rows(&[&[3.0, 0.5], &[0.25, 2.0]]).unwrap();
        let m: Mat<f64> = a.to_faer();
        let (b, x) = ([1.0, 1.0], [0.3, 0.45]);
        let dense = verify(&a, &b, &x, Diagnostics::empty()).unwrap();
        let faer = verify(&m, &b, &x, Diagnostics::empty()).unwrap();
        assert_eq!(dense, faer);
    }

    #[test]
    fn short_solution_is_a_dimension_error() {
        let a = DenseMatrix::<f64>::from_rows(&[&[1.0, 0.0], &[0.0, 1.0]]).unwrap();
        let err = verify(&a, &[1.0, 1.0], &[1.0], Diagnostics::empty()).unwrap_err();
        assert!(matches!(err, SolveError::DimensionMismatch { expected: 2, found: 1 }));
    }
}
