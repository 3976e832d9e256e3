//! Sweep kernels for the stationary iteration `x_new = (b - (L+U) x_old) / D`.
//!
//! Every executor (serial, rayon, and the host device emulator) funnels through [`jacobi_row`], so
//! the same input produces bit-identical iterates whichever executor ran the sweep.

use crate::core::traits::Real;
use crate::matrix::DenseMatrix;
use std::fmt;
use std::str::FromStr;

/// Update rule applied to each row during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRule {
    /// Every row reads the previous iterate only; rows are independent.
    Jacobi,
    /// Rows read already updated entries of the current sweep; strictly sequential.
    GaussSeidel,
}

impl UpdateRule {
    /// Name used in reports.
    pub fn label(self) -> &'static str {
        match self {
            UpdateRule::Jacobi => "jacobi solver",
            UpdateRule::GaussSeidel => "Gauss Seidel",
        }
    }
}

impl fmt::Display for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateRule::Jacobi => write!(f, "jacobi"),
            UpdateRule::GaussSeidel => write!(f, "gauss-seidel"),
        }
    }
}

impl FromStr for UpdateRule {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jacobi" | "jac" => Ok(UpdateRule::Jacobi),
            "gauss-seidel" | "gauss_seidel" | "gs" => Ok(UpdateRule::GaussSeidel),
            other => Err(format!("unknown update rule '{other}'")),
        }
    }
}

/// `(b_i - Σ_{j≠i} a_ij x_j) / a_ii` for one row.
#[inline]
pub fn jacobi_row<T: Real>(row: &[T], i: usize, b_i: T, x: &[T]) -> T {
    let mut acc = T::zero();
    for (j, (&aij, &xj)) in row.iter().zip(x).enumerate() {
        if j != i {
            acc = acc + aij * xj;
        }
    }
    (b_i - acc) / row[i]
}

/// Jacobi sweep over the row block starting at `first_row`; `dst` holds the block's outputs.
pub fn jacobi_block<T: Real>(a: &DenseMatrix<T>, b: &[T], src: &[T], dst: &mut [T], first_row: usize) {
    jacobi_rows(a.as_slice(), a.ncols(), b, src, dst, first_row);
}

/// Full Jacobi sweep, rows in order.
pub fn jacobi_sweep<T: Real>(a: &DenseMatrix<T>, b: &[T], src: &[T], dst: &mut [T]) {
    jacobi_rows(a.as_slice(), a.ncols(), b, src, dst, 0);
}

/// [`jacobi_block`] over raw row-major storage with `n` columns.
pub fn jacobi_rows<T: Real>(a: &[T], n: usize, b: &[T], src: &[T], dst: &mut [T], first_row: usize) {
    for (k, out) in dst.iter_mut().enumerate() {
        let i = first_row + k;
        *out = jacobi_row(&a[i * n..(i + 1) * n], i, b[i], src);
    }
}

/// Gauss-Seidel sweep with the convergence reduction fused in.
///
/// `src` is updated in place as each row completes, `dst` receives the same values, and
/// `partials[i / partition]` accumulates the squared delta of row `i`. After the sweep `src` and
/// `dst` hold identical contents.
pub fn gauss_seidel_sweep<T: Real>(
    a: &DenseMatrix<T>,
    b: &[T],
    src: &mut [T],
    dst: &mut [T],
    partition: usize,
    partials: &mut [T],
) {
    gauss_seidel_rows(a.as_slice(), a.ncols(), b, src, dst, partition, partials);
}

/// [`gauss_seidel_sweep`] over raw row-major storage with `n` columns.
pub fn gauss_seidel_rows<T: Real>(
    a: &[T],
    n: usize,
    b: &[T],
    src: &mut [T],
    dst: &mut [T],
    partition: usize,
    partials: &mut [T],
) {
    partials.iter_mut().for_each(|p| *p = T::zero());
    for i in 0..src.len() {
        let xi = jacobi_row(&a[i * n..(i + 1) * n], i, b[i], src);
        let d = xi - src[i];
        partials[i / partition] = partials[i / partition] + d * d;
        dst[i] = xi;
        src[i] = xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiag4() -> (DenseMatrix<f64>, Vec<f64>) {
        let a = DenseMatrix::from_rows(&[
            &[4.0, 1.0, 0.0, 0.0],
            &[1.0, 4.0, 1.0, 0.0],
            &[0.0, 1.0, 4.0, 1.0],
            &[0.0, 0.0, 1.0, 4.0],
        ])
        .unwrap();
        (a, vec![1.0, 2.0, 3.0, 4.0])
    }

    #[test]
    fn first_jacobi_sweep_from_zero_is_b_over_diag() {
        let (a, b) = tridiag4();
        let src = vec![0.0; 4];
        let mut dst = vec![0.0; 4];
        jacobi_sweep(&a, &b, &src, &mut dst);
        assert_eq!(dst, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn jacobi_block_matches_full_sweep() {
        let (a, b) = tridiag4();
        let src = vec![0.1, -0.2, 0.3, 0.4];
        let mut full = vec![0.0; 4];
        jacobi_sweep(&a, &b, &src, &mut full);
        let mut tail = vec![0.0; 2];
        jacobi_block(&a, &b, &src, &mut tail, 2);
        assert_eq!(&full[2..], tail.as_slice());
    }

    #[test]
    fn gauss_seidel_uses_fresh_values() {
        let (a, b) = tridiag4();
        let mut src = vec![0.0; 4];
        let mut dst = vec![0.0; 4];
        let mut partials = vec![0.0; 2];
        gauss_seidel_sweep(&a, &b, &mut src, &mut dst, 2, &mut partials);
        // row 1 sees x0 = 0.25 from this sweep
        assert_eq!(dst[0], 0.25);
        assert_eq!(dst[1], (2.0 - 0.25) / 4.0);
        assert_eq!(src, dst);
        let expected0 = dst[0] * dst[0] + dst[1] * dst[1];
        assert_eq!(partials[0], expected0);
    }

    #[test]
    fn parses_rule_names() {
        assert_eq!("jacobi".parse::<UpdateRule>().unwrap(), UpdateRule::Jacobi);
        assert_eq!("GS".parse::<UpdateRule>().unwrap(), UpdateRule::GaussSeidel);
        assert!("sor".parse::<UpdateRule>().is_err());
    }
}
