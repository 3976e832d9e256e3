//! Row-major dense matrix.
//!
//! Rows are contiguous so a sweep over row `i` reads one slice, and the whole matrix can be
//! uploaded to a device buffer as-is. Conversions to and from `faer::Mat` are provided for callers
//! that already hold faer matrices.

use crate::core::traits::{Indexing, MatVec, Real};
use crate::error::{SolveError, try_zeroed};
use faer::Mat;
use std::ops::{Index, IndexMut};

#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix<T> {
    nrows: usize,
    ncols: usize,
    data: Vec<T>,
}

impl<T: Real> DenseMatrix<T> {
    /// Zero matrix; allocation failure is reported as a resource error.
    pub fn zeros(nrows: usize, ncols: usize) -> Result<Self, SolveError> {
        let len = nrows.checked_mul(ncols).ok_or_else(|| {
            SolveError::Resource(format!("matrix {nrows}x{ncols} overflows the address space"))
        })?;
        Ok(Self { nrows, ncols, data: try_zeroed(len, "matrix A")? })
    }

    /// Construct from raw row-major storage.
    pub fn from_row_major(nrows: usize, ncols: usize, data: Vec<T>) -> Result<Self, SolveError> {
        if data.len() != nrows * ncols {
            return Err(SolveError::DimensionMismatch { expected: nrows * ncols, found: data.len() });
        }
        Ok(Self { nrows, ncols, data })
    }

    /// Construct from a slice of equally sized rows.
    pub fn from_rows(rows: &[&[T]]) -> Result<Self, SolveError> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(nrows * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(SolveError::DimensionMismatch { expected: ncols, found: row.len() });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { nrows, ncols, data })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// First row whose diagonal entry is zero, if any.
    pub fn zero_diagonal(&self) -> Option<usize> {
        (0..self.nrows.min(self.ncols)).find(|&i| self[(i, i)] == T::zero())
    }

    /// `|A[i][i]| > Σ_{j≠i} |A[i][j]|` for every row.
    pub fn is_diagonally_dominant(&self) -> bool {
        (0..self.nrows).all(|i| {
            let off: T = self
                .row(i)
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, a)| a.abs())
                .sum();
            self[(i, i)].abs() > off
        })
    }

    pub fn to_faer(&self) -> Mat<T> {
        Mat::from_fn(self.nrows, self.ncols, |i, j| self[(i, j)])
    }
}

impl<T: Real> From<&Mat<T>> for DenseMatrix<T> {
    fn from(m: &Mat<T>) -> Self {
        let (nrows, ncols) = (m.nrows(), m.ncols());
        let mut data = Vec::with_capacity(nrows * ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                data.push(m[(i, j)]);
            }
        }
        Self { nrows, ncols, data }
    }
}

impl<T> Index<(usize, usize)> for DenseMatrix<T> {
    type Output = T;
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[i * self.ncols + j]
    }
}

impl<T> IndexMut<(usize, usize)> for DenseMatrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.data[i * self.ncols + j]
    }
}

impl<T> Indexing for DenseMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
}

impl<T: Real> MatVec<Vec<T>> for DenseMatrix<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.nrows, y.len(), "Output vector y has incorrect length");
        assert_eq!(self.ncols, x.len(), "Input vector x has incorrect length");
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self
                .row(i)
                .iter()
                .zip(x.iter())
                .fold(T::zero(), |acc, (&a, &xj)| acc + a * xj);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout() {
        let a = DenseMatrix::<f64>::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.row(1), &[3.0, 4.0]);
        assert_eq!(a[(0, 1)], 2.0);
    }

    #[test]
    fn faer_round_trip_preserves_entries() {
        let m = Mat::from_fn(3, 2, |i, j| (i * 10 + j) as f64);
        let a = DenseMatrix::from(&m);
        assert_eq!(a.nrows(), 3);
        assert_eq!(a.ncols(), 2);
        assert_eq!(a[(2, 1)], 21.0);
        let back = a.to_faer();
        assert_eq!(back[(1, 0)], 10.0);
    }

    #[test]
    fn detects_zero_diagonal_and_dominance() {
        let a = DenseMatrix::<f64>::from_rows(&[&[4.0, 1.0], &[1.0, 0.0]]).unwrap();
        assert_eq!(a.zero_diagonal(), Some(1));
        assert!(!a.is_diagonally_dominant());
        let b = DenseMatrix::<f64>::from_rows(&[&[4.0, 1.0], &[1.0, 3.0]]).unwrap();
        assert_eq!(b.zero_diagonal(), None);
        assert!(b.is_diagonally_dominant());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = DenseMatrix::<f64>::from_rows(&[&[1.0, 2.0], &[3.0]]).unwrap_err();
        assert!(matches!(err, SolveError::DimensionMismatch { expected: 2, found: 1 }));
    }
}
