//! Generators for diagonally dominant test systems.
//!
//! Two constructions are provided:
//! - [`NearIdentity`]: off-diagonal entries scaled by `1/n` so every row sum stays below one and the
//!   matrix is close to the identity. Jacobi converges in a handful of sweeps.
//! - [`DiagDominant`]: off-diagonal entries in `[0, 1)` with the diagonal set just above the row
//!   sum. Convergence is markedly slower, which is where Gauss-Seidel pays off.
//!
//! Right-hand sides are drawn from `{0.01, 0.02, ..., 0.50}`, so every entry is nonzero.

use crate::core::traits::Real;
use crate::error::{SolveError, try_zeroed};
use crate::matrix::DenseMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A square system `A x = b`.
#[derive(Clone, Debug)]
pub struct LinearSystem<T> {
    pub a: DenseMatrix<T>,
    pub b: Vec<T>,
}

impl<T: Real> LinearSystem<T> {
    pub fn new(a: DenseMatrix<T>, b: Vec<T>) -> Result<Self, SolveError> {
        if !a.is_square() {
            return Err(SolveError::DimensionMismatch { expected: a.nrows(), found: a.ncols() });
        }
        if b.len() != a.nrows() {
            return Err(SolveError::DimensionMismatch { expected: a.nrows(), found: b.len() });
        }
        Ok(Self { a, b })
    }

    pub fn order(&self) -> usize {
        self.b.len()
    }
}

/// Source of coefficient matrices and right-hand sides.
pub trait MatrixGenerator<T> {
    fn generate(&mut self, n: usize) -> Result<LinearSystem<T>, SolveError>;
}

fn random_rhs<T: Real>(rng: &mut StdRng, n: usize) -> Result<Vec<T>, SolveError> {
    let mut b = try_zeroed(n, "vector b")?;
    for bi in b.iter_mut() {
        *bi = T::of(f64::from(rng.gen_range(1u32..=50)) / 100.0);
    }
    Ok(b)
}

fn fill_dominant<T: Real>(
    rng: &mut StdRng,
    n: usize,
    off_scale: f64,
) -> Result<DenseMatrix<T>, SolveError> {
    let mut a = DenseMatrix::zeros(n, n)?;
    for i in 0..n {
        let row = a.row_mut(i);
        let mut sum = 0.0f64;
        for (j, aij) in row.iter_mut().enumerate() {
            if i != j {
                let v = rng.gen_range(0.0..1.0) * off_scale;
                sum += v;
                *aij = T::of(v);
            }
        }
        row[i] = T::of(sum + 1.0);
    }
    Ok(a)
}

/// Diagonally dominant matrix close to the identity.
pub struct NearIdentity {
    rng: StdRng,
}

impl NearIdentity {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl<T: Real> MatrixGenerator<T> for NearIdentity {
    fn generate(&mut self, n: usize) -> Result<LinearSystem<T>, SolveError> {
        let scale = if n > 1 { 1.0 / n as f64 } else { 0.0 };
        let a = fill_dominant(&mut self.rng, n, scale)?;
        let b = random_rhs(&mut self.rng, n)?;
        LinearSystem::new(a, b)
    }
}

/// General diagonally dominant matrix with `O(1)` off-diagonal entries.
pub struct DiagDominant {
    rng: StdRng,
}

impl DiagDominant {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl<T: Real> MatrixGenerator<T> for DiagDominant {
    fn generate(&mut self, n: usize) -> Result<LinearSystem<T>, SolveError> {
        let a = fill_dominant(&mut self.rng, n, 1.0)?;
        let b = random_rhs(&mut self.rng, n)?;
        LinearSystem::new(a, b)
    }
}
