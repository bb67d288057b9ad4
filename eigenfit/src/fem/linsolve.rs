//! Dense direct solvers for the reduced system and low rank updates to them.
//!
//! The base system matrix is factorized once with a Cholesky decomposition. A symmetric low
//! rank update `A + U diag(c) Uᵗ` is then solved with the Sherman–Morrison–Woodbury identity
//!
//! ```verbatim
//! (A + U C Uᵗ)⁻¹ = A⁻¹ − A⁻¹U (C⁻¹ + UᵗA⁻¹U)⁻¹ UᵗA⁻¹
//! ```
//!
//! which only needs solves against the cached factorization and a small `m × m` core solve.

use na::{Cholesky, DMatrix, DVector, Dyn, LU};

use crate::Error;

/// Pivots of the row equilibrated Woodbury core smaller than this are treated as zero.
pub const SINGULAR_CORE_TOLERANCE: f64 = 1e-10;

/// Cholesky factorization of a symmetric positive definite matrix.
#[derive(Clone, Debug)]
pub struct BaseFactorization {
    chol: Cholesky<f64, Dyn>,
}

impl BaseFactorization {
    pub fn new(mat: DMatrix<f64>) -> Result<Self, Error> {
        if !mat.is_square() {
            return Err(Error::SizeMismatch);
        }
        let chol = Cholesky::new(mat).ok_or(Error::NotPositiveDefinite)?;
        Ok(BaseFactorization { chol })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.chol.l_dirty().nrows()
    }

    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        self.chol.solve(b)
    }

    pub fn solve_matrix(&self, b: &DMatrix<f64>) -> DMatrix<f64> {
        self.chol.solve(b)
    }
}

/// A symmetric update `U diag(c) Uᵗ`. Columns with zero coefficients are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct LowRankUpdate {
    basis: DMatrix<f64>,
    coefficients: DVector<f64>,
}

impl LowRankUpdate {
    pub fn new(basis: &DMatrix<f64>, coefficients: &[f64]) -> Result<Self, Error> {
        if basis.ncols() != coefficients.len() {
            return Err(Error::SizeMismatch);
        }
        let keep: Vec<usize> = coefficients
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0.0)
            .map(|(i, _)| i)
            .collect();
        Ok(LowRankUpdate {
            basis: basis.select_columns(keep.iter()),
            coefficients: DVector::from_iterator(keep.len(), keep.iter().map(|&i| coefficients[i])),
        })
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.basis.nrows()
    }

    #[inline]
    pub fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    #[inline]
    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    /// Multiply every coefficient by `factor`.
    pub fn scaled(&self, factor: f64) -> LowRankUpdate {
        LowRankUpdate {
            basis: self.basis.clone(),
            coefficients: &self.coefficients * factor,
        }
    }

    /// `U diag(c) Uᵗ x`.
    pub fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let t = self.basis.tr_mul(x).component_mul(&self.coefficients);
        &self.basis * t
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let scaled = DMatrix::from_fn(self.basis.nrows(), self.rank(), |i, j| {
            self.basis[(i, j)] * self.coefficients[j]
        });
        scaled * self.basis.transpose()
    }
}

/// Cached Woodbury solver for `A + U diag(c) Uᵗ` given a factorization of `A`.
#[derive(Clone, Debug)]
pub struct WoodburySolver {
    basis: DMatrix<f64>,
    /// `A⁻¹U`
    solved_basis: DMatrix<f64>,
    /// Reciprocal row scales applied to the core before factorization.
    row_scales: DVector<f64>,
    core: LU<f64, Dyn, Dyn>,
}

impl WoodburySolver {
    pub fn new(base: &BaseFactorization, update: &LowRankUpdate) -> Result<Self, Error> {
        if update.dim() != base.dim() {
            return Err(Error::SizeMismatch);
        }
        let solved_basis = base.solve_matrix(update.basis());
        let mut core = update.basis().tr_mul(&solved_basis);

        // Equilibrate each row by the magnitude of the terms summed into it.
        let m = update.rank();
        let mut row_scales = DVector::zeros(m);
        for (i, &c) in update.coefficients().iter().enumerate() {
            let inv_c = 1.0 / c;
            let scale = core.row(i).amax().max(inv_c.abs());
            core[(i, i)] += inv_c;
            row_scales[i] = 1.0 / scale;
        }
        for (i, mut row) in core.row_iter_mut().enumerate() {
            row *= row_scales[i];
        }

        let core = core.lu();
        let min_pivot = core
            .u()
            .diagonal()
            .iter()
            .fold(f64::INFINITY, |acc, &x| acc.min(x.abs()));
        if m > 0 && !(min_pivot > SINGULAR_CORE_TOLERANCE) {
            return Err(Error::SingularWoodburyCore);
        }

        Ok(WoodburySolver {
            basis: update.basis().clone(),
            solved_basis,
            row_scales,
            core,
        })
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.basis.ncols()
    }

    pub fn solve(&self, base: &BaseFactorization, b: &DVector<f64>) -> Result<DVector<f64>, Error> {
        let x = base.solve(b);
        if self.rank() == 0 {
            return Ok(x);
        }
        let rhs = self.basis.tr_mul(&x).component_mul(&self.row_scales);
        let t = self.core.solve(&rhs).ok_or(Error::SingularWoodburyCore)?;
        Ok(x - &self.solved_basis * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn random_spd(n: usize, rng: &mut StdRng) -> DMatrix<f64> {
        let b = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
        b.tr_mul(&b) + DMatrix::identity(n, n) * n as f64
    }

    #[test]
    fn woodbury_matches_direct_solve() -> Result<(), Error> {
        let n = 120;
        let mut rng = StdRng::seed_from_u64(3);
        let a = random_spd(n, &mut rng);
        let base = BaseFactorization::new(a.clone())?;
        let b = DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0));

        for &m in &[1, 5, 20] {
            let u = DMatrix::from_fn(n, m, |_, _| rng.gen_range(-1.0..1.0));
            let c: Vec<f64> = (0..m).map(|_| rng.gen_range(0.1..2.0)).collect();
            let update = LowRankUpdate::new(&u, &c)?;
            let solver = WoodburySolver::new(&base, &update)?;
            let x = solver.solve(&base, &b)?;

            let direct = (&a + update.to_dense())
                .lu()
                .solve(&b)
                .expect("corrected matrix is invertible");
            assert_relative_eq!(x, direct, epsilon = 1e-9, max_relative = 1e-8);
        }
        Ok(())
    }

    #[test]
    fn zero_coefficients_are_dropped() -> Result<(), Error> {
        let u = DMatrix::from_fn(4, 3, |i, j| (i + j) as f64);
        let update = LowRankUpdate::new(&u, &[1.0, 0.0, 2.0])?;
        assert_eq!(update.rank(), 2);
        assert_eq!(update.basis().column(1), u.column(2));

        let base = BaseFactorization::new(DMatrix::identity(4, 4))?;
        let empty = LowRankUpdate::new(&u, &[0.0; 3])?;
        let solver = WoodburySolver::new(&base, &empty)?;
        let b = DVector::from_element(4, 1.0);
        assert_eq!(solver.solve(&base, &b)?, b);
        Ok(())
    }

    #[test]
    fn singular_core_is_detected() -> Result<(), Error> {
        let n = 20;
        let mut rng = StdRng::seed_from_u64(11);
        let base = BaseFactorization::new(random_spd(n, &mut rng))?;
        let u = DMatrix::from_fn(n, 1, |_, _| rng.gen_range(-1.0..1.0));
        // Choose c so that 1/c + uᵗA⁻¹u vanishes.
        let s = u.tr_mul(&base.solve_matrix(&u))[(0, 0)];
        let update = LowRankUpdate::new(&u, &[-1.0 / s])?;
        assert!(matches!(
            WoodburySolver::new(&base, &update),
            Err(Error::SingularWoodburyCore)
        ));
        Ok(())
    }

    #[test]
    fn nearly_neutral_coefficient_is_accepted() -> Result<(), Error> {
        let n = 100;
        let base = BaseFactorization::new(DMatrix::identity(n, n))?;
        let u = DMatrix::from_fn(n, 2, |i, j| if i == j { 1.0 } else { 0.0 });
        let update = LowRankUpdate::new(&u, &[1.0, 1e-12])?;
        let solver = WoodburySolver::new(&base, &update)?;

        let b = DVector::from_fn(n, |i, _| 1.0 + i as f64);
        let x = solver.solve(&base, &b)?;
        assert_relative_eq!(x[0], 0.5, max_relative = 1e-12);
        assert_relative_eq!(x[1], 2.0 / (1.0 + 1e-12), max_relative = 1e-12);
        assert_relative_eq!(x.rows(2, n - 2), b.rows(2, n - 2));
        Ok(())
    }

    #[test]
    fn indefinite_base_is_rejected() {
        let mut a = DMatrix::identity(3, 3);
        a[(1, 1)] = -1.0;
        assert!(matches!(
            BaseFactorization::new(a),
            Err(Error::NotPositiveDefinite)
        ));
    }
}
