//! Generalized symmetric eigenproblems for the low frequency modes of a mesh.

use na::{Cholesky, DMatrix, DVector, SymmetricEigen};

use crate::Error;

/// Lowest eigenpairs of `S v = λ M v` with mass orthonormal eigenvectors.
#[derive(Clone, Debug, PartialEq)]
pub struct Modes {
    /// Eigenvalues in increasing order.
    pub values: DVector<f64>,
    /// One eigenvector per column satisfying `VᵗMV = I`.
    pub vectors: DMatrix<f64>,
}

impl Modes {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Solve the generalized symmetric eigenproblem for the `num_modes` smallest eigenvalues.
///
/// The problem is reduced to a standard one with the Cholesky factor `M = LLᵗ`:
/// `L⁻¹ S L⁻ᵗ y = λ y` and `v = L⁻ᵗ y`. Each eigenvector is signed so that its largest entry is
/// positive.
pub fn generalized_eigen(
    stiffness: &DMatrix<f64>,
    mass: &DMatrix<f64>,
    num_modes: usize,
) -> Result<Modes, Error> {
    let n = mass.nrows();
    if !mass.is_square() || stiffness.shape() != mass.shape() {
        return Err(Error::SizeMismatch);
    }
    if num_modes > n {
        return Err(Error::TooManyModes {
            requested: num_modes,
            available: n,
        });
    }

    let chol = Cholesky::new(mass.clone()).ok_or(Error::SingularMassMatrix)?;
    let l = chol.l();
    let half = l
        .solve_lower_triangular(stiffness)
        .ok_or(Error::SingularMassMatrix)?;
    let reduced = l
        .solve_lower_triangular(&half.transpose())
        .ok_or(Error::SingularMassMatrix)?;
    let reduced = (&reduced + reduced.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(reduced);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.truncate(num_modes);

    let values = DVector::from_iterator(num_modes, order.iter().map(|&i| eigen.eigenvalues[i]));
    let y = eigen.eigenvectors.select_columns(order.iter());
    let mut vectors = l.tr_solve_lower_triangular(&y).ok_or(Error::SingularMassMatrix)?;

    for mut v in vectors.column_iter_mut() {
        let imax = v.iamax();
        if v[imax] < 0.0 {
            v.neg_mut();
        }
    }

    Ok(Modes { values, vectors })
}
