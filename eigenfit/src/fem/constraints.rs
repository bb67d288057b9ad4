//! Fixed point constraints and the projection onto the unconstrained subspace.

use na::DMatrix;

use crate::dof::{DofMap, SystemId};
use crate::matrix::{sparse_from_triplets, MatrixElementTriplet};
use crate::mesh::TetMesh;
use crate::{DSMatrix, Error};

/// Vertices whose rest coordinate along `axis` is within `tolerance` of the minimum.
pub fn min_vertices(mesh: &TetMesh, axis: usize, tolerance: f64) -> Result<Vec<usize>, Error> {
    if axis > 2 {
        return Err(Error::InvalidParameter {
            name: format!("axis {}", axis),
        });
    }
    let min = match mesh.min_coordinate(axis) {
        Some(min) => min,
        None => return Ok(Vec::new()),
    };
    Ok(mesh
        .vertex_positions()
        .iter()
        .enumerate()
        .filter(|(_, v)| v[axis] <= min + tolerance)
        .map(|(i, _)| i)
        .collect())
}

/// Global indices of all three coordinates of each of the given vertices.
pub fn fixed_point_dofs(
    dof_map: &DofMap,
    system: SystemId,
    vertices: &[usize],
) -> Result<Vec<usize>, Error> {
    let mut dofs = Vec::with_capacity(3 * vertices.len());
    for &v in vertices {
        for i in 0..3 {
            dofs.push(dof_map.global_index_of(system, 3 * v + i)?);
        }
    }
    Ok(dofs)
}

/// Selection of the unconstrained coordinates.
///
/// The projection matrix `P` is `n × n_reduced` with one unit column per free coordinate in
/// increasing order, so `PᵗP = I` and reduced quantities are plain index selections.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    full_dim: usize,
    fixed: Vec<usize>,
    free: Vec<usize>,
    /// Maps full indices to reduced indices.
    reduced_index: Vec<Option<usize>>,
}

impl Projection {
    pub fn new(full_dim: usize, fixed: impl IntoIterator<Item = usize>) -> Result<Self, Error> {
        let mut fixed: Vec<usize> = fixed.into_iter().collect();
        fixed.sort_unstable();
        fixed.dedup();
        if let Some(&last) = fixed.last() {
            if last >= full_dim {
                return Err(Error::InvalidParameter {
                    name: format!("fixed dof {}", last),
                });
            }
        }

        let mut reduced_index = vec![Some(0); full_dim];
        for &i in fixed.iter() {
            reduced_index[i] = None;
        }
        let mut free = Vec::with_capacity(full_dim - fixed.len());
        for (i, r) in reduced_index.iter_mut().enumerate() {
            if r.is_some() {
                *r = Some(free.len());
                free.push(i);
            }
        }

        Ok(Projection {
            full_dim,
            fixed,
            free,
            reduced_index,
        })
    }

    pub fn identity(full_dim: usize) -> Self {
        Projection {
            full_dim,
            fixed: Vec::new(),
            free: (0..full_dim).collect(),
            reduced_index: (0..full_dim).map(Some).collect(),
        }
    }

    #[inline]
    pub fn full_dim(&self) -> usize {
        self.full_dim
    }

    #[inline]
    pub fn reduced_dim(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn fixed_dofs(&self) -> &[usize] {
        &self.fixed
    }

    #[inline]
    pub fn free_dofs(&self) -> &[usize] {
        &self.free
    }

    #[inline]
    pub fn reduced_index(&self, full: usize) -> Option<usize> {
        self.reduced_index.get(full).copied().flatten()
    }

    /// The selection matrix `P`.
    pub fn matrix(&self) -> DSMatrix {
        let triplets: Vec<_> = self
            .free
            .iter()
            .enumerate()
            .map(|(j, &i)| MatrixElementTriplet::new(i, j, 1.0))
            .collect();
        sparse_from_triplets(self.full_dim, self.reduced_dim(), &triplets)
    }

    fn check_square(&self, mat: &DSMatrix) -> Result<(), Error> {
        if mat.rows() != self.full_dim || mat.cols() != self.full_dim {
            return Err(Error::SizeMismatch);
        }
        Ok(())
    }

    /// `PᵗKP` as a sparse matrix.
    pub fn restrict_matrix(&self, mat: &DSMatrix) -> Result<DSMatrix, Error> {
        self.check_square(mat)?;
        let triplets: Vec<_> = mat
            .iter()
            .filter_map(|(&val, (row, col))| {
                Some(MatrixElementTriplet::new(
                    self.reduced_index[row]?,
                    self.reduced_index[col]?,
                    val,
                ))
            })
            .collect();
        let n = self.reduced_dim();
        Ok(sparse_from_triplets(n, n, &triplets))
    }

    /// `PᵗKP` as a dense matrix.
    pub fn restrict_dense(&self, mat: &DSMatrix) -> Result<DMatrix<f64>, Error> {
        self.check_square(mat)?;
        let n = self.reduced_dim();
        let mut out = DMatrix::zeros(n, n);
        for (&val, (row, col)) in mat.iter() {
            if let (Some(r), Some(c)) = (self.reduced_index[row], self.reduced_index[col]) {
                out[(r, c)] += val;
            }
        }
        Ok(out)
    }

    /// `Pᵗx`.
    pub fn restrict_vector(&self, x: &[f64]) -> Result<Vec<f64>, Error> {
        if x.len() != self.full_dim {
            return Err(Error::SizeMismatch);
        }
        Ok(self.free.iter().map(|&i| x[i]).collect())
    }

    /// `Px`. Constrained coordinates are zero.
    pub fn prolong(&self, x: &[f64]) -> Result<Vec<f64>, Error> {
        if x.len() != self.reduced_dim() {
            return Err(Error::SizeMismatch);
        }
        let mut out = vec![0.0; self.full_dim];
        for (&i, &v) in self.free.iter().zip(x.iter()) {
            out[i] = v;
        }
        Ok(out)
    }
}
