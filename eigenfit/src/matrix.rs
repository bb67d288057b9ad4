//! This module provides an interface for working with sparse matrix structures assembled from
//! per-element contributions and their conversions to dense `nalgebra` matrices used by the
//! eigen and direct solvers.

use na::DMatrix;

use crate::DSMatrix;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MatrixElementIndex {
    pub row: usize,
    pub col: usize,
}

impl From<(usize, usize)> for MatrixElementIndex {
    fn from((row, col): (usize, usize)) -> Self {
        MatrixElementIndex { row, col }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MatrixElementTriplet<T> {
    pub idx: MatrixElementIndex,
    pub val: T,
}

impl<T> MatrixElementTriplet<T> {
    pub fn new(row: usize, col: usize, val: T) -> Self {
        MatrixElementTriplet {
            idx: MatrixElementIndex { row, col },
            val,
        }
    }
}

/// Build a compressed sparse row matrix from a list of triplets. Duplicate entries are summed.
pub fn sparse_from_triplets(
    num_rows: usize,
    num_cols: usize,
    triplets: &[MatrixElementTriplet<f64>],
) -> DSMatrix {
    let mut tri = sprs::TriMat::with_capacity((num_rows, num_cols), triplets.len());
    for MatrixElementTriplet {
        idx: MatrixElementIndex { row, col },
        val,
    } in triplets.iter()
    {
        tri.add_triplet(*row, *col, *val);
    }
    tri.to_csr()
}

/// Convert a sparse matrix into a dense one.
pub fn sparse_to_dense(mat: &DSMatrix) -> DMatrix<f64> {
    let (rows, cols) = mat.shape();
    let mut dense = DMatrix::zeros(rows, cols);
    for (&val, (row, col)) in mat.iter() {
        dense[(row, col)] += val;
    }
    dense
}

/// Convert a dense matrix into a sparse one skipping exact zeros.
pub fn dense_to_sparse(mat: &DMatrix<f64>) -> DSMatrix {
    let mut tri = sprs::TriMat::new((mat.nrows(), mat.ncols()));
    for col in 0..mat.ncols() {
        for row in 0..mat.nrows() {
            let val = mat[(row, col)];
            if val != 0.0 {
                tri.add_triplet(row, col, val);
            }
        }
    }
    tri.to_csr()
}
