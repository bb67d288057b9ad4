//! Location of coarse vertices inside the fine reference mesh.

use rayon::prelude::*;

use crate::matrix::{sparse_from_triplets, MatrixElementTriplet};
use crate::mesh::TetMesh;
use crate::shape::LinearTet;
use crate::{DSMatrix, Error};

/// Barycentric coordinates of every coarse vertex within a fine element.
///
/// The embedding defines the interpolation `N` from fine vertex displacements to coarse vertex
/// displacements.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding {
    /// Fine element containing each coarse vertex.
    elements: Vec<usize>,
    /// Fine vertex indices of the containing element.
    vertices: Vec<[usize; 4]>,
    weights: Vec<[f64; 4]>,
    num_fine_vertices: usize,
}

impl Embedding {
    /// Locate each coarse vertex in the fine mesh.
    ///
    /// Barycentric coordinates down to `-tolerance` are accepted. When several fine elements
    /// contain a vertex, the one it is deepest inside of is chosen.
    pub fn new(coarse: &TetMesh, fine: &TetMesh, tolerance: f64) -> Result<Self, Error> {
        let shapes = fine
            .tets()
            .iter()
            .enumerate()
            .map(|(i, tet)| LinearTet::new(i, *tet, fine.tet_positions(tet)))
            .collect::<Result<Vec<_>, Error>>()?;

        let located = coarse
            .vertex_positions()
            .par_iter()
            .enumerate()
            .map(|(vertex, x)| {
                shapes
                    .iter()
                    .enumerate()
                    .map(|(e, shape)| {
                        let w = shape.barycentric(x);
                        let depth = w.iter().cloned().fold(f64::INFINITY, f64::min);
                        (e, w, depth)
                    })
                    .filter(|(_, _, depth)| *depth >= -tolerance)
                    .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(e, w, _)| (e, w))
                    .ok_or(Error::GeometryMismatch {
                        vertex,
                        position: [x.x, x.y, x.z],
                    })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let (elements, weights): (Vec<_>, Vec<_>) = located.into_iter().unzip();
        let vertices = elements.iter().map(|&e| fine.tets()[e]).collect();
        Ok(Embedding {
            elements,
            vertices,
            weights,
            num_fine_vertices: fine.num_vertices(),
        })
    }

    #[inline]
    pub fn num_coarse_vertices(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn num_fine_vertices(&self) -> usize {
        self.num_fine_vertices
    }

    #[inline]
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    #[inline]
    pub fn weights(&self) -> &[[f64; 4]] {
        &self.weights
    }

    /// Interpolate fine vertex displacements (three per vertex) at the coarse vertices.
    pub fn interpolate(&self, fine: &[f64]) -> Result<Vec<f64>, Error> {
        if fine.len() != 3 * self.num_fine_vertices {
            return Err(Error::SizeMismatch);
        }
        let mut out = vec![0.0; 3 * self.num_coarse_vertices()];
        for (c, (tet, w)) in self.vertices.iter().zip(self.weights.iter()).enumerate() {
            for (&v, &w) in tet.iter().zip(w.iter()) {
                for i in 0..3 {
                    out[3 * c + i] += w * fine[3 * v + i];
                }
            }
        }
        Ok(out)
    }

    /// The interpolation matrix `N` of size `3 n_coarse × 3 n_fine`.
    pub fn interpolation_matrix(&self) -> DSMatrix {
        let mut triplets = Vec::with_capacity(12 * self.num_coarse_vertices());
        for (c, (tet, w)) in self.vertices.iter().zip(self.weights.iter()).enumerate() {
            for (&v, &w) in tet.iter().zip(w.iter()) {
                for i in 0..3 {
                    triplets.push(MatrixElementTriplet::new(3 * c + i, 3 * v + i, w));
                }
            }
        }
        sparse_from_triplets(
            3 * self.num_coarse_vertices(),
            3 * self.num_fine_vertices,
            &triplets,
        )
    }
}
