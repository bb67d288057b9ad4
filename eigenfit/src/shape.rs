//! Linear tetrahedron shape functions.
//!
//! The displacement field inside an element is `u(x) = Σ φ_i(x) q_i` where `φ_i` are the
//! barycentric coordinates of the material point `x` in the rest configuration and `q_i` are
//! the displacements of the element vertices. Local generalized coordinates are stacked per
//! vertex: `[q_0x, q_0y, q_0z, q_1x, ...]`.

use na::{Matrix3, SMatrix, SVector, Vector3};

use crate::mesh::signed_volume;
use crate::Error;

/// Number of local generalized coordinates of a linear tetrahedron.
pub const NUM_LOCAL_DOFS: usize = 12;

pub type LocalVector = SVector<f64, NUM_LOCAL_DOFS>;
pub type LocalMatrix = SMatrix<f64, NUM_LOCAL_DOFS, NUM_LOCAL_DOFS>;
/// Maps local coordinates to the displacement at a material point.
pub type ShapeJacobian = SMatrix<f64, 3, NUM_LOCAL_DOFS>;
/// Maps local coordinates to the Voigt strain vector `[xx, yy, zz, 2yz, 2xz, 2xy]`.
pub type StrainDisplacement = SMatrix<f64, 6, NUM_LOCAL_DOFS>;

/// Local generalized coordinates and velocities of a single element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalState {
    pub q: LocalVector,
    pub q_dot: LocalVector,
}

impl Default for LocalState {
    fn default() -> Self {
        LocalState {
            q: LocalVector::zeros(),
            q_dot: LocalVector::zeros(),
        }
    }
}

#[allow(non_snake_case)]
#[derive(Clone, Debug, PartialEq)]
pub struct LinearTet {
    vertices: [usize; 4],
    rest: [Vector3<f64>; 4],
    DX_inv: Matrix3<f64>,
    volume: f64,
    /// Gradients of the shape functions with respect to rest coordinates.
    grads: [Vector3<f64>; 4],
}

impl LinearTet {
    /// Precompute shape function data for the element with the given vertex indices and rest
    /// positions.
    #[allow(non_snake_case)]
    pub fn new(element: usize, vertices: [usize; 4], rest: [Vector3<f64>; 4]) -> Result<Self, Error> {
        let DX = Matrix3::from_columns(&[rest[1] - rest[0], rest[2] - rest[0], rest[3] - rest[0]]);
        let DX_inv = DX.try_inverse().ok_or(Error::DegenerateReferenceElement {
            degens: vec![element],
        })?;
        let volume = signed_volume(&rest);
        if volume <= 0.0 {
            return Err(Error::InvertedReferenceElement {
                inverted: vec![element],
            });
        }

        let g1 = DX_inv.row(0).transpose();
        let g2 = DX_inv.row(1).transpose();
        let g3 = DX_inv.row(2).transpose();
        let g0 = -(g1 + g2 + g3);

        Ok(LinearTet {
            vertices,
            rest,
            DX_inv,
            volume,
            grads: [g0, g1, g2, g3],
        })
    }

    #[inline]
    pub fn vertices(&self) -> &[usize; 4] {
        &self.vertices
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    #[inline]
    pub fn rest_positions(&self) -> &[Vector3<f64>; 4] {
        &self.rest
    }

    /// Barycentric coordinates of the rest space point `x`.
    pub fn barycentric(&self, x: &Vector3<f64>) -> [f64; 4] {
        let l = self.DX_inv * (x - self.rest[0]);
        [1.0 - l.x - l.y - l.z, l.x, l.y, l.z]
    }

    /// Rest space position of the point with the given barycentric coordinates.
    pub fn material_point(&self, barycentric: &[f64; 4]) -> Vector3<f64> {
        self.rest
            .iter()
            .zip(barycentric.iter())
            .fold(Vector3::zeros(), |acc, (p, &w)| acc + p * w)
    }

    /// Shape function values at `x`.
    #[inline]
    pub fn phi(&self, x: &Vector3<f64>) -> [f64; 4] {
        self.barycentric(x)
    }

    /// Shape function gradients, constant over the element.
    #[inline]
    pub fn grad_phi(&self) -> &[Vector3<f64>; 4] {
        &self.grads
    }

    /// The matrix `J` such that `u(x) = J(x) q`.
    pub fn jacobian(&self, x: &Vector3<f64>) -> ShapeJacobian {
        let phi = self.phi(x);
        let mut jac = ShapeJacobian::zeros();
        for (a, &p) in phi.iter().enumerate() {
            for i in 0..3 {
                jac[(i, 3 * a + i)] = p;
            }
        }
        jac
    }

    /// Strain-displacement operator `B` such that `ε = B q`.
    ///
    /// Shear strains are engineering strains ordered `yz`, `xz`, `xy`.
    pub fn strain_displacement(&self) -> StrainDisplacement {
        let mut b = StrainDisplacement::zeros();
        for (a, g) in self.grads.iter().enumerate() {
            let c = 3 * a;
            b[(0, c)] = g.x;
            b[(1, c + 1)] = g.y;
            b[(2, c + 2)] = g.z;

            b[(3, c + 1)] = g.z;
            b[(3, c + 2)] = g.y;

            b[(4, c)] = g.z;
            b[(4, c + 2)] = g.x;

            b[(5, c)] = g.y;
            b[(5, c + 1)] = g.x;
        }
        b
    }

    /// System level degree of freedom indices of the local coordinates.
    pub fn dof_indices(&self) -> [usize; NUM_LOCAL_DOFS] {
        let mut dofs = [0; NUM_LOCAL_DOFS];
        for (a, &v) in self.vertices.iter().enumerate() {
            for i in 0..3 {
                dofs[3 * a + i] = 3 * v + i;
            }
        }
        dofs
    }

    /// Gather local coordinates from a system level vector.
    pub fn gather(&self, x: &[f64]) -> LocalVector {
        LocalVector::from_iterator(self.dof_indices().iter().map(|&i| x[i]))
    }

    /// Gather the local state from system level positions and velocities.
    pub fn local_state(&self, q: &[f64], q_dot: &[f64]) -> LocalState {
        LocalState {
            q: self.gather(q),
            q_dot: self.gather(q_dot),
        }
    }
}
