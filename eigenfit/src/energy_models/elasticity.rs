//! Linear isotropic elasticity.

use na::{Matrix3, Matrix6, Vector3, Vector6};

use crate::energy::*;
use crate::shape::{LinearTet, LocalMatrix, LocalState, LocalVector};

/// Default Young's modulus in Pa.
pub const DEFAULT_YOUNGS_MODULUS: f64 = 1e6;
/// Default Poisson's ratio.
pub const DEFAULT_POISSON_RATIO: f64 = 0.45;

/// No potential energy.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PotentialNone;

impl LocalEnergy for PotentialNone {
    fn value(&self, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) -> f64 {
        0.0
    }
    fn gradient(&self, _: &mut LocalVector, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}
    fn hessian(&self, _: &mut LocalMatrix, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}
}

impl PotentialEnergy for PotentialNone {}

/// Build the isotropic elasticity tensor in Voigt notation with engineering shear strains.
///
/// The Poisson's ratio is expected to lie in `[0, 0.5)`. This is not checked.
pub fn elasticity_tensor(youngs_modulus: f64, poisson_ratio: f64) -> Matrix6<f64> {
    let e = youngs_modulus;
    let nu = poisson_ratio;
    let mut c = Matrix6::zeros();
    for i in 0..3 {
        for j in 0..3 {
            c[(i, j)] = if i == j { 1.0 - nu } else { nu };
        }
        c[(i + 3, i + 3)] = 0.5 * (1.0 - 2.0 * nu);
    }
    c * (e / ((1.0 + nu) * (1.0 - 2.0 * nu)))
}

/// Small strain linear elasticity.
///
/// The energy density is reported negated: `value = -½ qᵀBᵀCBq`, so that `gradient` yields
/// the elastic force `-BᵀCBq` and `hessian` the force Jacobian `-BᵀCB`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearElasticity {
    youngs_modulus: f64,
    poisson_ratio: f64,
    c: Matrix6<f64>,
}

impl Default for LinearElasticity {
    fn default() -> Self {
        LinearElasticity::new(DEFAULT_YOUNGS_MODULUS, DEFAULT_POISSON_RATIO)
    }
}

impl LinearElasticity {
    pub fn new(youngs_modulus: f64, poisson_ratio: f64) -> Self {
        LinearElasticity {
            youngs_modulus,
            poisson_ratio,
            c: elasticity_tensor(youngs_modulus, poisson_ratio),
        }
    }

    pub fn set_parameters(&mut self, youngs_modulus: f64, poisson_ratio: f64) {
        *self = LinearElasticity::new(youngs_modulus, poisson_ratio);
    }

    #[inline]
    pub fn youngs_modulus(&self) -> f64 {
        self.youngs_modulus
    }

    #[inline]
    pub fn poisson_ratio(&self) -> f64 {
        self.poisson_ratio
    }

    #[inline]
    pub fn tensor(&self) -> &Matrix6<f64> {
        &self.c
    }

    /// `BᵀCB`, the positive semi-definite stiffness density.
    fn stiffness_density(&self, shape: &LinearTet) -> LocalMatrix {
        let b = shape.strain_displacement();
        b.transpose() * self.c * b
    }

    /// Voigt stress `C B q`.
    pub fn voigt_stress(&self, shape: &LinearTet, state: &LocalState) -> Vector6<f64> {
        self.c * (shape.strain_displacement() * state.q)
    }

    /// Symmetric Cauchy stress tensor. Constant over a linear element.
    pub fn cauchy_stress(&self, shape: &LinearTet, state: &LocalState) -> Matrix3<f64> {
        let s = self.voigt_stress(shape, state);
        Matrix3::new(
            s[0], s[5], s[4], //
            s[5], s[1], s[3], //
            s[4], s[3], s[2],
        )
    }
}

impl LocalEnergy for LinearElasticity {
    fn value(&self, shape: &LinearTet, _: &Vector3<f64>, state: &LocalState) -> f64 {
        -0.5 * state.q.dot(&(self.stiffness_density(shape) * state.q))
    }

    fn gradient(&self, f: &mut LocalVector, shape: &LinearTet, _: &Vector3<f64>, state: &LocalState) {
        *f = -(self.stiffness_density(shape) * state.q);
    }

    fn hessian(&self, h: &mut LocalMatrix, shape: &LinearTet, _: &Vector3<f64>, _: &LocalState) {
        *h = -self.stiffness_density(shape);
    }
}

impl PotentialEnergy for LinearElasticity {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy_models::test_utils::*;
    use approx::assert_relative_eq;

    #[test]
    fn tensor_is_symmetric_positive_definite() {
        for &(e, nu) in &[(2e5, 0.45), (1e6, 0.3), (1.0, 0.01), (7e10, 0.49), (3e3, 0.25)] {
            let c = elasticity_tensor(e, nu);
            assert_relative_eq!(c, c.transpose());
            assert!(na::Cholesky::new(c).is_some(), "E = {}, nu = {}", e, nu);
        }
    }

    #[test]
    fn shear_modulus_on_diagonal() {
        let c = elasticity_tensor(2e5, 0.45);
        assert_relative_eq!(c[(3, 3)], 2e5 / (2.0 * 1.45), max_relative = 1e-12);
    }

    #[test]
    fn gradient() {
        gradient_tester(LinearElasticity::new(2e5, 0.45));
    }

    #[test]
    fn hessian() {
        hessian_tester(LinearElasticity::new(2e5, 0.45));
    }

    /// Rigid motions produce no elastic force.
    #[test]
    fn translation_is_force_free() {
        let elasticity = LinearElasticity::default();
        for tet in test_tets() {
            let state = LocalState {
                q: LocalVector::from_fn(|i, _| [0.1, 0.2, -0.3][i % 3]),
                ..LocalState::default()
            };
            let mut f = LocalVector::zeros();
            elasticity.gradient(&mut f, &tet, &Vector3::zeros(), &state);
            assert_relative_eq!(f.norm(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn pure_shear_stress() {
        let elasticity = LinearElasticity::new(2e5, 0.0);
        let tet = &test_tets()[0];
        // u = (0.01 z, 0, 0) is a pure xz shear.
        let q = LocalVector::from_fn(|i, _| {
            if i % 3 == 0 {
                0.01 * tet.rest_positions()[i / 3].z
            } else {
                0.0
            }
        });
        let sigma = elasticity.cauchy_stress(tet, &LocalState { q, ..LocalState::default() });
        assert_relative_eq!(sigma[(0, 2)], 0.5 * 2e5 * 0.01, max_relative = 1e-10);
        assert_relative_eq!(sigma[(0, 2)], sigma[(2, 0)]);
        assert_relative_eq!(sigma[(0, 0)], 0.0, epsilon = 1e-9);
    }
}
