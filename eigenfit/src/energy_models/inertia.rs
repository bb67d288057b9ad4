use na::Vector3;

use crate::energy::*;
use crate::shape::{LinearTet, LocalMatrix, LocalState, LocalVector};

/// Default density of kinetic terms in kg/m³.
pub const DEFAULT_DENSITY: f64 = 1000.0;

/// No kinetic energy. Elements using this term are massless.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct KineticNone;

impl LocalEnergy for KineticNone {
    fn value(&self, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) -> f64 {
        0.0
    }
    fn gradient(&self, _: &mut LocalVector, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}
    fn hessian(&self, _: &mut LocalMatrix, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}
}

impl KineticEnergy for KineticNone {}

/// Kinetic energy with a consistent (non-lumped) mass matrix.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KineticNonLumped {
    density: f64,
}

impl Default for KineticNonLumped {
    fn default() -> Self {
        KineticNonLumped {
            density: DEFAULT_DENSITY,
        }
    }
}

impl KineticNonLumped {
    pub fn new(density: f64) -> Self {
        KineticNonLumped { density }
    }

    #[inline]
    pub fn set_density(&mut self, density: f64) {
        self.density = density;
    }

    #[inline]
    pub fn density(&self) -> f64 {
        self.density
    }
}

impl LocalEnergy for KineticNonLumped {
    /// `½ ρ vᵀv` where `v = J(x) q̇`.
    fn value(&self, shape: &LinearTet, x: &Vector3<f64>, state: &LocalState) -> f64 {
        let v = shape.jacobian(x) * state.q_dot;
        0.5 * self.density * v.norm_squared()
    }

    /// Kinetic energy contributes no static force. This is a no-op.
    fn gradient(&self, _: &mut LocalVector, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}

    /// Mass contribution `ρ Jᵀ J` at `x`.
    fn hessian(&self, h: &mut LocalMatrix, shape: &LinearTet, x: &Vector3<f64>, _: &LocalState) {
        let jac = shape.jacobian(x);
        *h = jac.transpose() * jac * self.density;
    }
}

impl KineticEnergy for KineticNonLumped {}
