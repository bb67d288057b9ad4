use na::Vector3;

use crate::energy::*;
use crate::shape::{LinearTet, LocalMatrix, LocalState, LocalVector};

/// Default gravitational acceleration.
pub const DEFAULT_GRAVITY: [f64; 3] = [0.0, -9.8, 0.0];

/// No body force.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BodyForceNone;

impl LocalEnergy for BodyForceNone {
    fn value(&self, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) -> f64 {
        0.0
    }
    fn gradient(&self, _: &mut LocalVector, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}
    fn hessian(&self, _: &mut LocalMatrix, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}
}

impl BodyForce for BodyForceNone {}

/// A constant directional force per unit volume `ρ g`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Gravity {
    density: f64,
    g: Vector3<f64>,
}

impl Default for Gravity {
    fn default() -> Self {
        Gravity {
            density: 1.0,
            g: Vector3::from(DEFAULT_GRAVITY),
        }
    }
}

impl Gravity {
    pub fn new(density: f64, g: [f64; 3]) -> Self {
        Gravity {
            density,
            g: Vector3::from(g),
        }
    }

    #[inline]
    pub fn set_body_force_density(&mut self, density: f64) {
        self.density = density;
    }

    #[inline]
    pub fn set_gravity(&mut self, g: [f64; 3]) {
        self.g = Vector3::from(g);
    }

    #[inline]
    pub fn gravity(&self) -> &Vector3<f64> {
        &self.g
    }

    #[inline]
    pub fn body_force_density(&self) -> f64 {
        self.density
    }
}

impl LocalEnergy for Gravity {
    /// Work done by gravity, `qᵀJᵀρg`, which is the negated gravitational potential.
    fn value(&self, shape: &LinearTet, x: &Vector3<f64>, state: &LocalState) -> f64 {
        (shape.jacobian(x) * state.q).dot(&self.g) * self.density
    }

    /// Generalized force `Jᵀρg`, assuming the force does the same rate of work.
    fn gradient(&self, f: &mut LocalVector, shape: &LinearTet, x: &Vector3<f64>, _: &LocalState) {
        *f = shape.jacobian(x).transpose() * (self.g * self.density);
    }

    /// Constant force, the Hessian is zero. This is a no-op.
    fn hessian(&self, _: &mut LocalMatrix, _: &LinearTet, _: &Vector3<f64>, _: &LocalState) {}
}

impl BodyForce for Gravity {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy_models::test_utils::*;

    #[test]
    fn gradient() {
        gradient_tester(Gravity::new(1000.0, [0.0, -9.81, 0.0]));
    }

    #[test]
    fn hessian() {
        hessian_tester(Gravity::new(1000.0, [0.0, -9.81, 0.0]));
    }
}
