/*!
 * Per element energy interface. An energy term is evaluated at a material point `x` of a single
 * element given the local generalized coordinates and velocities of that element.
 *
 * Gradients and Hessians are reported as generalized *forces* and force Jacobians, so terms
 * representing stored energy report the negated energy from `value`. With this convention the
 * derivative of `value` is exactly what `gradient` writes, and the derivative of `gradient` is
 * what `hessian` writes.
 *
 * Terms are split into three independent families: kinetic, potential and body force. An element
 * composes exactly one term of each family (see `objects::Element`).
 */

use na::Vector3;

use crate::shape::{LinearTet, LocalMatrix, LocalState, LocalVector};

/// Capability set shared by all energy terms.
pub trait LocalEnergy: Send + Sync {
    /// Value of the term at the material point `x`.
    fn value(&self, shape: &LinearTet, x: &Vector3<f64>, state: &LocalState) -> f64;

    /// Write the local generalized force into `f`.
    fn gradient(&self, f: &mut LocalVector, shape: &LinearTet, x: &Vector3<f64>, state: &LocalState);

    /// Write the local stiffness or mass contribution into `h`.
    fn hessian(&self, h: &mut LocalMatrix, shape: &LinearTet, x: &Vector3<f64>, state: &LocalState);
}

/// Kinetic energy terms. The Hessian is the mass contribution.
pub trait KineticEnergy: LocalEnergy {}

/// Potential energy terms. The gradient is the internal force and the Hessian the stiffness
/// (force Jacobian) contribution.
pub trait PotentialEnergy: LocalEnergy {}

/// External body forces.
pub trait BodyForce: LocalEnergy {}
