use na::Vector3;

use crate::energy::*;
use crate::quadrature::{QuadraturePoint, TET_QUADRATURE_4};
use crate::shape::{LinearTet, LocalMatrix, LocalState, LocalVector};

/// Local mass, stiffness and force of a single element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ElementContribution {
    pub mass: LocalMatrix,
    /// Force Jacobian. Negative semi-definite for elastic terms.
    pub stiffness: LocalMatrix,
    pub force: LocalVector,
}

/// A linear tetrahedron composed of one kinetic, one potential and one body force term.
///
/// Terms are integrated over the element with a quadratic quadrature rule.
#[derive(Clone, Debug, PartialEq)]
pub struct Element<K, P, B> {
    shape: LinearTet,
    kinetic: K,
    potential: P,
    body_force: B,
}

impl<K, P, B> Element<K, P, B>
where
    K: KineticEnergy,
    P: PotentialEnergy,
    B: BodyForce,
{
    pub fn new(shape: LinearTet, kinetic: K, potential: P, body_force: B) -> Self {
        Element {
            shape,
            kinetic,
            potential,
            body_force,
        }
    }

    #[inline]
    pub fn shape(&self) -> &LinearTet {
        &self.shape
    }
    #[inline]
    pub fn kinetic(&self) -> &K {
        &self.kinetic
    }
    #[inline]
    pub fn kinetic_mut(&mut self) -> &mut K {
        &mut self.kinetic
    }
    #[inline]
    pub fn potential(&self) -> &P {
        &self.potential
    }
    #[inline]
    pub fn potential_mut(&mut self) -> &mut P {
        &mut self.potential
    }
    #[inline]
    pub fn body_force(&self) -> &B {
        &self.body_force
    }
    #[inline]
    pub fn body_force_mut(&mut self) -> &mut B {
        &mut self.body_force
    }

    fn quadrature_points(&self) -> impl Iterator<Item = (f64, Vector3<f64>)> + '_ {
        let volume = self.shape.volume();
        TET_QUADRATURE_4
            .iter()
            .map(move |&QuadraturePoint { barycentric, weight }| {
                (weight * volume, self.shape.material_point(&barycentric))
            })
    }

    fn integrate_vector(
        &self,
        terms: &[&dyn LocalEnergy],
        state: &LocalState,
    ) -> LocalVector {
        let mut out = LocalVector::zeros();
        let mut buf = LocalVector::zeros();
        for (w, x) in self.quadrature_points() {
            for term in terms {
                buf.fill(0.0);
                term.gradient(&mut buf, &self.shape, &x, state);
                out += buf * w;
            }
        }
        out
    }

    fn integrate_matrix(
        &self,
        terms: &[&dyn LocalEnergy],
        state: &LocalState,
    ) -> LocalMatrix {
        let mut out = LocalMatrix::zeros();
        let mut buf = LocalMatrix::zeros();
        for (w, x) in self.quadrature_points() {
            for term in terms {
                buf.fill(0.0);
                term.hessian(&mut buf, &self.shape, &x, state);
                out += buf * w;
            }
        }
        out
    }

    /// Total value of all terms. Kinetic energy plus the negated potential energies.
    pub fn energy(&self, state: &LocalState) -> f64 {
        self.quadrature_points()
            .map(|(w, x)| {
                w * (self.kinetic.value(&self.shape, &x, state)
                    + self.potential.value(&self.shape, &x, state)
                    + self.body_force.value(&self.shape, &x, state))
            })
            .sum()
    }

    pub fn mass_matrix(&self, state: &LocalState) -> LocalMatrix {
        self.integrate_matrix(&[&self.kinetic], state)
    }

    pub fn stiffness_matrix(&self, state: &LocalState) -> LocalMatrix {
        self.integrate_matrix(&[&self.potential, &self.body_force], state)
    }

    pub fn force(&self, state: &LocalState) -> LocalVector {
        self.integrate_vector(&[&self.potential, &self.body_force], state)
    }

    pub fn contribution(&self, state: &LocalState) -> ElementContribution {
        ElementContribution {
            mass: self.mass_matrix(state),
            stiffness: self.stiffness_matrix(state),
            force: self.force(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy_models::*;
    use crate::energy_models::test_utils::*;
    use approx::assert_relative_eq;

    #[test]
    fn composed_terms() {
        let tet = test_tets().remove(1);
        let volume = tet.volume();
        let element = Element::new(
            tet,
            KineticNonLumped::new(1000.0),
            LinearElasticity::new(2e5, 0.45),
            Gravity::new(1000.0, [0.0, -9.8, 0.0]),
        );
        let state = random_state(7, 0.01);
        let contrib = element.contribution(&state);

        // Gravity acts on the total mass.
        let fy: f64 = (0..4).map(|a| element.force(&LocalState::default())[3 * a + 1]).sum();
        assert_relative_eq!(fy, -9.8 * 1000.0 * volume, max_relative = 1e-12);

        // Stiffness is symmetric negative semi-definite and linear in q.
        assert_relative_eq!(contrib.stiffness, contrib.stiffness.transpose(), epsilon = 1e-6);
        let elastic = contrib.force - element.force(&LocalState::default());
        assert_relative_eq!(elastic, contrib.stiffness * state.q, epsilon = 1e-6);
        assert!(state.q.dot(&(contrib.stiffness * state.q)) <= 0.0);
    }

    #[test]
    fn none_terms_contribute_nothing() {
        let tet = test_tets().remove(0);
        let element = Element::new(tet, KineticNone, PotentialNone, BodyForceNone);
        let state = random_state(1, 0.1);
        assert_eq!(element.energy(&state), 0.0);
        assert_eq!(element.mass_matrix(&state), LocalMatrix::zeros());
        assert_eq!(element.force(&state), LocalVector::zeros());
    }
}
