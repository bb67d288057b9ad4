use crate::energy::*;
use crate::energy_models::*;
use crate::mesh::TetMesh;
use crate::objects::{Element, ElementContribution, Material};
use crate::shape::{LinearTet, NUM_LOCAL_DOFS};
use crate::Error;

/// A simulated object that can be registered with a `World`.
///
/// Generalized coordinates of a system are the vertex displacements from the rest
/// configuration, three per vertex.
pub trait PhysicalSystem: Send + Sync {
    fn mesh(&self) -> &TetMesh;
    fn num_elements(&self) -> usize;

    fn num_dofs(&self) -> usize {
        3 * self.mesh().num_vertices()
    }

    /// System level indices of the local coordinates of the given element.
    fn element_dofs(&self, element: usize) -> [usize; NUM_LOCAL_DOFS];

    /// Evaluate the local mass, stiffness and force of an element. `q` and `q_dot` are the
    /// coordinates of this system only.
    fn element_contribution(&self, element: usize, q: &[f64], q_dot: &[f64]) -> ElementContribution;

    /// Total energy, kinetic plus negated potential.
    fn energy(&self, q: &[f64], q_dot: &[f64]) -> f64;
}

/// Finite element system with one `Element` per tetrahedron.
#[derive(Clone, Debug)]
pub struct FemSystem<K, P, B> {
    mesh: TetMesh,
    elements: Vec<Element<K, P, B>>,
}

/// Linear elastic tetrahedra with consistent mass under gravity.
pub type LinearTetSystem = FemSystem<KineticNonLumped, LinearElasticity, Gravity>;

impl<K, P, B> FemSystem<K, P, B>
where
    K: KineticEnergy,
    P: PotentialEnergy,
    B: BodyForce,
{
    /// Build a system calling `terms` for each element index to create its energy terms.
    pub fn from_fn(mesh: TetMesh, mut terms: impl FnMut(usize) -> (K, P, B)) -> Result<Self, Error> {
        let elements = mesh
            .tets()
            .iter()
            .enumerate()
            .map(|(i, tet)| {
                let shape = LinearTet::new(i, *tet, mesh.tet_positions(tet))?;
                let (k, p, b) = terms(i);
                Ok(Element::new(shape, k, p, b))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(FemSystem { mesh, elements })
    }

    #[inline]
    pub fn elements(&self) -> &[Element<K, P, B>] {
        &self.elements
    }

    #[inline]
    pub fn element(&self, i: usize) -> &Element<K, P, B> {
        &self.elements[i]
    }

    #[inline]
    pub fn element_mut(&mut self, i: usize) -> &mut Element<K, P, B> {
        &mut self.elements[i]
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element<K, P, B>> {
        self.elements.iter_mut()
    }
}

impl<K, P, B> FemSystem<K, P, B>
where
    K: KineticEnergy + Default,
    P: PotentialEnergy + Default,
    B: BodyForce + Default,
{
    /// Build a system with default energy terms.
    pub fn new(mesh: TetMesh) -> Result<Self, Error> {
        Self::from_fn(mesh, |_| Default::default())
    }
}

impl LinearTetSystem {
    pub fn with_material(mesh: TetMesh, material: &Material) -> Result<Self, Error> {
        let mut system = Self::new(mesh)?;
        system.set_material(material);
        Ok(system)
    }

    /// Apply the material to every element.
    pub fn set_material(&mut self, material: &Material) {
        for element in self.elements.iter_mut() {
            element
                .potential_mut()
                .set_parameters(material.youngs_modulus, material.poisson_ratio);
            element.kinetic_mut().set_density(material.density);
            element.body_force_mut().set_body_force_density(material.density);
            element.body_force_mut().set_gravity(material.gravity);
        }
    }
}

impl<K, P, B> PhysicalSystem for FemSystem<K, P, B>
where
    K: KineticEnergy,
    P: PotentialEnergy,
    B: BodyForce,
{
    #[inline]
    fn mesh(&self) -> &TetMesh {
        &self.mesh
    }

    #[inline]
    fn num_elements(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    fn element_dofs(&self, element: usize) -> [usize; NUM_LOCAL_DOFS] {
        self.elements[element].shape().dof_indices()
    }

    fn element_contribution(&self, element: usize, q: &[f64], q_dot: &[f64]) -> ElementContribution {
        let element = &self.elements[element];
        element.contribution(&element.shape().local_state(q, q_dot))
    }

    fn energy(&self, q: &[f64], q_dot: &[f64]) -> f64 {
        self.elements
            .iter()
            .map(|e| e.energy(&e.shape().local_state(q, q_dot)))
            .sum()
    }
}
