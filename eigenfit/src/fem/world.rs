//! The set of simulated systems and their shared state.

use log::debug;

use crate::dof::{DofMap, DofSystemBuilder, SystemId};
use crate::fem::constraints::{fixed_point_dofs, min_vertices, Projection};
use crate::fem::WorkItem;
use crate::objects::PhysicalSystem;
use crate::Error;

/// Collects systems and constraints before the world is sealed.
#[derive(Default)]
pub struct WorldBuilder {
    dofs: DofSystemBuilder,
    systems: Vec<Box<dyn PhysicalSystem>>,
    fixed_vertices: Vec<(SystemId, Vec<usize>)>,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_system(&mut self, system: Box<dyn PhysicalSystem>) -> SystemId {
        let id = self.dofs.add_system(system.num_dofs());
        self.systems.push(system);
        id
    }

    fn system(&self, id: SystemId) -> Result<&dyn PhysicalSystem, Error> {
        self.systems
            .get(id.index())
            .map(|s| s.as_ref())
            .ok_or(Error::UnknownSystem { id: id.index() })
    }

    /// Fix the vertices of `system` lying within `tolerance` of its minimum along `axis`.
    ///
    /// Returns the number of vertices fixed.
    pub fn fix_displacement_min(
        &mut self,
        system: SystemId,
        axis: usize,
        tolerance: f64,
    ) -> Result<usize, Error> {
        let vertices = min_vertices(self.system(system)?.mesh(), axis, tolerance)?;
        let count = vertices.len();
        self.fixed_vertices.push((system, vertices));
        Ok(count)
    }

    pub fn fix_vertices(&mut self, system: SystemId, vertices: &[usize]) -> Result<(), Error> {
        let num_vertices = self.system(system)?.mesh().num_vertices();
        if let Some(&v) = vertices.iter().find(|&&v| v >= num_vertices) {
            return Err(Error::DofOutOfRange {
                system: system.index(),
                local: 3 * v,
            });
        }
        self.fixed_vertices.push((system, vertices.to_vec()));
        Ok(())
    }

    /// Seal the degrees of freedom and constraints. The state starts at rest.
    pub fn finalize(self) -> Result<World, Error> {
        let dof_map = self.dofs.finalize();
        let mut fixed = Vec::new();
        for (system, vertices) in self.fixed_vertices.iter() {
            fixed.extend(fixed_point_dofs(&dof_map, *system, vertices)?);
        }
        let n = dof_map.total_dof_count();
        let projection = Projection::new(n, fixed)?;
        debug!(
            "World finalized with {} systems, {} dofs and {} constrained dofs",
            self.systems.len(),
            n,
            projection.fixed_dofs().len()
        );
        Ok(World {
            dof_map,
            systems: self.systems,
            projection,
            q: vec![0.0; n],
            q_dot: vec![0.0; n],
        })
    }
}

/// Registered systems with their degrees of freedom, constraints and state.
///
/// Positions `q` are displacements from the rest configuration.
pub struct World {
    dof_map: DofMap,
    systems: Vec<Box<dyn PhysicalSystem>>,
    projection: Projection,
    q: Vec<f64>,
    q_dot: Vec<f64>,
}

impl World {
    #[inline]
    pub fn dof_map(&self) -> &DofMap {
        &self.dof_map
    }

    #[inline]
    pub fn num_systems(&self) -> usize {
        self.systems.len()
    }

    pub fn system(&self, id: SystemId) -> Result<&dyn PhysicalSystem, Error> {
        self.systems
            .get(id.index())
            .map(|s| s.as_ref())
            .ok_or(Error::UnknownSystem { id: id.index() })
    }

    /// Every element of every system in registration order.
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.systems
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                (0..s.num_elements()).map(move |element| WorkItem {
                    system: SystemId(i),
                    element,
                })
            })
            .collect()
    }

    #[inline]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    #[inline]
    pub fn constrained_dofs(&self) -> &[usize] {
        self.projection.fixed_dofs()
    }

    #[inline]
    pub fn q(&self) -> &[f64] {
        &self.q
    }

    #[inline]
    pub fn q_dot(&self) -> &[f64] {
        &self.q_dot
    }

    #[inline]
    pub fn q_mut(&mut self) -> &mut [f64] {
        &mut self.q
    }

    #[inline]
    pub fn q_dot_mut(&mut self) -> &mut [f64] {
        &mut self.q_dot
    }

    /// Coordinates of a single system.
    pub fn system_q(&self, id: SystemId) -> Result<&[f64], Error> {
        Ok(&self.q[self.dof_map.range(id)?])
    }

    pub fn system_q_dot(&self, id: SystemId) -> Result<&[f64], Error> {
        Ok(&self.q_dot[self.dof_map.range(id)?])
    }

    /// Replace the whole state.
    pub fn set_state(&mut self, q: Vec<f64>, q_dot: Vec<f64>) -> Result<(), Error> {
        let n = self.dof_map.total_dof_count();
        if q.len() != n || q_dot.len() != n {
            return Err(Error::SizeMismatch);
        }
        self.q = q;
        self.q_dot = q_dot;
        Ok(())
    }

    /// Deformed position of a vertex of the given system.
    pub fn vertex_position(&self, id: SystemId, vertex: usize) -> Result<[f64; 3], Error> {
        let system = self.system(id)?;
        let rest = system
            .mesh()
            .vertex_positions()
            .get(vertex)
            .ok_or(Error::DofOutOfRange {
                system: id.index(),
                local: 3 * vertex,
            })?;
        let q = self.system_q(id)?;
        Ok([
            rest.x + q[3 * vertex],
            rest.y + q[3 * vertex + 1],
            rest.z + q[3 * vertex + 2],
        ])
    }

    /// Total energy, kinetic plus negated potential, summed over all systems.
    pub fn energy(&self) -> Result<f64, Error> {
        let mut energy = 0.0;
        for (i, system) in self.systems.iter().enumerate() {
            let range = self.dof_map.range(SystemId(i))?;
            energy += system.energy(&self.q[range.clone()], &self.q_dot[range]);
        }
        Ok(energy)
    }
}
