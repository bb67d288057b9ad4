//! Global assembly of mass, stiffness and force from per-element contributions.
//!
//! Elements are split into contiguous chunks, one per worker. Each worker accumulates into its
//! own triplet and force buffers and a single reducer concatenates the buffers. Duplicate
//! triplets are summed when the compressed matrices are built, so the result does not depend
//! on the element order or the number of workers beyond floating point reordering.

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dof::SystemId;
use crate::fem::World;
use crate::matrix::{sparse_from_triplets, MatrixElementTriplet};
use crate::objects::PhysicalSystem;
use crate::{DSMatrix, Error};

/// How element work is distributed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPolicy {
    Sequential,
    /// Split elements across a dedicated thread pool. Zero workers means one per logical CPU.
    Parallel { num_workers: usize },
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        ExecutionPolicy::Parallel { num_workers: 0 }
    }
}

/// A single element of a registered system.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub system: SystemId,
    pub element: usize,
}

/// Global quantities at the current state. `stiffness` is the force Jacobian.
#[derive(Clone, Debug)]
pub struct AssembledSystem {
    pub mass: DSMatrix,
    pub stiffness: DSMatrix,
    pub force: Vec<f64>,
}

/// Borrowed view of one system together with its slice of the global state.
struct SystemPart<'a> {
    system: &'a dyn PhysicalSystem,
    offset: usize,
    q: &'a [f64],
    q_dot: &'a [f64],
}

/// Per worker accumulation buffers.
struct Buffer {
    mass: Vec<MatrixElementTriplet<f64>>,
    stiffness: Vec<MatrixElementTriplet<f64>>,
    force: Vec<f64>,
}

impl Buffer {
    fn new(n: usize) -> Self {
        Buffer {
            mass: Vec::new(),
            stiffness: Vec::new(),
            force: vec![0.0; n],
        }
    }
}

pub struct Assembler {
    policy: ExecutionPolicy,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembler")
            .field("policy", &self.policy)
            .field("num_workers", &self.num_workers())
            .finish()
    }
}

impl Assembler {
    pub fn new(policy: ExecutionPolicy) -> Result<Self, Error> {
        let pool = match policy {
            ExecutionPolicy::Sequential => None,
            ExecutionPolicy::Parallel { num_workers } => {
                let num_threads = if num_workers == 0 {
                    num_cpus::get()
                } else {
                    num_workers
                };
                Some(
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(num_threads)
                        .build()?,
                )
            }
        };
        Ok(Assembler { policy, pool })
    }

    #[inline]
    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    pub fn num_workers(&self) -> usize {
        self.pool
            .as_ref()
            .map(|pool| pool.current_num_threads())
            .unwrap_or(1)
    }

    /// Assemble every element of every system in the world at the current state.
    pub fn assemble(&self, world: &World) -> Result<AssembledSystem, Error> {
        self.assemble_items(world, &world.work_items())
    }

    /// Assemble the given elements in the given order.
    pub fn assemble_items(
        &self,
        world: &World,
        items: &[WorkItem],
    ) -> Result<AssembledSystem, Error> {
        let dof_map = world.dof_map();
        let parts = (0..dof_map.num_systems())
            .map(|i| {
                let id = SystemId(i);
                let range = dof_map.range(id)?;
                Ok(SystemPart {
                    system: world.system(id)?,
                    offset: range.start,
                    q: &world.q()[range.clone()],
                    q_dot: &world.q_dot()[range],
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let items = items
            .iter()
            .map(|item| {
                let part = parts
                    .get(item.system.index())
                    .ok_or(Error::UnknownSystem {
                        id: item.system.index(),
                    })?;
                if item.element >= part.system.num_elements() {
                    return Err(Error::InvalidParameter {
                        name: format!("element {}", item.element),
                    });
                }
                Ok((item.system.index(), item.element))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(self.assemble_parts(dof_map.total_dof_count(), &parts, &items))
    }

    /// Assemble a single system on its own. `q` and `q_dot` are the coordinates of this system.
    pub fn assemble_system(
        &self,
        system: &dyn PhysicalSystem,
        q: &[f64],
        q_dot: &[f64],
    ) -> Result<AssembledSystem, Error> {
        let n = system.num_dofs();
        if q.len() != n || q_dot.len() != n {
            return Err(Error::SizeMismatch);
        }
        let parts = [SystemPart {
            system,
            offset: 0,
            q,
            q_dot,
        }];
        let items: Vec<_> = (0..system.num_elements()).map(|e| (0, e)).collect();
        Ok(self.assemble_parts(n, &parts, &items))
    }

    fn assemble_parts(
        &self,
        n: usize,
        parts: &[SystemPart],
        items: &[(usize, usize)],
    ) -> AssembledSystem {
        let buffers = match self.pool.as_ref() {
            None => vec![accumulate(n, parts, items)],
            Some(pool) => {
                let num_workers = pool.current_num_threads().max(1);
                let chunk_size = ((items.len() + num_workers - 1) / num_workers).max(1);
                pool.install(|| {
                    items
                        .par_chunks(chunk_size)
                        .map(|chunk| accumulate(n, parts, chunk))
                        .collect::<Vec<_>>()
                })
            }
        };

        debug!(
            "Assembled {} elements into {} dofs using {} buffer(s)",
            items.len(),
            n,
            buffers.len()
        );

        // Single reducer.
        let mut mass = Vec::with_capacity(buffers.iter().map(|b| b.mass.len()).sum());
        let mut stiffness = Vec::with_capacity(buffers.iter().map(|b| b.stiffness.len()).sum());
        let mut force = vec![0.0; n];
        for buffer in buffers {
            mass.extend(buffer.mass);
            stiffness.extend(buffer.stiffness);
            for (f, b) in force.iter_mut().zip(buffer.force) {
                *f += b;
            }
        }

        AssembledSystem {
            mass: sparse_from_triplets(n, n, &mass),
            stiffness: sparse_from_triplets(n, n, &stiffness),
            force,
        }
    }
}

fn accumulate(n: usize, parts: &[SystemPart], items: &[(usize, usize)]) -> Buffer {
    let mut buffer = Buffer::new(n);
    for &(part, element) in items {
        let part = &parts[part];
        let offset = part.offset;
        let contribution = part
            .system
            .element_contribution(element, part.q, part.q_dot);
        let dofs = part.system.element_dofs(element);

        for (a, &row) in dofs.iter().enumerate() {
            buffer.force[offset + row] += contribution.force[a];
            for (b, &col) in dofs.iter().enumerate() {
                let m = contribution.mass[(a, b)];
                if m != 0.0 {
                    buffer
                        .mass
                        .push(MatrixElementTriplet::new(offset + row, offset + col, m));
                }
                let k = contribution.stiffness[(a, b)];
                if k != 0.0 {
                    buffer
                        .stiffness
                        .push(MatrixElementTriplet::new(offset + row, offset + col, k));
                }
            }
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::WorldBuilder;
    use crate::matrix::sparse_to_dense;
    use crate::objects::LinearTetSystem;
    use crate::test_utils::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn two_system_world() -> Result<World, Error> {
        let mut builder = WorldBuilder::new();
        builder.add_system(Box::new(LinearTetSystem::with_material(
            make_box_mesh([2, 2, 1], [1.0, 1.0, 0.5])?,
            &SOLID_MATERIAL,
        )?));
        builder.add_system(Box::new(LinearTetSystem::with_material(
            make_one_tet_mesh()?,
            &SOLID_MATERIAL,
        )?));
        let mut world = builder.finalize()?;
        let mut rng = StdRng::seed_from_u64(42);
        for q in world.q_mut().iter_mut() {
            *q = rng.gen_range(-0.01..0.01);
        }
        Ok(world)
    }

    #[test]
    fn independent_of_order_and_workers() -> Result<(), Error> {
        let world = two_system_world()?;
        let reference = Assembler::new(ExecutionPolicy::Sequential)?.assemble(&world)?;
        let mass = sparse_to_dense(&reference.mass);
        let stiffness = sparse_to_dense(&reference.stiffness);

        let mut rng = StdRng::seed_from_u64(7);
        for &num_workers in &[1, 2, 3, 7] {
            let assembler = Assembler::new(ExecutionPolicy::Parallel { num_workers })?;
            let mut items = world.work_items();
            items.shuffle(&mut rng);
            let result = assembler.assemble_items(&world, &items)?;
            assert_relative_eq!(sparse_to_dense(&result.mass), mass, epsilon = 1e-9);
            assert_relative_eq!(
                sparse_to_dense(&result.stiffness),
                stiffness,
                epsilon = 1e-6
            );
            for (a, b) in result.force.iter().zip(reference.force.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn systems_do_not_couple() -> Result<(), Error> {
        let world = two_system_world()?;
        let result = Assembler::new(ExecutionPolicy::Sequential)?.assemble(&world)?;
        let first = world.dof_map().range(SystemId(0))?;
        for (_, (row, col)) in result.stiffness.iter() {
            assert_eq!(first.contains(&row), first.contains(&col));
        }

        // The single tet assembled on its own matches its block in the world.
        let second = world.dof_map().range(SystemId(1))?;
        let alone = Assembler::new(ExecutionPolicy::Sequential)?.assemble_system(
            world.system(SystemId(1))?,
            &world.q()[second.clone()],
            &world.q_dot()[second.clone()],
        )?;
        let full = sparse_to_dense(&result.mass);
        let block = full.view((second.start, second.start), (12, 12));
        assert_relative_eq!(sparse_to_dense(&alone.mass), block.into_owned(), epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn unknown_items_are_rejected() -> Result<(), Error> {
        let world = two_system_world()?;
        let assembler = Assembler::new(ExecutionPolicy::Sequential)?;
        let bad_system = [WorkItem {
            system: SystemId(5),
            element: 0,
        }];
        assert!(matches!(
            assembler.assemble_items(&world, &bad_system),
            Err(Error::UnknownSystem { id: 5 })
        ));
        let bad_element = [WorkItem {
            system: SystemId(1),
            element: 1,
        }];
        assert!(matches!(
            assembler.assemble_items(&world, &bad_element),
            Err(Error::InvalidParameter { .. })
        ));
        Ok(())
    }
}
