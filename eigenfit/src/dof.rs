//! Degree of freedom bookkeeping.
//!
//! Each physical system registers the number of scalar generalized coordinates it owns. Once
//! the builder is finalized, every `(system, local dof)` pair maps to a unique and stable index
//! into the global state vector. Indices are contiguous per system.

use std::ops::Range;

use crate::Error;

/// Handle to a physical system registered with a [`DofSystemBuilder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub(crate) usize);

impl SystemId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Incrementally registers systems. Consumed by [`DofSystemBuilder::finalize`], so no systems
/// can be added after the map is sealed.
#[derive(Clone, Debug, Default)]
pub struct DofSystemBuilder {
    sizes: Vec<usize>,
}

impl DofSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system with `num_dofs` scalar coordinates.
    pub fn add_system(&mut self, num_dofs: usize) -> SystemId {
        self.sizes.push(num_dofs);
        SystemId(self.sizes.len() - 1)
    }

    pub fn finalize(self) -> DofMap {
        let mut offsets = Vec::with_capacity(self.sizes.len() + 1);
        offsets.push(0);
        for &size in self.sizes.iter() {
            let last = *offsets.last().unwrap_or(&0);
            offsets.push(last + size);
        }
        DofMap { offsets }
    }
}

/// Immutable mapping from system-local degrees of freedom to global indices.
#[derive(Clone, Debug, PartialEq)]
pub struct DofMap {
    /// Prefix sums of system sizes. Has one more entry than there are systems.
    offsets: Vec<usize>,
}

impl DofMap {
    pub fn num_systems(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn total_dof_count(&self) -> usize {
        *self.offsets.last().unwrap_or(&0)
    }

    pub fn range(&self, system: SystemId) -> Result<Range<usize>, Error> {
        if system.0 >= self.num_systems() {
            return Err(Error::UnknownSystem { id: system.0 });
        }
        Ok(self.offsets[system.0]..self.offsets[system.0 + 1])
    }

    pub fn offset(&self, system: SystemId) -> Result<usize, Error> {
        self.range(system).map(|r| r.start)
    }

    pub fn num_dofs(&self, system: SystemId) -> Result<usize, Error> {
        self.range(system).map(|r| r.len())
    }

    /// Global index of the `local` coordinate of `system`.
    pub fn global_index_of(&self, system: SystemId, local: usize) -> Result<usize, Error> {
        let range = self.range(system)?;
        if local >= range.len() {
            return Err(Error::DofOutOfRange {
                system: system.0,
                local,
            });
        }
        Ok(range.start + local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_per_system() -> Result<(), Error> {
        let mut builder = DofSystemBuilder::new();
        let a = builder.add_system(12);
        let b = builder.add_system(0);
        let c = builder.add_system(6);
        let map = builder.finalize();

        assert_eq!(map.total_dof_count(), 18);
        assert_eq!(map.global_index_of(a, 11)?, 11);
        assert_eq!(map.global_index_of(c, 0)?, 12);
        assert_eq!(map.range(c)?, 12..18);
        assert!(matches!(
            map.global_index_of(b, 0),
            Err(Error::DofOutOfRange { system: 1, local: 0 })
        ));
        assert!(matches!(
            map.global_index_of(SystemId(3), 0),
            Err(Error::UnknownSystem { id: 3 })
        ));
        Ok(())
    }
}
