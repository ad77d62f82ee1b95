//! The partition registry.
//!
//! The registry is sealed exactly once with a validated table during early initialization.
//! Afterwards it is read-only, so consumers may query it concurrently without locking.
use crate::{
    arch::PhysAddr,
    config::VmLoadOrder,
    mem::{RegionDescriptor, RegionKind, VmSlot},
    validate::ValidatedTable,
};
use hyperdrive::once::Once;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Partition registry is already sealed")]
    AlreadySealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
/// Outcomes of a registry query that did not find anything.
///
/// `NotConfigured` and `Unowned` are legitimate answers, not faults.
pub enum QueryError {
    #[error("Partition registry is not sealed yet")]
    NotSealed,
    #[error("VM{slot} has no {kind} memory region")]
    NotConfigured { slot: VmSlot, kind: RegionKind },
    #[error("Address {addr} is not reserved for any VM")]
    Unowned { addr: PhysAddr },
}

/// Write-once store of the validated partition table.
pub struct PartitionRegistry<const N: usize> {
    table: Once<ValidatedTable<N>>,
}

impl<const N: usize> Default for PartitionRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PartitionRegistry<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table: Once::uninit(),
        }
    }

    /// Seals the registry with a validated table.
    ///
    /// Fails if the registry was already sealed, whatever the table.
    pub fn seal(&self, table: ValidatedTable<N>) -> Result<&ValidatedTable<N>, RegistryError> {
        self.table
            .try_init(table)
            .map_err(|_| RegistryError::AlreadySealed)
    }

    #[must_use]
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.table.is_initialized()
    }

    #[inline]
    pub fn table(&self) -> Result<&ValidatedTable<N>, QueryError> {
        self.table.get().ok_or(QueryError::NotSealed)
    }

    /// The primary or secondary region of a VM slot.
    pub fn region_for(&self, slot: VmSlot, kind: RegionKind) -> Result<RegionDescriptor, QueryError> {
        self.table()?
            .region_for(slot, kind)
            .copied()
            .ok_or(QueryError::NotConfigured { slot, kind })
    }

    /// The VM slot whose reservation contains `addr`.
    pub fn owner_of(&self, addr: PhysAddr) -> Result<VmSlot, QueryError> {
        self.table()?
            .owner_of(addr)
            .ok_or(QueryError::Unowned { addr })
    }

    pub fn load_order(&self, slot: VmSlot) -> Result<VmLoadOrder, QueryError> {
        Ok(self.table()?.load_order(slot))
    }
}
