//! Partition table construction.
//!
//! The table is built once from the static configuration. It only checks that the
//! configuration is self-consistent: exclusivity and platform bounds are the job of
//! [`crate::validate`].
use crate::{
    arch::{Alignment, PhysAddr},
    config::{PartitionConfig, VmCounts, VmLoadOrder},
    mem::{RegionDescriptor, RegionKind, VmSlot},
};
use thiserror::Error;

/// Alignment required for both the base and the size of every reservation.
pub const REGION_ALIGNMENT: Alignment = Alignment::Align4K;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
/// Malformed static configuration.
pub enum ConfigurationError {
    #[error("SERVICE_VM_NUM must be 0 or 1, got {0}")]
    InvalidServiceVmNum(usize),
    #[error("VM count mismatch: expected at most {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("VM{slot} has no primary memory region")]
    MissingPrimary { slot: VmSlot },
    #[error("VM{slot} reserves memory but no VM may occupy the slot")]
    UnusedSlot { slot: VmSlot },
    #[error("VM{slot} {kind} region {base:#x}+{size:#x} is not page aligned")]
    Misaligned {
        slot: VmSlot,
        kind: RegionKind,
        base: u64,
        size: u64,
    },
    #[error("VM{slot} {kind} region exceeds the physical address space")]
    AddressOverflow { slot: VmSlot, kind: RegionKind },
    #[error("Partition table is full ({capacity} regions)")]
    CapacityExceeded { capacity: usize },
}

#[derive(Debug, Clone, Copy)]
/// An array-backed table of the host memory reserved for each VM slot.
///
/// `N` is the number of regions the table can hold, see [`crate::config::region_capacity`].
pub struct PartitionTable<const N: usize> {
    /// Regions, in slot order, primary before secondary
    regions: [RegionDescriptor; N],
    /// Number of regions that are currently in use
    used: usize,
    counts: VmCounts,
}

impl<const N: usize> PartitionTable<N> {
    /// Builds the table from the static configuration.
    ///
    /// Every pre-launched VM and the Service VM must have a non-empty primary region.
    /// Post-launched slots may carry a reservation but are not required to. Slots beyond
    /// the configured VMs must not reserve anything.
    pub fn build(config: &PartitionConfig) -> Result<Self, ConfigurationError> {
        let counts = config.counts();
        Self::check_counts(&counts)?;

        if config.vm_memory.len() > counts.max_vm_num {
            return Err(ConfigurationError::CountMismatch {
                expected: counts.max_vm_num,
                actual: config.vm_memory.len(),
            });
        }
        if config.vm_memory.len() < counts.static_vm_num() {
            return Err(ConfigurationError::MissingPrimary {
                slot: config.vm_memory.len(),
            });
        }

        let mut table = Self {
            regions: [RegionDescriptor::EMPTY; N],
            used: 0,
            counts,
        };

        for (slot, mem) in config.vm_memory.iter().enumerate() {
            if mem.size == 0 {
                // Unused slot, but a secondary range cannot stand on its own
                if counts.load_order(slot).is_static() || mem.has_secondary() {
                    return Err(ConfigurationError::MissingPrimary { slot });
                }
                continue;
            }
            if counts.load_order(slot) == VmLoadOrder::Unused {
                return Err(ConfigurationError::UnusedSlot { slot });
            }

            table.push(Self::reservation(
                slot,
                mem.start_hpa,
                mem.size,
                RegionKind::Primary,
            )?)?;

            if mem.has_secondary() {
                table.push(Self::reservation(
                    slot,
                    mem.start_hpa2,
                    mem.size_hpa2,
                    RegionKind::Secondary,
                )?)?;
            }
        }

        Ok(table)
    }

    fn check_counts(counts: &VmCounts) -> Result<(), ConfigurationError> {
        if counts.service_vm_num > 1 {
            return Err(ConfigurationError::InvalidServiceVmNum(
                counts.service_vm_num,
            ));
        }
        // A Service VM excludes post-launched VMs in a partitioned scenario
        if counts.service_vm_num == 1 && counts.max_post_vm_num != 0 {
            return Err(ConfigurationError::CountMismatch {
                expected: 0,
                actual: counts.max_post_vm_num,
            });
        }
        let configured = counts
            .pre_vm_num
            .checked_add(counts.service_vm_num)
            .and_then(|n| n.checked_add(counts.max_post_vm_num))
            .unwrap_or(usize::MAX);
        if configured > counts.max_vm_num {
            return Err(ConfigurationError::CountMismatch {
                expected: counts.max_vm_num,
                actual: configured,
            });
        }
        Ok(())
    }

    fn reservation(
        slot: VmSlot,
        base: u64,
        size: u64,
        kind: RegionKind,
    ) -> Result<RegionDescriptor, ConfigurationError> {
        if !REGION_ALIGNMENT.is_aligned(base) || !REGION_ALIGNMENT.is_aligned(size) {
            return Err(ConfigurationError::Misaligned {
                slot,
                kind,
                base,
                size,
            });
        }

        PhysAddr::try_new(base)
            // The last byte must be addressable
            .filter(|base| size == 0 || base.checked_add(size - 1).is_some())
            .and_then(|base| RegionDescriptor::new(base, size, slot, kind))
            .ok_or(ConfigurationError::AddressOverflow { slot, kind })
    }

    fn push(&mut self, region: RegionDescriptor) -> Result<(), ConfigurationError> {
        let entry = self
            .regions
            .get_mut(self.used)
            .ok_or(ConfigurationError::CapacityExceeded { capacity: N })?;
        *entry = region;
        self.used += 1;
        Ok(())
    }

    #[must_use]
    #[inline]
    pub fn regions(&self) -> &[RegionDescriptor] {
        &self.regions[..self.used]
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.used
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.used == 0
    }

    #[must_use]
    #[inline]
    pub const fn counts(&self) -> VmCounts {
        self.counts
    }

    #[must_use]
    #[inline]
    pub const fn load_order(&self, slot: VmSlot) -> VmLoadOrder {
        self.counts.load_order(slot)
    }

    #[must_use]
    /// The raw entry for a slot, including zero-size secondary entries.
    pub fn region(&self, slot: VmSlot, kind: RegionKind) -> Option<&RegionDescriptor> {
        self.regions()
            .iter()
            .find(|region| region.owner() == slot && region.kind() == kind)
    }

    #[cfg(test)]
    /// Builds a table bypassing the configuration checks.
    pub(crate) fn from_raw(regions: &[RegionDescriptor], counts: VmCounts) -> Self {
        let mut table = Self {
            regions: [RegionDescriptor::EMPTY; N],
            used: 0,
            counts,
        };
        for region in regions {
            table.push(*region).unwrap();
        }
        table
    }
}
