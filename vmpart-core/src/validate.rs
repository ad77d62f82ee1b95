//! Partition table validation.
//!
//! A table is only trusted once [`validate`] has proven that:
//! - every statically launched VM has its primary region,
//! - no two regions share an address, and regions starting at the same base always collide,
//! - every region lies within the platform's physical memory and outside its reserved ranges.
//!
//! Validation runs once at bring-up. Regions are sorted by base address, so the overlap scan
//! costs O(n log n). The sorted order is kept for address lookups afterwards.
use crate::{
    arch::PhysAddr,
    config::{VmCounts, VmLoadOrder},
    mem::{RegionDescriptor, RegionKind, VmSlot, ranges::MemoryRange},
    platform::PlatformMemory,
    table::PartitionTable,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
/// A partition table that cannot be trusted.
pub enum ValidationError {
    #[error("{a} overlaps {b}")]
    OverlapDetected {
        a: RegionDescriptor,
        b: RegionDescriptor,
    },
    #[error("{region} lies outside physical memory (extent {extent:#x})")]
    OutOfBounds { region: RegionDescriptor, extent: u64 },
    #[error("{region} overlaps reserved range {reserved}")]
    ReservedOverlap {
        region: RegionDescriptor,
        reserved: MemoryRange,
    },
    #[error("Expected {expected} statically launched VMs, found {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// A partition table that passed [`validate`].
///
/// This type can only be obtained through validation and never changes afterwards.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedTable<const N: usize> {
    table: PartitionTable<N>,
    /// Non-empty regions, sorted by base address.
    by_base: [RegionDescriptor; N],
    populated: usize,
}

/// Checks a partition table against the platform's memory.
pub fn validate<const N: usize, P: PlatformMemory + ?Sized>(
    table: PartitionTable<N>,
    platform: &P,
) -> Result<ValidatedTable<N>, ValidationError> {
    check_static_vms(&table)?;

    let len = table.len();
    let mut sorted = [RegionDescriptor::EMPTY; N];
    sorted[..len].copy_from_slice(table.regions());
    // Empty entries come first among equal bases
    sorted[..len].sort_unstable_by_key(|region| (region.base(), region.size()));

    check_overlaps(&sorted[..len])?;

    for region in table.regions() {
        check_bounds(region, platform)?;
    }

    let mut by_base = [RegionDescriptor::EMPTY; N];
    let mut populated = 0;
    for region in sorted[..len].iter().filter(|region| !region.is_empty()) {
        by_base[populated] = *region;
        populated += 1;
    }

    Ok(ValidatedTable {
        table,
        by_base,
        populated,
    })
}

fn check_static_vms<const N: usize>(table: &PartitionTable<N>) -> Result<(), ValidationError> {
    let counts = table.counts();
    let expected = counts.static_vm_num();
    let actual = table
        .regions()
        .iter()
        .filter(|region| {
            region.kind() == RegionKind::Primary
                && !region.is_empty()
                && counts.load_order(region.owner()).is_static()
        })
        .count();

    if actual == expected {
        Ok(())
    } else {
        Err(ValidationError::CountMismatch { expected, actual })
    }
}

/// `sorted` must be ordered by base address.
fn check_overlaps(sorted: &[RegionDescriptor]) -> Result<(), ValidationError> {
    // Non-empty region reaching the highest address so far
    let mut highest: Option<&RegionDescriptor> = None;

    for (i, region) in sorted.iter().enumerate() {
        // Identical bases always collide, whatever the sizes
        if let Some(previous) = i.checked_sub(1).map(|j| &sorted[j])
            && previous.base() == region.base()
        {
            return Err(ValidationError::OverlapDetected {
                a: *previous,
                b: *region,
            });
        }

        if region.is_empty() {
            continue;
        }

        if let Some(highest) = highest.filter(|highest| highest.end() > region.base().as_u64()) {
            return Err(ValidationError::OverlapDetected {
                a: *highest,
                b: *region,
            });
        }

        // No overlap so far and sorted by base, so this region ends last
        highest = Some(region);
    }

    Ok(())
}

fn check_bounds<P: PlatformMemory + ?Sized>(
    region: &RegionDescriptor,
    platform: &P,
) -> Result<(), ValidationError> {
    let Some(range) = region.range() else {
        return Ok(());
    };

    let extent = platform.phys_extent();
    let in_bounds = extent
        .checked_sub(1)
        .is_some_and(|last| range.is_inside(&MemoryRange::new(0, last)));
    if !in_bounds {
        return Err(ValidationError::OutOfBounds {
            region: *region,
            extent,
        });
    }

    if let Some(reserved) = platform
        .reserved()
        .iter()
        .find(|reserved| range.overlaps(reserved).is_some())
    {
        return Err(ValidationError::ReservedOverlap {
            region: *region,
            reserved: *reserved,
        });
    }

    Ok(())
}

impl<const N: usize> ValidatedTable<N> {
    #[must_use]
    #[inline]
    pub const fn table(&self) -> &PartitionTable<N> {
        &self.table
    }

    #[must_use]
    #[inline]
    pub const fn counts(&self) -> VmCounts {
        self.table.counts()
    }

    #[must_use]
    #[inline]
    pub const fn load_order(&self, slot: VmSlot) -> VmLoadOrder {
        self.table.load_order(slot)
    }

    #[must_use]
    #[inline]
    /// Non-empty regions, sorted by base address.
    pub fn regions_by_base(&self) -> &[RegionDescriptor] {
        &self.by_base[..self.populated]
    }

    #[must_use]
    /// The region of a slot, if it is configured and not empty.
    pub fn region_for(&self, slot: VmSlot, kind: RegionKind) -> Option<&RegionDescriptor> {
        self.table
            .region(slot, kind)
            .filter(|region| !region.is_empty())
    }

    /// All non-empty regions of a slot, in address order.
    pub fn regions_of(&self, slot: VmSlot) -> impl Iterator<Item = &RegionDescriptor> {
        self.regions_by_base()
            .iter()
            .filter(move |region| region.owner() == slot)
    }

    #[must_use]
    /// The region containing `addr`, if any.
    pub fn region_containing(&self, addr: PhysAddr) -> Option<&RegionDescriptor> {
        let regions = self.regions_by_base();
        let after = regions.partition_point(|region| region.base() <= addr);
        after
            .checked_sub(1)
            .map(|i| &regions[i])
            .filter(|region| region.contains(addr))
    }

    #[must_use]
    #[inline]
    /// The VM slot owning `addr`, if any.
    pub fn owner_of(&self, addr: PhysAddr) -> Option<VmSlot> {
        self.region_containing(addr).map(RegionDescriptor::owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{PartitionConfig, VmMemoryConfig},
        platform::StaticPlatform,
    };

    const GIB: u64 = 0x4000_0000;
    const PLATFORM: StaticPlatform<'static> = StaticPlatform::new(16 * GIB);

    type Table = PartitionTable<8>;

    fn counts(pre_vm_num: usize) -> VmCounts {
        VmCounts {
            pre_vm_num,
            service_vm_num: 0,
            max_post_vm_num: 0,
            max_vm_num: 4,
        }
    }

    fn build(pre_vm_num: usize, vm_memory: &[VmMemoryConfig]) -> Table {
        Table::build(&PartitionConfig {
            pre_vm_num,
            service_vm_num: 0,
            max_post_vm_num: 4 - pre_vm_num,
            max_vm_num: 4,
            vm_memory,
        })
        .unwrap()
    }

    fn region(owner: VmSlot, base: u64, size: u64) -> RegionDescriptor {
        RegionDescriptor::new(PhysAddr::new(base), size, owner, RegionKind::Primary).unwrap()
    }

    #[test]
    fn test_empty_table() {
        let validated = validate(build(0, &[]), &PLATFORM).unwrap();
        assert!(validated.regions_by_base().is_empty());
        assert_eq!(validated.owner_of(PhysAddr::new(0x1000)), None);
    }

    #[test]
    fn test_disjoint_tables_validate() {
        // Every layout of up to 4 VMs with gaps or adjacency, listed in any slot order
        for vms in 1..=4 {
            for gap in [0, 0x1000, 0x20_0000] {
                for reversed in [false, true] {
                    let mut mem = [VmMemoryConfig::UNUSED; 4];
                    for (i, entry) in mem[..vms].iter_mut().enumerate() {
                        let index = (if reversed { vms - 1 - i } else { i }) as u64;
                        *entry = VmMemoryConfig::new(GIB + index * (0x10_0000 + gap), 0x10_0000);
                    }
                    let validated = validate(build(vms, &mem[..vms]), &PLATFORM).unwrap();
                    assert_eq!(validated.regions_by_base().len(), vms);
                    assert!(
                        validated
                            .regions_by_base()
                            .windows(2)
                            .all(|w| w[0].base() < w[1].base())
                    );
                }
            }
        }
    }

    #[test]
    fn test_intersecting_regions_rejected() {
        let first = (GIB, 0x10_0000);
        for base in [GIB, GIB + 0x1000, GIB + 0xF_F000, GIB - 0x1000] {
            let mem = [
                VmMemoryConfig::new(first.0, first.1),
                VmMemoryConfig::new(base, 0x2000),
            ];
            let err = validate(build(2, &mem), &PLATFORM).unwrap_err();
            let ValidationError::OverlapDetected { a, b } = err else {
                panic!("unexpected error: {err}");
            };
            let mut owners = [a.owner(), b.owner()];
            owners.sort_unstable();
            assert_eq!(owners, [0, 1]);
        }
    }

    #[test]
    fn test_contained_region_rejected() {
        let mem = [
            VmMemoryConfig::new(GIB, 4 * 0x10_0000),
            VmMemoryConfig::new(GIB + 0x10_0000, 0x1000),
            VmMemoryConfig::new(GIB + 0x20_0000, 0x1000),
        ];
        let err = validate(build(3, &mem), &PLATFORM).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OverlapDetected {
                a: region(0, GIB, 4 * 0x10_0000),
                b: region(1, GIB + 0x10_0000, 0x1000),
            }
        );
    }

    #[test]
    fn test_overlap_with_non_adjacent_predecessor() {
        // VM0 spans past VM1 and into VM2
        let table = Table::from_raw(
            &[
                region(0, GIB, 0x10_0000),
                region(1, GIB + 0x1000, 0x1000),
                region(2, GIB + 0x8000, 0x1000),
            ],
            counts(3),
        );
        let err = validate(table, &PLATFORM).unwrap_err();
        assert!(matches!(err, ValidationError::OverlapDetected { a, .. } if a.owner() == 0));
    }

    #[test]
    fn test_degenerate_region_at_same_base() {
        let mem = [
            VmMemoryConfig::new(GIB, 0x10_0000),
            VmMemoryConfig::new(2 * GIB, 0x1000).with_secondary(GIB, 0),
        ];
        let err = validate(build(2, &mem), &PLATFORM).unwrap_err();
        let ValidationError::OverlapDetected { a, b } = err else {
            panic!("unexpected error: {err}");
        };
        assert!(a.is_empty());
        assert_eq!(a.owner(), 1);
        assert_eq!(b, region(0, GIB, 0x10_0000));
    }

    #[test]
    fn test_degenerate_region_elsewhere() {
        let mem = [
            VmMemoryConfig::new(GIB, 0x10_0000),
            VmMemoryConfig::new(2 * GIB, 0x1000).with_secondary(GIB + 0x1000, 0),
        ];
        let validated = validate(build(2, &mem), &PLATFORM).unwrap();
        assert_eq!(validated.regions_by_base().len(), 2);
        assert_eq!(validated.region_for(1, RegionKind::Secondary), None);
    }

    #[test]
    fn test_out_of_bounds() {
        let mem = [VmMemoryConfig::new(16 * GIB - 0x1000, 0x2000)];
        assert_eq!(
            validate(build(1, &mem), &PLATFORM).unwrap_err(),
            ValidationError::OutOfBounds {
                region: region(0, 16 * GIB - 0x1000, 0x2000),
                extent: 16 * GIB,
            }
        );

        // Ending exactly at the extent is fine
        let mem = [VmMemoryConfig::new(16 * GIB - 0x1000, 0x1000)];
        assert!(validate(build(1, &mem), &PLATFORM).is_ok());

        let mem = [VmMemoryConfig::new(0x1000, 0x1000)];
        assert!(matches!(
            validate(build(1, &mem), &StaticPlatform::new(0)),
            Err(ValidationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_reserved_overlap() {
        let reserved = [MemoryRange::new(0x1000_0000, 0x1FFF_FFFF)];
        let platform = StaticPlatform::new(16 * GIB).with_reserved(&reserved);

        let mem = [VmMemoryConfig::new(0x1800_0000, 0x1000_0000)];
        assert_eq!(
            validate(build(1, &mem), &platform).unwrap_err(),
            ValidationError::ReservedOverlap {
                region: region(0, 0x1800_0000, 0x1000_0000),
                reserved: reserved[0],
            }
        );

        let mem = [VmMemoryConfig::new(0x2000_0000, 0x1000_0000)];
        assert!(validate(build(1, &mem), &platform).is_ok());
    }

    #[test]
    fn test_count_mismatch() {
        let table = Table::from_raw(&[region(0, GIB, 0x1000)], counts(2));
        assert_eq!(
            validate(table, &PLATFORM).unwrap_err(),
            ValidationError::CountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_owner_lookup() {
        let mem = [
            VmMemoryConfig::new(GIB, 0x10_0000).with_secondary(3 * GIB, 0x1000),
            VmMemoryConfig::new(2 * GIB, 0x10_0000),
        ];
        let validated = validate(build(2, &mem), &PLATFORM).unwrap();

        assert_eq!(validated.owner_of(PhysAddr::new(GIB)), Some(0));
        assert_eq!(validated.owner_of(PhysAddr::new(GIB + 0xF_FFFF)), Some(0));
        assert_eq!(validated.owner_of(PhysAddr::new(GIB + 0x10_0000)), None);
        assert_eq!(validated.owner_of(PhysAddr::new(2 * GIB + 0x800)), Some(1));
        assert_eq!(validated.owner_of(PhysAddr::new(3 * GIB)), Some(0));
        assert_eq!(validated.owner_of(PhysAddr::new(3 * GIB + 0x1000)), None);
        assert_eq!(validated.owner_of(PhysAddr::ZERO), None);
        assert_eq!(validated.owner_of(PhysAddr::MAX), None);

        let owned: usize = validated.regions_of(0).count();
        assert_eq!(owned, 2);
    }
}
