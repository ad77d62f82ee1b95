pub mod ranges;

use crate::arch::PhysAddr;
use core::fmt;
use ranges::MemoryRange;

/// Index of a VM in the static configuration, `0 <= slot < CONFIG_MAX_VM_NUM`.
pub type VmSlot = usize;

/// Which of the (at most) two host memory ranges of a VM a region is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegionKind {
    /// The mandatory range of a statically launched VM (`START_HPA`/`SIZE`).
    Primary,
    /// The optional second range (`START_HPA2`/`SIZE_HPA2`).
    Secondary,
}

impl RegionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One host physical memory reservation owned by a VM slot.
///
/// It is guaranteed that `base + size` does not overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// The physical start address of the region.
    base: PhysAddr,
    /// The length of the region in bytes. Zero means the region is absent.
    size: u64,
    /// The VM slot the region is reserved for.
    owner: VmSlot,
    kind: RegionKind,
}

impl RegionDescriptor {
    /// Placeholder used to fill array-backed storage.
    pub(crate) const EMPTY: Self = Self {
        base: PhysAddr::ZERO,
        size: 0,
        owner: 0,
        kind: RegionKind::Primary,
    };

    #[must_use]
    #[inline]
    /// Create a new region descriptor.
    ///
    /// Returns `None` if `base + size` overflows.
    pub const fn new(base: PhysAddr, size: u64, owner: VmSlot, kind: RegionKind) -> Option<Self> {
        if base.as_u64().checked_add(size).is_none() {
            return None;
        }
        Some(Self {
            base,
            size,
            owner,
            kind,
        })
    }

    #[must_use]
    #[inline]
    pub const fn base(&self) -> PhysAddr {
        self.base
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    #[inline]
    pub const fn owner(&self) -> VmSlot {
        self.owner
    }

    #[must_use]
    #[inline]
    pub const fn kind(&self) -> RegionKind {
        self.kind
    }

    #[must_use]
    #[inline]
    /// The physical end address (exclusive) of the region.
    pub const fn end(&self) -> u64 {
        // Cannot overflow, checked on construction
        self.base.as_u64() + self.size
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[must_use]
    #[inline]
    /// The inclusive address range covered by the region, `None` if it is empty.
    pub const fn range(&self) -> Option<MemoryRange> {
        MemoryRange::from_size(self.base.as_u64(), self.size)
    }

    #[must_use]
    #[inline]
    /// Returns true if `base <= addr < base + size`.
    pub const fn contains(&self, addr: PhysAddr) -> bool {
        match self.range() {
            Some(range) => range.contains_addr(addr),
            None => false,
        }
    }
}

impl fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VM{} {} [{:#x}, {:#x})",
            self.owner,
            self.kind,
            self.base.as_u64(),
            self.end()
        )
    }
}
