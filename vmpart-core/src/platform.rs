//! Platform memory description.
//!
//! The validator does not know the board it runs on. The platform layer tells it how much
//! physical address space exists and which ranges the hypervisor keeps for itself.
use crate::mem::ranges::MemoryRange;

/// Physical memory bounds supplied by the platform description.
pub trait PlatformMemory {
    /// Exclusive upper bound of the addressable physical memory.
    fn phys_extent(&self) -> u64;

    /// Ranges no VM may be given, such as the hypervisor image and its RAM.
    fn reserved(&self) -> &[MemoryRange] {
        &[]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A platform described by constants.
pub struct StaticPlatform<'a> {
    extent: u64,
    reserved: &'a [MemoryRange],
}

impl<'a> StaticPlatform<'a> {
    #[must_use]
    #[inline]
    pub const fn new(extent: u64) -> Self {
        Self {
            extent,
            reserved: &[],
        }
    }

    #[must_use]
    #[inline]
    pub const fn with_reserved(self, reserved: &'a [MemoryRange]) -> Self {
        Self {
            extent: self.extent,
            reserved,
        }
    }
}

impl PlatformMemory for StaticPlatform<'_> {
    fn phys_extent(&self) -> u64 {
        self.extent
    }

    fn reserved(&self) -> &[MemoryRange] {
        self.reserved
    }
}

impl<P: PlatformMemory + ?Sized> PlatformMemory for &P {
    fn phys_extent(&self) -> u64 {
        (**self).phys_extent()
    }

    fn reserved(&self) -> &[MemoryRange] {
        (**self).reserved()
    }
}
