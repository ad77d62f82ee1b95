use crate::arch::PhysAddr;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Represents a range of physical addresses.
///
/// It is guaranteed that the range is valid, i.e. start <= end.
/// The end is inclusive so that a range can reach the very top of the address space.
pub struct MemoryRange {
    /// The start address of the range.
    start: u64,
    /// The end (inclusive) address of the range.
    end: u64,
}

impl MemoryRange {
    #[must_use]
    #[inline]
    pub const fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "Invalid range");
        Self { start, end }
    }

    #[must_use]
    #[inline]
    /// Creates the range covering `size` bytes from `start`.
    ///
    /// Returns `None` for empty ranges and ranges wrapping around the address space.
    pub const fn from_size(start: u64, size: u64) -> Option<Self> {
        if size == 0 {
            return None;
        }
        match start.checked_add(size - 1) {
            Some(end) => Some(Self { start, end }),
            None => None,
        }
    }

    #[must_use]
    #[inline]
    /// Returns the intersection of both ranges, if any.
    pub const fn overlaps(&self, other: &Self) -> Option<Self> {
        if self.start > other.end || self.end < other.start {
            None
        } else {
            Some(Self {
                start: if self.start > other.start {
                    self.start
                } else {
                    other.start
                },
                end: if self.end < other.end {
                    self.end
                } else {
                    other.end
                },
            })
        }
    }

    #[must_use]
    #[inline]
    /// Returns true if the range is inside the other range.
    pub const fn is_inside(&self, other: &Self) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    #[must_use]
    #[inline]
    pub const fn contains_addr(&self, addr: PhysAddr) -> bool {
        self.start <= addr.as_u64() && addr.as_u64() <= self.end
    }

    #[must_use]
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    #[inline]
    pub const fn end(&self) -> u64 {
        self.end
    }
}

impl core::fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{:#x}, {:#x}]", self.start, self.end)
    }
}
