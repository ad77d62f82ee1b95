//! Abstraction of host physical addresses.
use core::fmt;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
/// A host physical address.
///
/// Only the low 52 bits are usable, as per the x86-64 physical address width.
pub struct PhysAddr(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u64)]
/// Power-of-two alignments used for physical memory reservations.
pub enum Alignment {
    /// Base page.
    Align4K = 0x1000,
}

impl Alignment {
    #[must_use]
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self as u64
    }

    #[must_use]
    #[inline]
    pub const fn mask(self) -> u64 {
        self.as_u64() - 1
    }

    #[must_use]
    #[inline]
    /// Returns true if `value` is a multiple of the alignment.
    pub const fn is_aligned(self, value: u64) -> bool {
        value & self.mask() == 0
    }
}

impl PhysAddr {
    pub const MAX: Self = Self(0x000F_FFFF_FFFF_FFFF);
    pub const ZERO: Self = Self(0);

    #[must_use]
    #[track_caller]
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self::try_new(addr).expect("Invalid physical address")
    }

    #[must_use]
    #[inline]
    pub const fn try_new(addr: u64) -> Option<Self> {
        if addr & !Self::MAX.0 != 0 {
            return None;
        }
        Some(Self(addr))
    }

    #[must_use]
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    #[inline]
    /// Adds `offset`, returning `None` if the result is not a valid physical address.
    pub const fn checked_add(self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Self::try_new(addr),
            None => None,
        }
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p() {
        let addr = PhysAddr::new(0x1_2000_0000);
        assert_eq!(addr.as_u64(), 0x1_2000_0000);
        assert_eq!(PhysAddr::try_new(0x10_0000_0000_0000), None);
    }

    #[test]
    #[should_panic = "Invalid physical address"]
    fn test_p_reject() {
        let _ = PhysAddr::new(0x1234_5678_90AB_CDEF);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(Alignment::Align4K.mask(), 0xFFF);
        assert!(Alignment::Align4K.is_aligned(0x2000_0000));
        assert!(!Alignment::Align4K.is_aligned(0x10));
    }

    #[test]
    fn test_p_checked_add() {
        let addr = PhysAddr::new(0x1_0000_0000);
        assert_eq!(addr.checked_add(0x2000_0000), Some(PhysAddr::new(0x1_2000_0000)));
        assert_eq!(PhysAddr::MAX.checked_add(1), None);
        assert_eq!(addr.checked_add(u64::MAX), None);
    }

    #[test]
    fn test_p_display() {
        assert_eq!(format!("{}", PhysAddr::new(0x1000)), "0x1000");
        assert_eq!(format!("{:#x}", PhysAddr::new(0x1000)), "0x1000");
    }
}
