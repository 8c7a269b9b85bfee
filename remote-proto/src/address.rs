//! 64-bit radio hardware addresses.

use core::fmt;

/// 64-bit hardware address of a radio node, split into two 32-bit halves.
///
/// The all-zero address means "unbound": no peer has been assigned yet.
/// Code that holds an address must check [`HardwareAddress::is_zero`]
/// before treating it as a real node.
///
/// # Example
///
/// ```
/// use remote_proto::HardwareAddress;
///
/// let addr = HardwareAddress::from_u64(0x1122_3344_5566_7788);
/// assert_eq!(addr.hi, 0x1122_3344);
/// assert_eq!(addr.lo, 0x5566_7788);
/// assert!(!addr.is_zero());
/// assert!(HardwareAddress::UNBOUND.is_zero());
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash)]
pub struct HardwareAddress {
    pub hi: u32,
    pub lo: u32,
}

impl HardwareAddress {
    /// The unbound sentinel.
    pub const UNBOUND: Self = Self { hi: 0, lo: 0 };

    /// 802.15.4 broadcast address.
    pub const BROADCAST: Self = Self { hi: 0, lo: 0xFFFF };

    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    #[inline]
    #[must_use]
    pub const fn new(hi: u32, lo: u32) -> Self {
        Self { hi, lo }
    }

    #[inline]
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            hi: (value >> 32) as u32,
            lo: value as u32,
        }
    }

    #[inline]
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        ((self.hi as u64) << 32) | self.lo as u64
    }

    /// True for the unbound sentinel.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        self.hi == Self::BROADCAST.hi && self.lo == Self::BROADCAST.lo
    }

    /// `Some(self)` unless unbound.
    #[inline]
    #[must_use]
    pub const fn bound(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }

    /// Big-endian byte order, high half first (radio byte order).
    #[inline]
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.to_u64().to_be_bytes()
    }

    #[inline]
    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self::from_u64(u64::from_be_bytes(bytes))
    }
}

impl From<u64> for HardwareAddress {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<HardwareAddress> for u64 {
    fn from(addr: HardwareAddress) -> Self {
        addr.to_u64()
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}:{:x}", self.hi, self.lo)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HardwareAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{=u32:x}:{=u32:x}", self.hi, self.lo);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::format;

    #[test]
    fn test_display_matches_console_format() {
        let addr = HardwareAddress::from_u64(0x1122_3344_5566_7788);
        assert_eq!(format!("{addr}"), "0x11223344:55667788");
        assert_eq!(format!("{}", HardwareAddress::new(0x13a200, 0x41f2)), "0x13a200:41f2");
    }

    #[test]
    fn test_bound_filters_sentinel() {
        assert_eq!(HardwareAddress::UNBOUND.bound(), None);
        let addr = HardwareAddress::new(0, 1);
        assert_eq!(addr.bound(), Some(addr));
    }

    #[test]
    fn test_be_bytes_high_half_first() {
        let addr = HardwareAddress::new(0x0013_A200, 0x4155_66AA);
        assert_eq!(
            addr.to_be_bytes(),
            [0x00, 0x13, 0xA2, 0x00, 0x41, 0x55, 0x66, 0xAA]
        );
        assert_eq!(HardwareAddress::from_be_bytes(addr.to_be_bytes()), addr);
    }

    #[test]
    fn test_broadcast_is_not_unbound() {
        assert!(HardwareAddress::BROADCAST.is_broadcast());
        assert!(!HardwareAddress::BROADCAST.is_zero());
    }
}
