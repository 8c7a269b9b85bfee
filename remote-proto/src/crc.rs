//! CRC-8 trailer of link envelopes.
//!
//! CRC-8/SMBUS over the header and payload bytes, table driven.

use crc::{Crc, CRC_8_SMBUS};

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// CRC-8 of a complete byte slice.
#[inline]
#[must_use]
pub fn calculate_crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

/// Incremental CRC-8, fed while an envelope is written.
pub struct Crc8Digest {
    digest: crc::Digest<'static, u8>,
}

impl Crc8Digest {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            digest: CRC8.digest(),
        }
    }

    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    #[inline]
    #[must_use]
    pub fn finalize(self) -> u8 {
        self.digest.finalize()
    }
}

impl Default for Crc8Digest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc8_check_value() {
        // CRC-8/SMBUS check value.
        assert_eq!(calculate_crc8(b"123456789"), 0xF4);
    }

    #[test]
    fn test_crc8_digest_matches_batch() {
        let data = [0x41, 0x01, 0x00, 0xFF, 0x7F, 0x80];
        let mut digest = Crc8Digest::new();
        digest.update(&data[..2]);
        digest.update(&data[2..]);
        assert_eq!(digest.finalize(), calculate_crc8(&data));
    }
}
