//! Parameter store: reserved, checksummed blocks in one flash sector.
//!
//! # Layout
//!
//! Blocks are laid out in reservation order. Each slot is
//!
//! ```text
//! [magic u32][tag hash u32][size u16][0xFFFF][data; size][crc32 u32]  (padded to 4)
//! ```
//!
//! A block is valid only if magic, tag hash, size and CRC-32 all match, so a
//! block whose size changed between firmware versions reads as invalid.
//! The whole sector is mirrored in RAM and rewritten on every block write.

use core::fmt;

use crc::{Crc, CRC_32_ISO_HDLC};
use heapless::Vec;

/// Size of the flash region backing the store (one erase sector).
pub const REGION_SIZE: usize = 4096;

/// Most blocks that can be reserved.
pub const MAX_BLOCKS: usize = 4;

const BLOCK_MAGIC: u32 = 0x3142_5052; // "RPB1"
const HEADER_SIZE: usize = 12;
const CRC_SIZE: usize = 4;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Error type for parameter store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Region or block table full.
    NoSpace,
    /// Handle was not returned by `reserve` on this store.
    InvalidHandle,
    /// Buffer length differs from the reserved block size.
    SizeMismatch,
    /// Block content fails validation.
    InvalidBlock,
    /// Flash driver error.
    Flash,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpace => write!(f, "no space"),
            Self::InvalidHandle => write!(f, "invalid handle"),
            Self::SizeMismatch => write!(f, "size mismatch"),
            Self::InvalidBlock => write!(f, "invalid block"),
            Self::Flash => write!(f, "flash error"),
        }
    }
}

/// Handle to a reserved block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockHandle(u8);

/// Durable storage of fixed-size parameter blocks.
pub trait ParamStore {
    /// Reserve a block of `size` bytes under `tag`.
    ///
    /// Reserving the same tag again returns the same handle.
    fn reserve(&mut self, tag: &str, size: usize) -> Result<BlockHandle, StoreError>;

    /// Check whether the block holds valid data of the reserved size.
    fn is_valid(&self, handle: BlockHandle) -> bool;

    /// Read a valid block into `buf` (exactly the reserved size).
    fn read(&self, handle: BlockHandle, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Write `data` (exactly the reserved size) and make it durable.
    fn write(&mut self, handle: BlockHandle, data: &[u8]) -> Result<(), StoreError>;

    /// Wipe every block.
    fn factory_reset(&mut self) -> Result<(), StoreError>;
}

/// Raw access to the flash region backing a [`FlashParamStore`].
///
/// Offsets are relative to the start of the region.
pub trait FlashRegion {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Erase the whole region to 0xFF.
    fn erase(&mut self) -> Result<(), StoreError>;

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: usize,
    size: usize,
    tag_hash: u32,
}

impl Slot {
    fn data_range(&self) -> core::ops::Range<usize> {
        let start = self.offset + HEADER_SIZE;
        start..start + self.size
    }

    fn len(&self) -> usize {
        (HEADER_SIZE + self.size + CRC_SIZE + 3) & !3
    }
}

/// [`ParamStore`] on a single flash sector.
pub struct FlashParamStore<F> {
    flash: F,
    mirror: [u8; REGION_SIZE],
    slots: Vec<Slot, MAX_BLOCKS>,
    next_offset: usize,
}

impl<F: FlashRegion> FlashParamStore<F> {
    /// Load the region into RAM.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Flash`] if the region cannot be read.
    pub fn new(mut flash: F) -> Result<Self, StoreError> {
        let mut mirror = [0xFF; REGION_SIZE];
        flash.read(0, &mut mirror)?;
        Ok(Self {
            flash,
            mirror,
            slots: Vec::new(),
            next_offset: 0,
        })
    }

    /// Give back the flash driver.
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn slot(&self, handle: BlockHandle) -> Result<Slot, StoreError> {
        self.slots
            .get(handle.0 as usize)
            .copied()
            .ok_or(StoreError::InvalidHandle)
    }

    fn le_u32(&self, at: usize) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.mirror[at..at + 4]);
        u32::from_le_bytes(b)
    }

    fn slot_is_valid(&self, slot: &Slot) -> bool {
        let at = slot.offset;
        let size = u16::from_le_bytes([self.mirror[at + 8], self.mirror[at + 9]]) as usize;
        if self.le_u32(at) != BLOCK_MAGIC || self.le_u32(at + 4) != slot.tag_hash || size != slot.size
        {
            return false;
        }
        let data = &self.mirror[slot.data_range()];
        CRC32.checksum(data) == self.le_u32(slot.data_range().end)
    }
}

impl<F: FlashRegion> ParamStore for FlashParamStore<F> {
    fn reserve(&mut self, tag: &str, size: usize) -> Result<BlockHandle, StoreError> {
        let tag_hash = CRC32.checksum(tag.as_bytes());
        if let Some(index) = self.slots.iter().position(|s| s.tag_hash == tag_hash) {
            if self.slots[index].size != size {
                return Err(StoreError::SizeMismatch);
            }
            return Ok(BlockHandle(index as u8));
        }

        let slot = Slot {
            offset: self.next_offset,
            size,
            tag_hash,
        };
        if size > u16::MAX as usize || slot.offset + slot.len() > REGION_SIZE {
            return Err(StoreError::NoSpace);
        }
        let index = self.slots.len();
        self.slots.push(slot).map_err(|_| StoreError::NoSpace)?;
        self.next_offset += slot.len();
        debug!("reserved block {} ({} bytes) at {}", tag, size, slot.offset);
        Ok(BlockHandle(index as u8))
    }

    fn is_valid(&self, handle: BlockHandle) -> bool {
        self.slot(handle).is_ok_and(|slot| self.slot_is_valid(&slot))
    }

    fn read(&self, handle: BlockHandle, buf: &mut [u8]) -> Result<(), StoreError> {
        let slot = self.slot(handle)?;
        if buf.len() != slot.size {
            return Err(StoreError::SizeMismatch);
        }
        if !self.slot_is_valid(&slot) {
            return Err(StoreError::InvalidBlock);
        }
        buf.copy_from_slice(&self.mirror[slot.data_range()]);
        Ok(())
    }

    fn write(&mut self, handle: BlockHandle, data: &[u8]) -> Result<(), StoreError> {
        let slot = self.slot(handle)?;
        if data.len() != slot.size {
            return Err(StoreError::SizeMismatch);
        }

        let at = slot.offset;
        self.mirror[at..at + 4].copy_from_slice(&BLOCK_MAGIC.to_le_bytes());
        self.mirror[at + 4..at + 8].copy_from_slice(&slot.tag_hash.to_le_bytes());
        self.mirror[at + 8..at + 10].copy_from_slice(&(slot.size as u16).to_le_bytes());
        self.mirror[at + 10..at + 12].copy_from_slice(&[0xFF, 0xFF]);
        let range = slot.data_range();
        self.mirror[range.clone()].copy_from_slice(data);
        let crc = CRC32.checksum(data);
        self.mirror[range.end..range.end + CRC_SIZE].copy_from_slice(&crc.to_le_bytes());

        self.flash.erase()?;
        self.flash.write(0, &self.mirror)
    }

    fn factory_reset(&mut self) -> Result<(), StoreError> {
        self.mirror.fill(0xFF);
        self.flash.erase()
    }
}

/// RAM-backed [`FlashRegion`], for hosted builds and tests.
pub struct MemoryFlash {
    data: [u8; REGION_SIZE],
    erase_count: u32,
}

impl MemoryFlash {
    /// Erased region.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: [0xFF; REGION_SIZE],
            erase_count: 0,
        }
    }

    #[must_use]
    pub fn contents(&self) -> &[u8; REGION_SIZE] {
        &self.data
    }

    #[must_use]
    pub fn erase_count(&self) -> u32 {
        self.erase_count
    }
}

impl Default for MemoryFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashRegion for MemoryFlash {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StoreError> {
        let start = offset as usize;
        let src = self
            .data
            .get(start..start + buf.len())
            .ok_or(StoreError::Flash)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.data.fill(0xFF);
        self.erase_count += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StoreError> {
        let start = offset as usize;
        let dst = self
            .data
            .get_mut(start..start + data.len())
            .ok_or(StoreError::Flash)?;
        // NOR flash can only clear bits.
        for (d, s) in dst.iter_mut().zip(data) {
            *d &= *s;
        }
        Ok(())
    }
}
