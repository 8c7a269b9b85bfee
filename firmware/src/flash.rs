//! On-chip flash backing for the parameter store.
//!
//! The store owns the last 4 KiB erase sector of the 2 MiB QSPI flash.
//! `memory.x` shortens the FLASH region by the same amount so the image
//! can never grow into it.

use defmt::error;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::peripherals::FLASH;
use remote_core::{FlashRegion, StoreError, REGION_SIZE};

/// Total flash on the board.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Offset of the parameter sector from the start of flash.
pub const PARAMS_OFFSET: u32 = (FLASH_SIZE - REGION_SIZE) as u32;

/// The parameter sector of the on-chip flash.
///
/// Erase and program stall XIP for their duration; the store only touches
/// flash when a parameter actually changes.
pub struct ParamsFlash<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> ParamsFlash<'d> {
    #[must_use]
    pub fn new(flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>) -> Self {
        Self { flash }
    }

    fn bounds(offset: u32, len: usize) -> Result<u32, StoreError> {
        if offset as usize + len > REGION_SIZE {
            return Err(StoreError::Flash);
        }
        Ok(PARAMS_OFFSET + offset)
    }
}

impl FlashRegion for ParamsFlash<'_> {
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), StoreError> {
        let at = Self::bounds(offset, buf.len())?;
        self.flash.blocking_read(at, buf).map_err(|e| {
            error!("flash read at {:x}: {:?}", at, e);
            StoreError::Flash
        })
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.flash
            .blocking_erase(PARAMS_OFFSET, PARAMS_OFFSET + REGION_SIZE as u32)
            .map_err(|e| {
                error!("flash erase: {:?}", e);
                StoreError::Flash
            })
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StoreError> {
        let at = Self::bounds(offset, data.len())?;
        self.flash.blocking_write(at, data).map_err(|e| {
            error!("flash write at {:x}: {:?}", at, e);
            StoreError::Flash
        })
    }
}
