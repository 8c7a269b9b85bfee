//! Loading and persisting [`RemoteParams`].

use remote_proto::{RemoteParams, PARAMS_RECORD_SIZE};

use crate::store::{BlockHandle, ParamStore, StoreError};

/// Store tag of the remote parameter block.
pub const PARAMS_TAG: &str = "remote";

/// How the parameters were obtained at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadOutcome {
    Restored,
    /// Stored block was missing or invalid; defaults were written back.
    Defaulted,
}

/// The reserved parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamsSlot {
    handle: BlockHandle,
}

impl ParamsSlot {
    /// Reserve the block and read it, falling back to defaults.
    ///
    /// An invalid or undecodable block is not an error: defaults are
    /// written back immediately.
    ///
    /// # Errors
    ///
    /// Returns the store error if the block cannot be reserved or written.
    pub fn load<S: ParamStore>(
        store: &mut S,
    ) -> Result<(Self, RemoteParams, LoadOutcome), StoreError> {
        let handle = store.reserve(PARAMS_TAG, PARAMS_RECORD_SIZE)?;
        let slot = Self { handle };

        if store.is_valid(handle) {
            let mut buf = [0u8; PARAMS_RECORD_SIZE];
            store.read(handle, &mut buf)?;
            match RemoteParams::from_bytes(&buf) {
                Ok(params) => return Ok((slot, params, LoadOutcome::Restored)),
                Err(e) => warn!("stored params undecodable: {}", e),
            }
        } else {
            warn!("stored params invalid, writing defaults");
        }

        let params = RemoteParams::default();
        slot.persist(store, &params)?;
        Ok((slot, params, LoadOutcome::Defaulted))
    }

    /// Write `params` through to the store.
    ///
    /// # Errors
    ///
    /// Propagates the store's write error.
    pub fn persist<S: ParamStore>(&self, store: &mut S, params: &RemoteParams) -> Result<(), StoreError> {
        store.write(self.handle, &params.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FlashParamStore, MemoryFlash};
    use remote_proto::HardwareAddress;

    #[test]
    fn test_first_boot_writes_defaults() {
        let mut store = FlashParamStore::new(MemoryFlash::new()).unwrap();
        let (slot, params, outcome) = ParamsSlot::load(&mut store).unwrap();
        assert_eq!(outcome, LoadOutcome::Defaulted);
        assert_eq!(params, RemoteParams::default());
        assert!(store.is_valid(slot.handle));
    }

    #[test]
    fn test_persisted_params_restored() {
        let mut store = FlashParamStore::new(MemoryFlash::new()).unwrap();
        let (slot, mut params, _) = ParamsSlot::load(&mut store).unwrap();
        params.droid_address = HardwareAddress::new(0x11, 0x22);
        slot.persist(&mut store, &params).unwrap();

        let mut store = FlashParamStore::new(store.into_inner()).unwrap();
        let (_, restored, outcome) = ParamsSlot::load(&mut store).unwrap();
        assert_eq!(outcome, LoadOutcome::Restored);
        assert_eq!(restored, params);
    }

    #[test]
    fn test_wiped_store_defaults_again() {
        let mut store = FlashParamStore::new(MemoryFlash::new()).unwrap();
        let (slot, mut params, _) = ParamsSlot::load(&mut store).unwrap();
        params.config.send_repeats = 0;
        slot.persist(&mut store, &params).unwrap();
        store.factory_reset().unwrap();

        let (_, restored, outcome) = ParamsSlot::load(&mut store).unwrap();
        assert_eq!(outcome, LoadOutcome::Defaulted);
        assert_eq!(restored.config.send_repeats, 3);
    }
}
