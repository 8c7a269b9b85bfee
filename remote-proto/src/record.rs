//! Persisted remote parameters and their fixed-size record layout.
//!
//! The record carries no version field. A record of a different size is
//! rejected by the store and replaced with [`RemoteParams::default`].

use crate::address::HardwareAddress;
use crate::config::RemoteConfig;
use crate::parser::{DecodeError, Reader};

/// Full-scale reading of the 12-bit stick ADC.
pub const AXIS_FULL_SCALE: u16 = 4095;

/// Calibration of one stick axis in raw ADC counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisCalib {
    pub min: u16,
    pub center: u16,
    pub max: u16,
}

impl Default for AxisCalib {
    fn default() -> Self {
        Self {
            min: 0,
            center: AXIS_FULL_SCALE / 2 + 1,
            max: AXIS_FULL_SCALE,
        }
    }
}

impl AxisCalib {
    pub const SIZE: usize = 6;

    /// Map a raw reading onto -32767..=32767 around `center`, zeroing
    /// everything inside `deadband_percent` of full deflection.
    #[must_use]
    pub fn normalize(&self, raw: u16, deadband_percent: u8) -> i16 {
        if self.min > self.max {
            return 0;
        }
        let raw = i32::from(raw.clamp(self.min, self.max));
        let center = i32::from(self.center);
        let span = if raw >= center {
            i32::from(self.max) - center
        } else {
            center - i32::from(self.min)
        };
        if span <= 0 {
            return 0;
        }

        let value = (raw - center) * 32767 / span;
        let deadband = 32767 * i32::from(deadband_percent) / 100;
        if value.abs() <= deadband {
            return 0;
        }
        // Rescale so output starts at zero at the edge of the dead band.
        let scaled = (value.abs() - deadband) * 32767 / (32767 - deadband);
        (scaled * value.signum()) as i16
    }
}

/// Everything a remote persists: bindings, shared settings, calibration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteParams {
    pub droid_address: HardwareAddress,
    pub peer_address: HardwareAddress,
    pub config: RemoteConfig,
    pub h_calib: AxisCalib,
    pub v_calib: AxisCalib,
}

/// Size of the persisted record in bytes.
pub const PARAMS_RECORD_SIZE: usize =
    2 * HardwareAddress::SIZE + RemoteConfig::SIZE + 2 * AxisCalib::SIZE;

impl RemoteParams {
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PARAMS_RECORD_SIZE] {
        let mut out = [0u8; PARAMS_RECORD_SIZE];
        out[0..8].copy_from_slice(&self.droid_address.to_u64().to_le_bytes());
        out[8..16].copy_from_slice(&self.peer_address.to_u64().to_le_bytes());
        out[16..22].copy_from_slice(&self.config.to_bytes());
        let mut pos = 22;
        for calib in [&self.h_calib, &self.v_calib] {
            for value in [calib.min, calib.center, calib.max] {
                out[pos..pos + 2].copy_from_slice(&value.to_le_bytes());
                pos += 2;
            }
        }
        out
    }

    /// # Errors
    ///
    /// [`DecodeError::Length`] if `bytes` is not exactly one record, or a
    /// field error from [`RemoteConfig::from_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != PARAMS_RECORD_SIZE {
            return Err(DecodeError::Length);
        }
        let mut r = Reader::new(bytes);
        let droid_address = HardwareAddress::from_u64(r.u64_le()?);
        let peer_address = HardwareAddress::from_u64(r.u64_le()?);
        let config = RemoteConfig::from_bytes(&r.array::<{ RemoteConfig::SIZE }>()?)?;
        let h_calib = read_calib(&mut r)?;
        let v_calib = read_calib(&mut r)?;
        Ok(Self {
            droid_address,
            peer_address,
            config,
            h_calib,
            v_calib,
        })
    }
}

fn read_calib(r: &mut Reader<'_>) -> Result<AxisCalib, DecodeError> {
    Ok(AxisCalib {
        min: r.u16_le()?,
        center: r.u16_le()?,
        max: r.u16_le()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Button;

    #[test]
    fn test_record_size() {
        assert_eq!(PARAMS_RECORD_SIZE, 34);
    }

    #[test]
    fn test_record_layout() {
        let params = RemoteParams {
            droid_address: HardwareAddress::from_u64(0x1122_3344_5566_7788),
            peer_address: HardwareAddress::UNBOUND,
            config: RemoteConfig {
                right_incr_rotation: Some(Button::B2),
                ..RemoteConfig::default()
            },
            h_calib: AxisCalib {
                min: 50,
                center: 2048,
                max: 4090,
            },
            v_calib: AxisCalib::default(),
        };
        let bytes = params.to_bytes();
        assert_eq!(&bytes[0..8], &[0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(&bytes[8..16], &[0; 8]);
        assert_eq!(&bytes[22..24], &50u16.to_le_bytes());
        assert_eq!(RemoteParams::from_bytes(&bytes), Ok(params));
    }

    #[test]
    fn test_record_rejects_other_sizes() {
        let bytes = RemoteParams::default().to_bytes();
        assert_eq!(
            RemoteParams::from_bytes(&bytes[..PARAMS_RECORD_SIZE - 1]),
            Err(DecodeError::Length)
        );
    }

    #[test]
    fn test_normalize_endpoints() {
        let calib = AxisCalib {
            min: 100,
            center: 2000,
            max: 4000,
        };
        assert_eq!(calib.normalize(2000, 0), 0);
        assert_eq!(calib.normalize(4000, 0), 32767);
        assert_eq!(calib.normalize(100, 0), -32767);
        // Readings outside the calibrated range saturate.
        assert_eq!(calib.normalize(4095, 0), 32767);
        assert_eq!(calib.normalize(0, 0), -32767);
    }

    #[test]
    fn test_normalize_deadband() {
        let calib = AxisCalib {
            min: 0,
            center: 2000,
            max: 4000,
        };
        // 5% deflection inside an 8% dead band.
        assert_eq!(calib.normalize(2100, 8), 0);
        assert_eq!(calib.normalize(1900, 8), 0);
        assert_eq!(calib.normalize(4000, 8), 32767);
        assert!(calib.normalize(2400, 8) > 0);
        assert!(calib.normalize(1600, 8) < 0);
    }

    #[test]
    fn test_normalize_degenerate_calibration() {
        let calib = AxisCalib {
            min: 2000,
            center: 2000,
            max: 2000,
        };
        assert_eq!(calib.normalize(3000, 0), 0);
    }
}
