//! Joystick range calibration.
//!
//! While a session is active every stick sample widens the observed range
//! per axis. On finish the range is accepted only if both axes travelled
//! past both thresholds; a rejected session leaves stored calibration alone.

use remote_proto::{AxisCalib, AXIS_FULL_SCALE};

/// An axis must dip below this raw value during calibration.
pub const CALIB_LOW_THRESHOLD: u16 = 800;

/// An axis must rise above this raw value during calibration.
pub const CALIB_HIGH_THRESHOLD: u16 = AXIS_FULL_SCALE + 1 - CALIB_LOW_THRESHOLD;

/// Range observed on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisCapture {
    pub min: u16,
    pub max: u16,
    /// Latest reading; the stick is expected to rest centred when the
    /// operator confirms.
    pub center: u16,
}

impl AxisCapture {
    const fn new() -> Self {
        Self {
            min: u16::MAX,
            max: 0,
            center: AXIS_FULL_SCALE / 2 + 1,
        }
    }

    fn observe(&mut self, raw: u16) {
        self.min = self.min.min(raw);
        self.max = self.max.max(raw);
        self.center = raw;
    }

    #[must_use]
    pub const fn covers_full_range(&self) -> bool {
        self.min < CALIB_LOW_THRESHOLD && self.max > CALIB_HIGH_THRESHOLD
    }

    const fn to_calib(self) -> AxisCalib {
        AxisCalib {
            min: self.min,
            center: self.center,
            max: self.max,
        }
    }
}

/// Result of finishing a calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationOutcome {
    Accepted { h: AxisCalib, v: AxisCalib },
    Rejected { h: AxisCapture, v: AxisCapture },
}

/// An active calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationSession {
    h: AxisCapture,
    v: AxisCapture,
    samples: u32,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            h: AxisCapture::new(),
            v: AxisCapture::new(),
            samples: 0,
        }
    }

    pub fn observe(&mut self, joy_h: u16, joy_v: u16) {
        self.h.observe(joy_h);
        self.v.observe(joy_v);
        self.samples = self.samples.saturating_add(1);
    }

    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    #[must_use]
    pub fn finish(self) -> CalibrationOutcome {
        if self.h.covers_full_range() && self.v.covers_full_range() {
            CalibrationOutcome::Accepted {
                h: self.h.to_calib(),
                v: self.v.to_calib(),
            }
        } else {
            CalibrationOutcome::Rejected {
                h: self.h,
                v: self.v,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sweep_accepted() {
        let mut session = CalibrationSession::new();
        for (h, v) in [(2048, 2048), (50, 4090), (4090, 50), (2040, 2055)] {
            session.observe(h, v);
        }
        assert_eq!(
            session.finish(),
            CalibrationOutcome::Accepted {
                h: AxisCalib {
                    min: 50,
                    center: 2040,
                    max: 4090
                },
                v: AxisCalib {
                    min: 50,
                    center: 2055,
                    max: 4090
                },
            }
        );
    }

    #[test]
    fn test_partial_sweep_rejected() {
        let mut session = CalibrationSession::new();
        session.observe(1200, 1200);
        session.observe(3000, 3000);
        match session.finish() {
            CalibrationOutcome::Rejected { h, .. } => {
                assert_eq!((h.min, h.max), (1200, 3000));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_one_axis_short_rejects_both() {
        let mut session = CalibrationSession::new();
        session.observe(10, 10);
        session.observe(4095, 3200);
        assert!(matches!(session.finish(), CalibrationOutcome::Rejected { .. }));
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let mut session = CalibrationSession::new();
        session.observe(CALIB_LOW_THRESHOLD, 0);
        session.observe(4095, 4095);
        assert!(matches!(session.finish(), CalibrationOutcome::Rejected { .. }));
        assert_eq!(CALIB_HIGH_THRESHOLD, 3296);
    }

    #[test]
    fn test_no_samples_rejected() {
        assert!(matches!(
            CalibrationSession::new().finish(),
            CalibrationOutcome::Rejected { .. }
        ));
    }
}
