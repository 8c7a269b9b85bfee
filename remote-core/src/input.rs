//! Raw input snapshot and idle tracking.

use remote_proto::Buttons;

/// One sample of the remote's physical inputs, before calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawInput {
    /// 12-bit stick ADC readings.
    pub joy_h: u16,
    pub joy_v: u16,
    pub buttons: Buttons,
    /// IMU attitude in centidegrees.
    pub pitch: i16,
    pub roll: i16,
    pub heading: i16,
    pub pot1: u8,
    pub pot2: u8,
    pub battery: u8,
    /// False if the input hardware reported a fault.
    pub healthy: bool,
}

impl Default for RawInput {
    fn default() -> Self {
        Self {
            joy_h: 2048,
            joy_v: 2048,
            buttons: Buttons::NONE,
            pitch: 0,
            roll: 0,
            heading: 0,
            pot1: 0,
            pot2: 0,
            battery: 0,
            healthy: true,
        }
    }
}

/// Stick movement smaller than this (raw counts) does not count as activity.
const ACTIVITY_THRESHOLD: u16 = 64;

/// Tracks when the operator last touched the remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityTracker {
    reference: Option<(u16, u16, Buttons)>,
    last_active_ms: u64,
}

impl ActivityTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reference: None,
            last_active_ms: 0,
        }
    }

    /// Feed a sample; activity is any button change or stick travel beyond
    /// a small threshold since the last active sample.
    pub fn observe(&mut self, input: &RawInput, now_ms: u64) {
        let active = match self.reference {
            None => true,
            Some((h, v, buttons)) => {
                buttons != input.buttons
                    || h.abs_diff(input.joy_h) > ACTIVITY_THRESHOLD
                    || v.abs_diff(input.joy_v) > ACTIVITY_THRESHOLD
            }
        };
        if active {
            self.reference = Some((input.joy_h, input.joy_v, input.buttons));
            self.last_active_ms = now_ms;
        }
    }

    #[must_use]
    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_active_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_jitter_is_idle() {
        let mut tracker = ActivityTracker::new();
        let mut input = RawInput::default();
        tracker.observe(&input, 0);
        input.joy_h += 10;
        tracker.observe(&input, 5_000);
        assert_eq!(tracker.idle_ms(12_000), 12_000);
    }

    #[test]
    fn test_button_press_is_activity() {
        let mut tracker = ActivityTracker::new();
        let mut input = RawInput::default();
        tracker.observe(&input, 0);
        input.buttons = Buttons::B2;
        tracker.observe(&input, 7_000);
        assert_eq!(tracker.idle_ms(8_000), 1_000);
    }

    #[test]
    fn test_slow_drift_accumulates() {
        let mut tracker = ActivityTracker::new();
        let mut input = RawInput::default();
        tracker.observe(&input, 0);
        for step in 1..=3 {
            input.joy_v += 30;
            tracker.observe(&input, step * 1_000);
        }
        // 90 counts from the reference sample.
        assert_eq!(tracker.idle_ms(3_000), 0);
    }
}
