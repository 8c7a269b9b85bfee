//! Link payload types: roles, packet types, buttons, Control and State payloads.

use core::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::parser::DecodeError;

/// Role of a unit on the link. Fixed per build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceRole {
    /// Left-hand remote; initiates pairing and configuration.
    PrimaryRemote,
    /// Right-hand remote; follows the primary's configuration.
    SecondaryRemote,
    Droid,
}

impl DeviceRole {
    pub(crate) const fn to_bits(self) -> u8 {
        match self {
            Self::PrimaryRemote => 0,
            Self::SecondaryRemote => 1,
            Self::Droid => 2,
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::PrimaryRemote),
            1 => Some(Self::SecondaryRemote),
            2 => Some(Self::Droid),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::PrimaryRemote | Self::SecondaryRemote)
    }
}

/// Stream an envelope belongs to. Each stream has its own sequence counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    Control,
    State,
    Config,
}

impl PacketType {
    pub(crate) const fn to_bits(self) -> u8 {
        match self {
            Self::Control => 0,
            Self::State => 1,
            Self::Config => 2,
        }
    }

    pub(crate) const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Control),
            1 => Some(Self::State),
            2 => Some(Self::Config),
            _ => None,
        }
    }
}

/// Remote button state as a bitfield.
///
/// # Example
///
/// ```
/// use remote_proto::Buttons;
///
/// let buttons = Buttons::B1 | Buttons::CONFIRM;
/// assert!(buttons.contains(Buttons::CONFIRM));
/// assert!(!buttons.contains(Buttons::JOY));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u8);

impl Buttons {
    pub const B1: Self = Self(1 << 0);
    pub const B2: Self = Self(1 << 1);
    pub const B3: Self = Self(1 << 2);
    pub const B4: Self = Self(1 << 3);
    pub const JOY: Self = Self(1 << 4); // stick press
    pub const CONFIRM: Self = Self(1 << 5);
    pub const LEFT: Self = Self(1 << 6);
    pub const RIGHT: Self = Self(1 << 7);

    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn contains(self, button: Buttons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// True if any of the given buttons is pressed.
    #[inline]
    #[must_use]
    pub const fn intersects(self, buttons: Buttons) -> bool {
        (self.0 & buttons.0) != 0
    }

    #[inline]
    pub fn set(&mut self, button: Buttons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Buttons pressed in `self` but not in `previous`.
    #[inline]
    #[must_use]
    pub const fn pressed_since(self, previous: Buttons) -> Buttons {
        Self(self.0 & !previous.0)
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// A single physical button, used where a setting binds one button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    B1,
    B2,
    B3,
    B4,
    Joy,
    Confirm,
    Left,
    Right,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Self::B1,
        Self::B2,
        Self::B3,
        Self::B4,
        Self::Joy,
        Self::Confirm,
        Self::Left,
        Self::Right,
    ];

    #[must_use]
    pub const fn mask(self) -> Buttons {
        Buttons(1 << self as u8)
    }

    /// Wire encoding of an optional binding: 0 = none, 1..=8 = button.
    #[must_use]
    pub const fn encode_binding(binding: Option<Button>) -> u8 {
        match binding {
            None => 0,
            Some(b) => b as u8 + 1,
        }
    }

    /// Inverse of [`Button::encode_binding`].
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidField`] for values above 8.
    pub fn decode_binding(value: u8) -> Result<Option<Button>, DecodeError> {
        match value {
            0 => Ok(None),
            1..=8 => Ok(Some(Self::ALL[(value - 1) as usize])),
            _ => Err(DecodeError::InvalidField),
        }
    }
}

/// Stick position after calibration and dead band, range -32767..=32767.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stick {
    pub h: i16,
    pub v: i16,
}

impl Stick {
    pub const CENTER: Self = Self { h: 0, v: 0 };

    #[must_use]
    pub const fn new(h: i16, v: i16) -> Self {
        Self { h, v }
    }

    #[must_use]
    pub const fn is_centered(self) -> bool {
        self.h == 0 && self.v == 0
    }
}

/// Snapshot of a remote's inputs, streamed to the droid and the peer remote.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlPayload {
    /// The sender currently holds primary authority over the droid.
    pub primary: bool,
    /// The sender's incremental-rotation button is held.
    pub incremental_rotation: bool,
    pub buttons: Buttons,
    pub stick: Stick,
    /// IMU attitude in centidegrees.
    pub pitch: i16,
    pub roll: i16,
    pub heading: i16,
    pub pot1: u8,
    pub pot2: u8,
    /// Battery charge, 0..=255.
    pub battery: u8,
}

impl ControlPayload {
    /// Encoded size in bytes.
    pub const SIZE: usize = 15;

    const FLAG_PRIMARY: u8 = 1 << 0;
    const FLAG_INCR_ROT: u8 = 1 << 1;

    pub(crate) fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.primary {
            flags |= Self::FLAG_PRIMARY;
        }
        if self.incremental_rotation {
            flags |= Self::FLAG_INCR_ROT;
        }
        flags
    }

    pub(crate) fn apply_flags(&mut self, flags: u8) {
        self.primary = flags & Self::FLAG_PRIMARY != 0;
        self.incremental_rotation = flags & Self::FLAG_INCR_ROT != 0;
    }
}

/// Droid state report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatePayload {
    pub battery: u8,
    pub drive_mode: u8,
    /// Ground speed in mm/s.
    pub speed: i16,
    pub pitch: i16,
    pub roll: i16,
    pub heading: i16,
}

impl StatePayload {
    pub const SIZE: usize = 10;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_bits_roundtrip() {
        for role in [
            DeviceRole::PrimaryRemote,
            DeviceRole::SecondaryRemote,
            DeviceRole::Droid,
        ] {
            assert_eq!(DeviceRole::from_bits(role.to_bits()), Some(role));
        }
        assert_eq!(DeviceRole::from_bits(3), None);
    }

    #[test]
    fn test_packet_type_rejects_reserved() {
        assert_eq!(PacketType::from_bits(3), None);
    }

    #[test]
    fn test_button_mask_matches_constants() {
        assert_eq!(Button::B4.mask(), Buttons::B4);
        assert_eq!(Button::Confirm.mask(), Buttons::CONFIRM);
        assert_eq!(Button::Right.mask(), Buttons::RIGHT);
    }

    #[test]
    fn test_binding_encoding() {
        assert_eq!(Button::encode_binding(None), 0);
        assert_eq!(Button::encode_binding(Some(Button::B1)), 1);
        assert_eq!(Button::decode_binding(4), Ok(Some(Button::B4)));
        assert_eq!(Button::decode_binding(0), Ok(None));
        assert!(Button::decode_binding(9).is_err());
    }

    #[test]
    fn test_pressed_since_reports_edges_only() {
        let before = Buttons::B1;
        let now = Buttons::B1 | Buttons::B3;
        assert_eq!(now.pressed_since(before), Buttons::B3);
        assert!(before.pressed_since(now).is_empty());
    }

    #[test]
    fn test_control_flags() {
        let mut payload = ControlPayload {
            primary: true,
            ..ControlPayload::default()
        };
        assert_eq!(payload.flags(), 0b01);
        payload.apply_flags(0b10);
        assert!(!payload.primary);
        assert!(payload.incremental_rotation);
    }
}
