//! Config stream messages: requests, replies and the shared remote settings.

use core::fmt;

use crate::address::HardwareAddress;
use crate::parser::DecodeError;
use crate::types::Button;

/// Token a `FactoryReset` or `Calibrate` request must carry to be honored.
pub const CONFIG_MAGIC: u64 = 0xBADE_AFFE_DEAD_BEEF;

pub const MAX_LED_BRIGHTNESS: u8 = 7;
pub const MAX_SEND_REPEATS: u8 = 7;
pub const MAX_DEADBAND_PERCENT: u8 = 15;

/// Settings shared by both remotes.
///
/// The primary owns these; every change is pushed to the secondary with a
/// `SetRemoteParams` request before it is committed locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemoteConfig {
    pub left_is_primary: bool,
    /// 0..=7
    pub led_brightness: u8,
    /// Extra copies of every control envelope sent to the droid, 0..=7.
    pub send_repeats: u8,
    /// 0..=15
    pub deadband_percent: u8,
    pub left_incr_rotation: Option<Button>,
    pub right_incr_rotation: Option<Button>,
    pub left_incr_translation: Option<Button>,
    pub right_incr_translation: Option<Button>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            left_is_primary: true,
            led_brightness: MAX_LED_BRIGHTNESS,
            send_repeats: 3,
            deadband_percent: 8,
            left_incr_rotation: Some(Button::B4),
            right_incr_rotation: Some(Button::B4),
            left_incr_translation: None,
            right_incr_translation: None,
        }
    }
}

impl RemoteConfig {
    /// Packed size in bytes.
    pub const SIZE: usize = 6;

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut b0 = u8::from(self.left_is_primary);
        b0 |= (self.led_brightness.min(MAX_LED_BRIGHTNESS)) << 1;
        b0 |= (self.send_repeats.min(MAX_SEND_REPEATS)) << 4;
        [
            b0,
            self.deadband_percent.min(MAX_DEADBAND_PERCENT),
            Button::encode_binding(self.left_incr_rotation),
            Button::encode_binding(self.right_incr_rotation),
            Button::encode_binding(self.left_incr_translation),
            Button::encode_binding(self.right_incr_translation),
        ]
    }

    /// # Errors
    ///
    /// [`DecodeError::InvalidField`] on a set reserved bit, an out-of-range
    /// dead band or an unknown button binding.
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Result<Self, DecodeError> {
        if bytes[0] & 0x80 != 0 || bytes[1] > MAX_DEADBAND_PERCENT {
            return Err(DecodeError::InvalidField);
        }
        Ok(Self {
            left_is_primary: bytes[0] & 0x01 != 0,
            led_brightness: (bytes[0] >> 1) & 0x07,
            send_repeats: (bytes[0] >> 4) & 0x07,
            deadband_percent: bytes[1],
            left_incr_rotation: Button::decode_binding(bytes[2])?,
            right_incr_rotation: Button::decode_binding(bytes[3])?,
            left_incr_translation: Button::decode_binding(bytes[4])?,
            right_incr_translation: Button::decode_binding(bytes[5])?,
        })
    }
}

/// Request kinds on the config stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigKind {
    SetPeerRemoteAddress = 1,
    SetDroidAddress = 2,
    SetRemoteParams = 3,
    FactoryReset = 4,
    Calibrate = 5,
}

impl ConfigKind {
    pub(crate) fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            1 => Ok(Self::SetPeerRemoteAddress),
            2 => Ok(Self::SetDroidAddress),
            3 => Ok(Self::SetRemoteParams),
            4 => Ok(Self::FactoryReset),
            5 => Ok(Self::Calibrate),
            _ => Err(DecodeError::UnknownKind),
        }
    }
}

/// A config request and its kind-specific body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigRequest {
    /// Bind the receiver back to the sender. The address must equal the
    /// envelope's source.
    SetPeerRemoteAddress(HardwareAddress),
    SetDroidAddress(HardwareAddress),
    SetRemoteParams(RemoteConfig),
    FactoryReset { magic: u64 },
    Calibrate { magic: u64 },
}

impl ConfigRequest {
    #[must_use]
    pub const fn kind(&self) -> ConfigKind {
        match self {
            Self::SetPeerRemoteAddress(_) => ConfigKind::SetPeerRemoteAddress,
            Self::SetDroidAddress(_) => ConfigKind::SetDroidAddress,
            Self::SetRemoteParams(_) => ConfigKind::SetRemoteParams,
            Self::FactoryReset { .. } => ConfigKind::FactoryReset,
            Self::Calibrate { .. } => ConfigKind::Calibrate,
        }
    }

    #[must_use]
    pub const fn factory_reset() -> Self {
        Self::FactoryReset {
            magic: CONFIG_MAGIC,
        }
    }

    #[must_use]
    pub const fn calibrate() -> Self {
        Self::Calibrate {
            magic: CONFIG_MAGIC,
        }
    }
}

/// Why a receiver refused a config request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RejectReason {
    /// `SetPeerRemoteAddress` payload differs from the envelope source.
    AddressMismatch,
    BadMagic,
    /// A peer is bound and the request came from someone else.
    UnknownSender,
    UnsupportedRequest,
    StorageFailure,
    /// This unit's role does not accept the request.
    NotPermitted,
    Other(u8),
}

impl RejectReason {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::AddressMismatch => 1,
            Self::BadMagic => 2,
            Self::UnknownSender => 3,
            Self::UnsupportedRequest => 4,
            Self::StorageFailure => 5,
            Self::NotPermitted => 6,
            Self::Other(code) => code,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::AddressMismatch,
            2 => Self::BadMagic,
            3 => Self::UnknownSender,
            4 => Self::UnsupportedRequest,
            5 => Self::StorageFailure,
            6 => Self::NotPermitted,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressMismatch => write!(f, "address mismatch"),
            Self::BadMagic => write!(f, "bad magic"),
            Self::UnknownSender => write!(f, "unknown sender"),
            Self::UnsupportedRequest => write!(f, "unsupported request"),
            Self::StorageFailure => write!(f, "storage failure"),
            Self::NotPermitted => write!(f, "not permitted"),
            Self::Other(code) => write!(f, "error {code}"),
        }
    }
}

/// Outcome carried on the reply leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyCode {
    Ok,
    Error(RejectReason),
}

impl ReplyCode {
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error(reason) => reason.code(),
        }
    }

    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Ok,
            code => Self::Error(RejectReason::from_code(code)),
        }
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<Result<(), RejectReason>> for ReplyCode {
    fn from(result: Result<(), RejectReason>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(reason) => Self::Error(reason),
        }
    }
}

/// Payload of a Config envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigMessage {
    Request(ConfigRequest),
    Reply { kind: ConfigKind, code: ReplyCode },
}

impl ConfigMessage {
    /// Request size: kind byte plus an 8-byte body.
    pub const REQUEST_SIZE: usize = 9;
    /// Reply size: kind byte plus the reply code.
    pub const REPLY_SIZE: usize = 2;
    /// Set on the kind byte of replies.
    pub(crate) const REPLY_FLAG: u8 = 0x80;

    #[must_use]
    pub const fn kind(&self) -> ConfigKind {
        match self {
            Self::Request(req) => req.kind(),
            Self::Reply { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        match self {
            Self::Request(_) => Self::REQUEST_SIZE,
            Self::Reply { .. } => Self::REPLY_SIZE,
        }
    }

    /// Reply to this message's kind.
    #[must_use]
    pub const fn reply(kind: ConfigKind, code: ReplyCode) -> Self {
        Self::Reply { kind, code }
    }
}
