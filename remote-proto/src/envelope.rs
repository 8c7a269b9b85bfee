//! Link envelopes.
//!
//! ```text
//! +--------+------------------+------+
//! | header | payload (fixed)  | crc8 |
//! +--------+------------------+------+
//!
//! header: bits 0-1 packet type, bits 2-3 source role,
//!         bit 4 reserved (0), bits 5-7 sequence number
//! ```
//!
//! The payload length is fixed by the packet type (and for Config by the
//! request/reply flag), so the envelope needs no length field.

use crate::config::ConfigMessage;
use crate::parser::{self, DecodeError};
use crate::serialize::{self, EncodeError};
use crate::types::{ControlPayload, DeviceRole, PacketType, StatePayload};

/// Typed payload of an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    Control(ControlPayload),
    State(StatePayload),
    Config(ConfigMessage),
}

impl Payload {
    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        match self {
            Self::Control(_) => PacketType::Control,
            Self::State(_) => PacketType::State,
            Self::Config(_) => PacketType::Config,
        }
    }

    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        match self {
            Self::Control(_) => ControlPayload::SIZE,
            Self::State(_) => StatePayload::SIZE,
            Self::Config(msg) => msg.encoded_len(),
        }
    }
}

/// One framed unit of radio traffic.
///
/// # Example
///
/// ```
/// use remote_proto::{ControlPayload, DeviceRole, Envelope, Payload, MAX_ENVELOPE_SIZE};
///
/// let env = Envelope::new(
///     DeviceRole::PrimaryRemote,
///     5,
///     Payload::Control(ControlPayload { primary: true, ..ControlPayload::default() }),
/// );
/// let mut buf = [0u8; MAX_ENVELOPE_SIZE];
/// let len = env.encode(&mut buf).unwrap();
/// assert_eq!(Envelope::decode(&buf[..len]), Ok(env));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Envelope {
    pub source: DeviceRole,
    /// 0..=7
    pub seq: u8,
    pub payload: Payload,
}

impl Envelope {
    /// Header plus CRC.
    pub const OVERHEAD: usize = 2;

    #[must_use]
    pub const fn new(source: DeviceRole, seq: u8, payload: Payload) -> Self {
        Self {
            source,
            seq,
            payload,
        }
    }

    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        self.payload.packet_type()
    }

    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        Self::OVERHEAD + self.payload.encoded_len()
    }

    pub(crate) fn header(&self) -> u8 {
        self.packet_type().to_bits() | (self.source.to_bits() << 2) | ((self.seq & 0x07) << 5)
    }

    /// Encode into `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// [`EncodeError::BufferTooSmall`] if `buf` is shorter than
    /// [`Envelope::encoded_len`], [`EncodeError::SequenceOutOfRange`] if
    /// `seq` does not fit in three bits.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        serialize::encode_envelope(self, buf)
    }

    /// Decode one complete envelope.
    ///
    /// # Errors
    ///
    /// See [`DecodeError`].
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        parser::decode_envelope(bytes)
    }
}
