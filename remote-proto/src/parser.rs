//! Envelope parsing.
//!
//! Decoding is strict: the CRC must match, reserved header bits must be
//! clear, and the frame must be exactly the length its type implies.

use crate::address::HardwareAddress;
use crate::config::{ConfigKind, ConfigMessage, ConfigRequest, RemoteConfig, ReplyCode};
use crate::crc::calculate_crc8;
use crate::envelope::{Envelope, Payload};
use crate::types::{Buttons, ControlPayload, DeviceRole, PacketType, StatePayload, Stick};

/// Error type for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Frame shorter or longer than its type requires.
    Length,
    Checksum,
    /// Reserved packet type or role bits.
    InvalidHeader,
    /// Unknown config request kind.
    UnknownKind,
    /// A field holds a value outside its range.
    InvalidField,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Length => write!(f, "bad length"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::UnknownKind => write!(f, "unknown config kind"),
            Self::InvalidField => write!(f, "invalid field"),
        }
    }
}

/// Bounds-checked cursor over a byte slice.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end).ok_or(DecodeError::Length)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn i16_le(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64_le(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

pub(crate) fn decode_envelope(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let (&crc, frame) = bytes.split_last().ok_or(DecodeError::Length)?;
    let (&header, body) = frame.split_first().ok_or(DecodeError::Length)?;

    if calculate_crc8(frame) != crc {
        return Err(DecodeError::Checksum);
    }
    if header & 0x10 != 0 {
        return Err(DecodeError::InvalidHeader);
    }
    let packet_type = PacketType::from_bits(header & 0x03).ok_or(DecodeError::InvalidHeader)?;
    let source = DeviceRole::from_bits((header >> 2) & 0x03).ok_or(DecodeError::InvalidHeader)?;
    let seq = header >> 5;

    let payload = match packet_type {
        PacketType::Control => Payload::Control(read_control(exact(body, ControlPayload::SIZE)?)?),
        PacketType::State => Payload::State(read_state(exact(body, StatePayload::SIZE)?)?),
        PacketType::Config => Payload::Config(read_config(body)?),
    };

    Ok(Envelope {
        source,
        seq,
        payload,
    })
}

fn exact(body: &[u8], len: usize) -> Result<&[u8], DecodeError> {
    if body.len() == len {
        Ok(body)
    } else {
        Err(DecodeError::Length)
    }
}

fn read_control(body: &[u8]) -> Result<ControlPayload, DecodeError> {
    let mut r = Reader::new(body);
    let flags = r.u8()?;
    if flags & !0x03 != 0 {
        return Err(DecodeError::InvalidField);
    }
    let mut payload = ControlPayload {
        buttons: Buttons(r.u8()?),
        stick: Stick::new(r.i16_le()?, r.i16_le()?),
        pitch: r.i16_le()?,
        roll: r.i16_le()?,
        heading: r.i16_le()?,
        pot1: r.u8()?,
        pot2: r.u8()?,
        battery: r.u8()?,
        ..ControlPayload::default()
    };
    payload.apply_flags(flags);
    Ok(payload)
}

fn read_state(body: &[u8]) -> Result<StatePayload, DecodeError> {
    let mut r = Reader::new(body);
    Ok(StatePayload {
        battery: r.u8()?,
        drive_mode: r.u8()?,
        speed: r.i16_le()?,
        pitch: r.i16_le()?,
        roll: r.i16_le()?,
        heading: r.i16_le()?,
    })
}

fn read_config(body: &[u8]) -> Result<ConfigMessage, DecodeError> {
    let (&kind_byte, rest) = body.split_first().ok_or(DecodeError::Length)?;
    let kind = ConfigKind::from_u8(kind_byte & !ConfigMessage::REPLY_FLAG)?;

    if kind_byte & ConfigMessage::REPLY_FLAG != 0 {
        let code = exact(rest, ConfigMessage::REPLY_SIZE - 1)?[0];
        return Ok(ConfigMessage::Reply {
            kind,
            code: ReplyCode::from_u8(code),
        });
    }

    let mut r = Reader::new(exact(rest, ConfigMessage::REQUEST_SIZE - 1)?);
    let body: [u8; 8] = r.array()?;
    let request = match kind {
        ConfigKind::SetPeerRemoteAddress => {
            ConfigRequest::SetPeerRemoteAddress(HardwareAddress::from_be_bytes(body))
        }
        ConfigKind::SetDroidAddress => {
            ConfigRequest::SetDroidAddress(HardwareAddress::from_be_bytes(body))
        }
        ConfigKind::SetRemoteParams => {
            if body[6..] != [0, 0] {
                return Err(DecodeError::InvalidField);
            }
            let mut packed = [0u8; RemoteConfig::SIZE];
            packed.copy_from_slice(&body[..RemoteConfig::SIZE]);
            ConfigRequest::SetRemoteParams(RemoteConfig::from_bytes(&packed)?)
        }
        ConfigKind::FactoryReset => ConfigRequest::FactoryReset {
            magic: u64::from_le_bytes(body),
        },
        ConfigKind::Calibrate => ConfigRequest::Calibrate {
            magic: u64::from_le_bytes(body),
        },
    };
    Ok(ConfigMessage::Request(request))
}
