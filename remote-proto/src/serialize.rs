//! Envelope serialization.
//!
//! Multi-byte integers are little-endian, addresses big-endian (radio order).

use crate::config::{ConfigMessage, ConfigRequest};
use crate::crc::Crc8Digest;
use crate::envelope::{Envelope, Payload};
use crate::types::{ControlPayload, StatePayload};

/// Largest encoded envelope (a Control envelope).
pub const MAX_ENVELOPE_SIZE: usize = Envelope::OVERHEAD + ControlPayload::SIZE;

/// Error type for serialization operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The output buffer is too small to hold the envelope.
    BufferTooSmall,
    /// Sequence number does not fit the 3-bit header field.
    SequenceOutOfRange,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::SequenceOutOfRange => write!(f, "sequence out of range"),
        }
    }
}

/// Writes into the output buffer while accumulating the CRC-8 trailer.
struct SerializeBuf<'a> {
    buf: &'a mut [u8],
    pos: usize,
    crc: Crc8Digest,
}

impl<'a> SerializeBuf<'a> {
    #[inline]
    fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            crc: Crc8Digest::new(),
        }
    }

    #[inline]
    fn write_slice(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.crc.update(bytes);
        self.pos += bytes.len();
    }

    #[inline]
    fn write_u8(&mut self, value: u8) {
        self.write_slice(&[value]);
    }

    #[inline]
    fn write_i16(&mut self, value: i16) {
        self.write_slice(&value.to_le_bytes());
    }

    /// Append the CRC-8 and return the total length.
    #[inline]
    fn finalize(self) -> usize {
        let checksum = self.crc.finalize();
        self.buf[self.pos] = checksum;
        self.pos + 1
    }
}

pub(crate) fn encode_envelope(env: &Envelope, buf: &mut [u8]) -> Result<usize, EncodeError> {
    if env.seq > 7 {
        return Err(EncodeError::SequenceOutOfRange);
    }
    if buf.len() < env.encoded_len() {
        return Err(EncodeError::BufferTooSmall);
    }

    let mut sb = SerializeBuf::new(buf);
    sb.write_u8(env.header());

    match &env.payload {
        Payload::Control(c) => write_control(&mut sb, c),
        Payload::State(s) => write_state(&mut sb, s),
        Payload::Config(m) => write_config(&mut sb, m),
    }

    Ok(sb.finalize())
}

fn write_control(sb: &mut SerializeBuf<'_>, c: &ControlPayload) {
    sb.write_u8(c.flags());
    sb.write_u8(c.buttons.raw());
    sb.write_i16(c.stick.h);
    sb.write_i16(c.stick.v);
    sb.write_i16(c.pitch);
    sb.write_i16(c.roll);
    sb.write_i16(c.heading);
    sb.write_u8(c.pot1);
    sb.write_u8(c.pot2);
    sb.write_u8(c.battery);
}

fn write_state(sb: &mut SerializeBuf<'_>, s: &StatePayload) {
    sb.write_u8(s.battery);
    sb.write_u8(s.drive_mode);
    sb.write_i16(s.speed);
    sb.write_i16(s.pitch);
    sb.write_i16(s.roll);
    sb.write_i16(s.heading);
}

fn write_config(sb: &mut SerializeBuf<'_>, msg: &ConfigMessage) {
    match msg {
        ConfigMessage::Request(req) => {
            sb.write_u8(req.kind() as u8);
            let mut body = [0u8; 8];
            match req {
                ConfigRequest::SetPeerRemoteAddress(addr) | ConfigRequest::SetDroidAddress(addr) => {
                    body = addr.to_be_bytes();
                }
                ConfigRequest::SetRemoteParams(config) => {
                    body[..6].copy_from_slice(&config.to_bytes());
                }
                ConfigRequest::FactoryReset { magic } | ConfigRequest::Calibrate { magic } => {
                    body = magic.to_le_bytes();
                }
            }
            sb.write_slice(&body);
        }
        ConfigMessage::Reply { kind, code } => {
            sb.write_u8(*kind as u8 | ConfigMessage::REPLY_FLAG);
            sb.write_u8(code.to_u8());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::HardwareAddress;
    use crate::config::{ConfigKind, ReplyCode};
    use crate::crc::calculate_crc8;
    use crate::types::{Buttons, DeviceRole, Stick};

    #[test]
    fn test_header_bits() {
        let env = Envelope::new(
            DeviceRole::SecondaryRemote,
            6,
            Payload::State(StatePayload::default()),
        );
        let mut buf = [0u8; MAX_ENVELOPE_SIZE];
        env.encode(&mut buf).unwrap();
        // type 1, role 1 << 2, seq 6 << 5
        assert_eq!(buf[0], 0b1100_0101);
    }

    #[test]
    fn test_control_layout() {
        let env = Envelope::new(
            DeviceRole::PrimaryRemote,
            0,
            Payload::Control(ControlPayload {
                primary: true,
                incremental_rotation: false,
                buttons: Buttons::B1 | Buttons::CONFIRM,
                stick: Stick::new(-2, 300),
                pitch: 1,
                roll: -1,
                heading: 18000,
                pot1: 10,
                pot2: 20,
                battery: 200,
            }),
        );
        let mut buf = [0u8; MAX_ENVELOPE_SIZE];
        let len = env.encode(&mut buf).unwrap();
        assert_eq!(len, 17);
        assert_eq!(
            &buf[..16],
            &[
                0x00, 0x01, 0x21, 0xFE, 0xFF, 0x2C, 0x01, 0x01, 0x00, 0xFF, 0xFF, 0x50, 0x46,
                10, 20, 200
            ]
        );
        assert_eq!(buf[16], calculate_crc8(&buf[..16]));
    }

    #[test]
    fn test_config_request_layout() {
        let env = Envelope::new(
            DeviceRole::PrimaryRemote,
            2,
            Payload::Config(ConfigMessage::Request(ConfigRequest::SetDroidAddress(
                HardwareAddress::from_u64(0x1122_3344_5566_7788),
            ))),
        );
        let mut buf = [0u8; MAX_ENVELOPE_SIZE];
        let len = env.encode(&mut buf).unwrap();
        assert_eq!(len, 11);
        assert_eq!(buf[1], ConfigKind::SetDroidAddress as u8);
        assert_eq!(&buf[2..10], &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
    }

    #[test]
    fn test_config_reply_layout() {
        let env = Envelope::new(
            DeviceRole::SecondaryRemote,
            0,
            Payload::Config(ConfigMessage::reply(ConfigKind::Calibrate, ReplyCode::Ok)),
        );
        let mut buf = [0u8; MAX_ENVELOPE_SIZE];
        let len = env.encode(&mut buf).unwrap();
        assert_eq!(len, 4);
        assert_eq!(buf[1], 0x85);
        assert_eq!(buf[2], 0);
    }

    #[test]
    fn test_buffer_too_small() {
        let env = Envelope::new(
            DeviceRole::PrimaryRemote,
            0,
            Payload::Control(ControlPayload::default()),
        );
        let mut buf = [0u8; 16];
        assert_eq!(env.encode(&mut buf), Err(EncodeError::BufferTooSmall));
    }

    #[test]
    fn test_sequence_out_of_range() {
        let env = Envelope::new(
            DeviceRole::PrimaryRemote,
            8,
            Payload::State(StatePayload::default()),
        );
        let mut buf = [0u8; MAX_ENVELOPE_SIZE];
        assert_eq!(env.encode(&mut buf), Err(EncodeError::SequenceOutOfRange));
    }
}
