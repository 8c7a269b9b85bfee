//! API frame payloads and their encoders.
//!
//! A frame on the wire is
//!
//! ```text
//! [0x7E][len hi][len lo][api id][frame data ...][checksum]
//! ```
//!
//! where `len` covers the API id and frame data, and the checksum is
//! `0xFF - (sum of api id and frame data)`.

use core::fmt;

use heapless::Vec;
use remote_proto::HardwareAddress;

/// Start delimiter.
pub const START_DELIMITER: u8 = 0x7E;

/// Largest RF payload of an 802.15.4 module.
pub const MAX_RF_DATA: usize = 100;

/// Largest API data (id + frame data) accepted by the parser.
pub const MAX_API_DATA: usize = 128;

/// Largest AT parameter or response value.
pub const MAX_AT_DATA: usize = 64;

/// Start, two length bytes, checksum.
pub const FRAME_OVERHEAD: usize = 4;

pub const API_TX64: u8 = 0x00;
pub const API_AT_COMMAND: u8 = 0x08;
pub const API_RX64: u8 = 0x80;
pub const API_AT_RESPONSE: u8 = 0x88;
pub const API_TX_STATUS: u8 = 0x89;

/// TX option: disable ACK.
pub const TX_OPT_DISABLE_ACK: u8 = 0x01;

/// Error type for frame encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Output buffer too small.
    BufferTooSmall,
    /// Payload or declared length exceeds the limits above.
    TooLong,
    /// Checksum mismatch.
    Checksum,
    /// Frame data shorter than its API id requires.
    Truncated,
    /// Field content invalid (e.g. unterminated node name).
    Malformed,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::TooLong => write!(f, "frame too long"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Truncated => write!(f, "truncated frame"),
            Self::Malformed => write!(f, "malformed frame"),
        }
    }
}

/// Delivery status reported for a TX request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeliveryStatus {
    Success,
    NoAck,
    CcaFailure,
    Purged,
    Other(u8),
}

impl DeliveryStatus {
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::NoAck,
            2 => Self::CcaFailure,
            3 => Self::Purged,
            other => Self::Other(other),
        }
    }
}

/// Status of an AT command response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtStatus {
    Ok,
    Error,
    InvalidCommand,
    InvalidParameter,
    Other(u8),
}

impl AtStatus {
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Error,
            2 => Self::InvalidCommand,
            3 => Self::InvalidParameter,
            other => Self::Other(other),
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// RF data received from a 64-bit source.
    Rx64 {
        source: HardwareAddress,
        /// Signal strength, -dBm.
        rssi: u8,
        options: u8,
        data: Vec<u8, MAX_RF_DATA>,
    },
    TxStatus {
        frame_id: u8,
        status: DeliveryStatus,
    },
    AtResponse {
        frame_id: u8,
        command: [u8; 2],
        status: AtStatus,
        data: Vec<u8, MAX_AT_DATA>,
    },
    /// Valid frame of a type this codec does not decode.
    Unsupported(u8),
}

/// Sum-complement checksum over API data.
#[must_use]
pub fn checksum(api_data: &[u8]) -> u8 {
    0xFF - api_data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Decode API data (id plus frame data) whose checksum was already verified.
///
/// # Errors
///
/// [`FrameError::Truncated`] if the data is too short for its API id,
/// [`FrameError::TooLong`] if a payload exceeds its buffer.
pub fn decode_api_data(api_data: &[u8]) -> Result<Frame, FrameError> {
    let (&api_id, rest) = api_data.split_first().ok_or(FrameError::Truncated)?;
    match api_id {
        API_RX64 => {
            if rest.len() < 10 {
                return Err(FrameError::Truncated);
            }
            let mut addr = [0u8; 8];
            addr.copy_from_slice(&rest[..8]);
            Ok(Frame::Rx64 {
                source: HardwareAddress::from_be_bytes(addr),
                rssi: rest[8],
                options: rest[9],
                data: Vec::from_slice(&rest[10..]).map_err(|()| FrameError::TooLong)?,
            })
        }
        API_TX_STATUS => match rest {
            [frame_id, status, ..] => Ok(Frame::TxStatus {
                frame_id: *frame_id,
                status: DeliveryStatus::from_u8(*status),
            }),
            _ => Err(FrameError::Truncated),
        },
        API_AT_RESPONSE => match rest {
            [frame_id, c0, c1, status, data @ ..] => Ok(Frame::AtResponse {
                frame_id: *frame_id,
                command: [*c0, *c1],
                status: AtStatus::from_u8(*status),
                data: Vec::from_slice(data).map_err(|()| FrameError::TooLong)?,
            }),
            _ => Err(FrameError::Truncated),
        },
        other => Ok(Frame::Unsupported(other)),
    }
}

/// Writes one frame into a caller buffer, accumulating the checksum.
struct FrameWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    sum: u8,
}

impl<'a> FrameWriter<'a> {
    fn new(buf: &'a mut [u8], api_len: usize) -> Result<Self, FrameError> {
        if api_len > MAX_API_DATA {
            return Err(FrameError::TooLong);
        }
        if buf.len() < api_len + FRAME_OVERHEAD {
            return Err(FrameError::BufferTooSmall);
        }
        buf[0] = START_DELIMITER;
        buf[1..3].copy_from_slice(&(api_len as u16).to_be_bytes());
        Ok(Self { buf, pos: 3, sum: 0 })
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        self.sum = bytes.iter().fold(self.sum, |acc, &b| acc.wrapping_add(b));
    }

    fn finish(self) -> usize {
        self.buf[self.pos] = 0xFF - self.sum;
        self.pos + 1
    }
}

/// Encode a TX request to a 64-bit destination. Returns the frame length.
///
/// A `frame_id` of 0 suppresses the TX status response.
///
/// # Errors
///
/// [`FrameError::TooLong`] if `data` exceeds [`MAX_RF_DATA`],
/// [`FrameError::BufferTooSmall`] if `buf` cannot hold the frame.
pub fn encode_tx64(
    frame_id: u8,
    dest: HardwareAddress,
    options: u8,
    data: &[u8],
    buf: &mut [u8],
) -> Result<usize, FrameError> {
    if data.len() > MAX_RF_DATA {
        return Err(FrameError::TooLong);
    }
    let mut w = FrameWriter::new(buf, 11 + data.len())?;
    w.put(&[API_TX64, frame_id]);
    w.put(&dest.to_be_bytes());
    w.put(&[options]);
    w.put(data);
    Ok(w.finish())
}

/// Encode a local AT command, e.g. `ND` or `SH`. Returns the frame length.
///
/// # Errors
///
/// [`FrameError::TooLong`] if `parameter` exceeds [`MAX_AT_DATA`],
/// [`FrameError::BufferTooSmall`] if `buf` cannot hold the frame.
pub fn encode_at_command(
    frame_id: u8,
    command: [u8; 2],
    parameter: &[u8],
    buf: &mut [u8],
) -> Result<usize, FrameError> {
    if parameter.len() > MAX_AT_DATA {
        return Err(FrameError::TooLong);
    }
    let mut w = FrameWriter::new(buf, 4 + parameter.len())?;
    w.put(&[API_AT_COMMAND, frame_id]);
    w.put(&command);
    w.put(parameter);
    Ok(w.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_datasheet_example() {
        // AT command "NJ" example from the 802.15.4 manual.
        assert_eq!(checksum(&[0x08, 0x52, 0x4E, 0x4A]), 0x0D);
    }

    #[test]
    fn test_encode_at_command() {
        let mut buf = [0u8; 16];
        let len = encode_at_command(0x52, *b"NJ", &[], &mut buf).unwrap();
        assert_eq!(&buf[..len], &[0x7E, 0x00, 0x04, 0x08, 0x52, 0x4E, 0x4A, 0x0D]);
    }

    #[test]
    fn test_encode_tx64_layout() {
        let mut buf = [0u8; 32];
        let dest = HardwareAddress::new(0x0013_A200, 0x4000_0001);
        let len = encode_tx64(1, dest, 0, &[0xAA, 0xBB], &mut buf).unwrap();
        assert_eq!(len, 17);
        assert_eq!(&buf[..4], &[0x7E, 0x00, 13, API_TX64]);
        assert_eq!(&buf[5..13], &[0x00, 0x13, 0xA2, 0x00, 0x40, 0x00, 0x00, 0x01]);
        assert_eq!(&buf[14..16], &[0xAA, 0xBB]);
        assert_eq!(buf[16], checksum(&buf[3..16]));
    }

    #[test]
    fn test_encode_limits() {
        let mut small = [0u8; 8];
        assert_eq!(
            encode_tx64(1, HardwareAddress::new(0, 1), 0, &[1], &mut small),
            Err(FrameError::BufferTooSmall)
        );
        let mut buf = [0u8; 256];
        assert_eq!(
            encode_tx64(1, HardwareAddress::new(0, 1), 0, &[0; MAX_RF_DATA + 1], &mut buf),
            Err(FrameError::TooLong)
        );
    }

    #[test]
    fn test_decode_rx64() {
        let api = [API_RX64, 0, 0x13, 0xA2, 0, 0x40, 0, 0, 0x02, 0x28, 0x00, 0x01, 0x02];
        assert_eq!(
            decode_api_data(&api),
            Ok(Frame::Rx64 {
                source: HardwareAddress::new(0x0013_A200, 0x4000_0002),
                rssi: 0x28,
                options: 0,
                data: Vec::from_slice(&[1, 2]).unwrap(),
            })
        );
    }

    #[test]
    fn test_decode_status_frames() {
        assert_eq!(
            decode_api_data(&[API_TX_STATUS, 7, 1]),
            Ok(Frame::TxStatus {
                frame_id: 7,
                status: DeliveryStatus::NoAck
            })
        );
        assert_eq!(
            decode_api_data(&[API_AT_RESPONSE, 3, b'S', b'H', 0, 0x00, 0x13, 0xA2, 0x00]),
            Ok(Frame::AtResponse {
                frame_id: 3,
                command: *b"SH",
                status: AtStatus::Ok,
                data: Vec::from_slice(&[0x00, 0x13, 0xA2, 0x00]).unwrap(),
            })
        );
        assert_eq!(decode_api_data(&[API_TX_STATUS, 7]), Err(FrameError::Truncated));
        assert_eq!(decode_api_data(&[0x97, 1, 2]), Ok(Frame::Unsupported(0x97)));
    }
}
