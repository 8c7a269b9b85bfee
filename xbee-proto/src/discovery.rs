//! Node discovery (`ATND`) response parsing.
//!
//! Each discovered node arrives as one AT response whose value is
//!
//! ```text
//! [MY u16][SH u32][SL u32][DB u8][NI ... 0x00]
//! ```
//!
//! An empty value marks the end of discovery.

use heapless::String;
use remote_proto::HardwareAddress;

use crate::frame::FrameError;

/// Longest node identifier (NI) kept.
pub const MAX_NODE_NAME: usize = 20;

/// One node reported by `ATND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// 16-bit source address (MY), used as station id.
    pub my: u16,
    pub address: HardwareAddress,
    /// Signal strength of the response, -dBm.
    pub rssi: u8,
    pub name: String<MAX_NODE_NAME>,
}

/// Parse one `ND` response value. Names longer than [`MAX_NODE_NAME`] are
/// truncated; non-UTF-8 bytes are replaced with `?`.
///
/// # Errors
///
/// [`FrameError::Truncated`] if the fixed part is incomplete,
/// [`FrameError::Malformed`] if the name is not NUL-terminated.
pub fn parse_node_discovery(value: &[u8]) -> Result<NodeInfo, FrameError> {
    let [my0, my1, sh0, sh1, sh2, sh3, sl0, sl1, sl2, sl3, db, name @ ..] = value else {
        return Err(FrameError::Truncated);
    };
    let end = name
        .iter()
        .position(|&b| b == 0)
        .ok_or(FrameError::Malformed)?;

    let mut label = String::new();
    for &b in name[..end].iter().take(MAX_NODE_NAME) {
        let c = if b.is_ascii() && !b.is_ascii_control() {
            char::from(b)
        } else {
            '?'
        };
        // Capacity is MAX_NODE_NAME and at most that many chars are pushed.
        let _ = label.push(c);
    }

    Ok(NodeInfo {
        my: u16::from_be_bytes([*my0, *my1]),
        address: HardwareAddress::new(
            u32::from_be_bytes([*sh0, *sh1, *sh2, *sh3]),
            u32::from_be_bytes([*sl0, *sl1, *sl2, *sl3]),
        ),
        rssi: *db,
        name: label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node() {
        let value = [
            0x21, 0x23, // MY
            0x00, 0x13, 0xA2, 0x00, // SH
            0x40, 0x8B, 0x12, 0x34, // SL
            0x2A, // DB
            b'R', b'i', b'g', b'h', b't', 0,
        ];
        let node = parse_node_discovery(&value).unwrap();
        assert_eq!(node.my, 0x2123);
        assert_eq!(node.address, HardwareAddress::new(0x0013_A200, 0x408B_1234));
        assert_eq!(node.rssi, 0x2A);
        assert_eq!(node.name.as_str(), "Right");
    }

    #[test]
    fn test_long_name_truncated() {
        let mut value = [b'x'; 11 + 30 + 1];
        value[..11].fill(0);
        value[41] = 0;
        let node = parse_node_discovery(&value).unwrap();
        assert_eq!(node.name.len(), MAX_NODE_NAME);
    }

    #[test]
    fn test_malformed_values() {
        assert_eq!(parse_node_discovery(&[0; 5]), Err(FrameError::Truncated));
        assert_eq!(parse_node_discovery(&[1; 14]), Err(FrameError::Malformed));
        // Empty name is fine.
        assert!(parse_node_discovery(&[0; 12]).is_ok());
    }
}
