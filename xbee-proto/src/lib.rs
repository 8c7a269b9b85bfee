//! XBee 802.15.4 API frame codec.
//!
//! The remotes reach the droid through XBee series 1 modules in API mode 1.
//! This crate covers the frames the link needs:
//!
//! - **TX 64-bit** (0x00) and **TX status** (0x89) for sending envelopes
//! - **RX 64-bit** (0x80) for receiving them, with RSSI
//! - **AT command** (0x08) and **AT response** (0x88) for `SH`/`SL` and
//!   node discovery (`ND`)
//!
//! # Example
//!
//! ```
//! use remote_proto::HardwareAddress;
//! use xbee_proto::{encode_tx64, Frame, XBeeParser};
//!
//! let mut buf = [0u8; 64];
//! let len = encode_tx64(1, HardwareAddress::new(0x0013_A200, 1), 0, &[0x42], &mut buf).unwrap();
//! assert_eq!(buf[0], 0x7E);
//!
//! let mut parser = XBeeParser::new();
//! for &b in &[0x7E, 0x00, 0x03, 0x89, 0x01, 0x00, 0x75] {
//!     if let Ok(Some(Frame::TxStatus { frame_id, .. })) = parser.push_byte(b) {
//!         assert_eq!(frame_id, 1);
//!     }
//! }
//! # let _ = len;
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod discovery;
pub mod frame;
pub mod parser;

pub use discovery::{parse_node_discovery, NodeInfo, MAX_NODE_NAME};
pub use frame::{
    checksum, decode_api_data, encode_at_command, encode_tx64, AtStatus, DeliveryStatus, Frame,
    FrameError, MAX_API_DATA, MAX_AT_DATA, MAX_RF_DATA, START_DELIMITER, TX_OPT_DISABLE_ACK,
};
pub use parser::XBeeParser;
