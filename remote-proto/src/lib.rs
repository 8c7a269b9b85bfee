//! Wire model of the remote/droid radio link.
//!
//! This crate defines everything that travels over the air or into flash:
//!
//! - **Addressing**: [`HardwareAddress`] with the all-zero unbound sentinel
//! - **Roles and payloads**: [`DeviceRole`], [`ControlPayload`],
//!   [`StatePayload`], [`ConfigMessage`]
//! - **Envelope codec**: [`Envelope::encode`] / [`Envelope::decode`] with a
//!   CRC-8/SMBUS trailer
//! - **Sequencing**: [`CyclicCounter`], [`StreamSequencer`] and
//!   [`cyclic_diff`] for loss detection
//! - **Persistence**: the fixed-size [`RemoteParams`] record
//!
//! # Envelope Format
//!
//! ```text
//! [header][payload][crc8]
//! ```
//!
//! - `header` - packet type (2 bits), source role (2 bits), reserved bit,
//!   3-bit sequence number
//! - `payload` - fixed size per type: Control 15, State 10, Config request 9,
//!   Config reply 2
//! - `crc8` - CRC-8/SMBUS over header and payload
//!
//! # Example
//!
//! ```
//! use remote_proto::{
//!     ConfigMessage, ConfigRequest, DeviceRole, Envelope, HardwareAddress, Payload,
//!     StreamSequencer, PacketType, MAX_ENVELOPE_SIZE,
//! };
//!
//! let mut seq = StreamSequencer::new();
//! let request = ConfigRequest::SetDroidAddress(HardwareAddress::from_u64(0x1122_3344_5566_7788));
//! let env = Envelope::new(
//!     DeviceRole::PrimaryRemote,
//!     seq.next_sequence(PacketType::Config),
//!     Payload::Config(ConfigMessage::Request(request)),
//! );
//!
//! let mut buf = [0u8; MAX_ENVELOPE_SIZE];
//! let len = env.encode(&mut buf).unwrap();
//! let decoded = Envelope::decode(&buf[..len]).unwrap();
//! assert_eq!(decoded, env);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod address;
pub mod config;
pub mod crc;
pub mod envelope;
pub mod parser;
pub mod record;
pub mod seqnum;
pub mod serialize;
pub mod types;

pub use address::HardwareAddress;
pub use config::{
    ConfigKind, ConfigMessage, ConfigRequest, RejectReason, RemoteConfig, ReplyCode,
    CONFIG_MAGIC, MAX_DEADBAND_PERCENT, MAX_LED_BRIGHTNESS, MAX_SEND_REPEATS,
};
pub use crc::{calculate_crc8, Crc8Digest};
pub use envelope::{Envelope, Payload};
pub use parser::DecodeError;
pub use record::{AxisCalib, RemoteParams, AXIS_FULL_SCALE, PARAMS_RECORD_SIZE};
pub use seqnum::{cyclic_diff, CyclicCounter, SeqCounter, StreamSequencer, SEQ_MODULUS};
pub use serialize::{EncodeError, MAX_ENVELOPE_SIZE};
pub use types::{Button, Buttons, ControlPayload, DeviceRole, PacketType, StatePayload, Stick};
