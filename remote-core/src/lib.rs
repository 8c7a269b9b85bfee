//! Platform-agnostic link logic for the remote/droid rig.
//!
//! This crate provides the protocol layer between the physical remote and the
//! radio, independent of the hardware it runs on:
//!
//! - **Control Streamer**: input sample to Control envelope, redundant sends
//! - **Telemetry Ingest**: per-peer liveness and loss counting
//! - **Config Exchange**: request/reply client, and the server-side dispatch
//! - **Pairing**: discovery filtering and the bind handshake
//! - **Calibration**: joystick range capture and acceptance
//! - **Console**: operator command parsing
//! - **Parameter Store**: checksummed flash blocks for [`RemoteParams`]
//!
//! [`Remote`] ties these together and is what the firmware drives.
//!
//! # Collaborators
//!
//! The core talks to hardware only through traits:
//!
//! - [`LinkTransport`] - the radio (see the `xbee-proto` crate)
//! - [`ParamStore`] / [`FlashRegion`] - durable parameters
//! - [`Indicator`] - LEDs and short messages
//! - [`Clock`] - monotonic milliseconds
//!
//! # Example
//!
//! ```ignore
//! use remote_core::{Remote, RemoteRole, FlashParamStore};
//!
//! let store = FlashParamStore::new(flash)?;
//! let mut remote = Remote::new(RemoteRole::Primary, radio, store, leds, clock)?;
//!
//! loop {
//!     ticker.next().await;
//!     remote.step(&read_inputs()).await;
//! }
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt (for embedded targets)
//! - **`log`**: Log through the `log` facade
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// Must come first so the logging macros are visible to the other modules.
#[macro_use]
mod fmt;

pub mod calibration;
pub mod clock;
pub mod console;
pub mod error;
pub mod exchange;
pub mod indicator;
pub mod input;
pub mod pairing;
pub mod params;
pub mod remote;
pub mod role;
pub mod store;
pub mod streamer;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod mock;

pub use calibration::{
    AxisCapture, CalibrationOutcome, CalibrationSession, CALIB_HIGH_THRESHOLD, CALIB_LOW_THRESHOLD,
};
pub use clock::Clock;
pub use console::{parse_command, ConsoleCommand, ConsoleError, Setting, Side, MAX_COMMAND_LENGTH};
pub use error::LinkError;
pub use exchange::{ConfigEffect, ConfigExchange, CONFIG_REPLY_TIMEOUT_MS};
pub use indicator::{Color, FlashPattern, Indicator, Led, Severity};
pub use input::RawInput;
pub use pairing::{HandshakeStep, PairTarget, PairingOutcome, PairingSession, StepKind};
pub use params::{LoadOutcome, ParamsSlot};
pub use remote::{ConsoleAction, Remote, Workflow};
pub use role::RemoteRole;
pub use store::{
    BlockHandle, FlashParamStore, FlashRegion, MemoryFlash, ParamStore, StoreError, REGION_SIZE,
};
pub use telemetry::{Liveness, PeerLinkState, TelemetryIngest, NO_COMM_TIMEOUT_MS};
pub use transport::{
    DiscoveredNode, Inbound, LinkTransport, NodeList, StationId, StationType, TransportError,
};

pub use remote_proto::RemoteParams;
