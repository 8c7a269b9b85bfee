//! Radio transport trait, inbound envelopes and node discovery types.

use core::fmt;
use core::future::Future;

use heapless::{String, Vec};
use remote_proto::{Envelope, HardwareAddress};

/// Longest node name kept from discovery.
pub const MAX_NODE_NAME: usize = 20;

/// Most nodes kept from one discovery round.
pub const MAX_DISCOVERED: usize = 8;

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Radio not initialized or not responding.
    NotReady,
    /// Radio busy with another frame.
    Busy,
    /// No acknowledgment from the target.
    Unreachable,
    /// Nothing received within the timeout.
    Timeout,
    /// Broadcast target without `allow_broadcast`.
    BroadcastNotAllowed,
    /// Envelope could not be framed.
    Encode,
    /// Serial or bus I/O error.
    Io,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "radio not ready"),
            Self::Busy => write!(f, "radio busy"),
            Self::Unreachable => write!(f, "unreachable"),
            Self::Timeout => write!(f, "timeout"),
            Self::BroadcastNotAllowed => write!(f, "broadcast not allowed"),
            Self::Encode => write!(f, "encode error"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<remote_proto::EncodeError> for TransportError {
    fn from(_: remote_proto::EncodeError) -> Self {
        TransportError::Encode
    }
}

/// A decoded envelope together with its link-layer metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inbound {
    pub source: HardwareAddress,
    /// Received signal strength, -dBm.
    pub rssi: u8,
    pub envelope: Envelope,
}

/// Kind of station, as encoded in a station id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StationType {
    Droid,
    Remote,
    Other,
}

/// 16-bit station id: type in bits 12-15, builder in bits 4-11, unit in bits 0-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StationId(pub u16);

impl StationId {
    const TYPE_DROID: u16 = 0x1;
    const TYPE_REMOTE: u16 = 0x2;
    const TYPE_OTHER: u16 = 0xF;

    #[must_use]
    pub const fn new(station_type: StationType, builder: u8, unit: u8) -> Self {
        let ty = match station_type {
            StationType::Droid => Self::TYPE_DROID,
            StationType::Remote => Self::TYPE_REMOTE,
            StationType::Other => Self::TYPE_OTHER,
        };
        Self((ty << 12) | ((builder as u16) << 4) | (unit as u16 & 0x0F))
    }

    #[must_use]
    pub const fn station_type(self) -> StationType {
        match self.0 >> 12 {
            Self::TYPE_DROID => StationType::Droid,
            Self::TYPE_REMOTE => StationType::Remote,
            _ => StationType::Other,
        }
    }
}

/// One node reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredNode {
    pub address: HardwareAddress,
    pub name: String<MAX_NODE_NAME>,
    pub station: StationId,
}

/// Nodes from one discovery round.
pub type NodeList = Vec<DiscoveredNode, MAX_DISCOVERED>;

/// Async trait for the radio link.
///
/// Implementations frame and unframe envelopes. They never retry: a send
/// either completes or reports why it did not.
pub trait LinkTransport {
    /// Send one envelope to `to`.
    ///
    /// Sending to the broadcast address fails with
    /// [`TransportError::BroadcastNotAllowed`] unless `allow_broadcast`.
    fn send(
        &mut self,
        to: HardwareAddress,
        envelope: &Envelope,
        allow_broadcast: bool,
    ) -> impl Future<Output = Result<(), TransportError>>;

    /// Wait up to `timeout_ms` for the next inbound envelope.
    fn receive(&mut self, timeout_ms: u32) -> impl Future<Output = Result<Inbound, TransportError>>;

    /// Next already-queued inbound envelope, without waiting.
    fn try_receive(&mut self) -> Option<Inbound>;

    /// Discover nodes in range, replacing the contents of `nodes`.
    fn discover_nodes(&mut self, nodes: &mut NodeList)
        -> impl Future<Output = Result<(), TransportError>>;

    /// This radio's own address.
    fn local_address(&self) -> HardwareAddress;

    /// Check if the radio is initialized and usable.
    fn is_ready(&self) -> bool;
}
