//! Link-level error type.

use core::fmt;

use remote_proto::RejectReason;

use crate::store::StoreError;
use crate::transport::TransportError;

/// Error type for link operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Send or receive could not complete.
    Transport(TransportError),
    /// The peer answered with a non-Ok reply code, or a request failed
    /// local validation.
    ProtocolReject(RejectReason),
    /// Target address is the unbound sentinel. Nothing was sent.
    AddressUnbound,
    /// Persisting a committed change failed.
    Storage(StoreError),
    /// Envelope came from a role or address this unit does not accept.
    UnexpectedSender,
    /// Operation is not available on this unit's role.
    WrongRole,
    /// Another workflow is active.
    Busy,
    /// Pairing candidate index out of range.
    NoSuchCandidate,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::ProtocolReject(reason) => write!(f, "rejected: {reason}"),
            Self::AddressUnbound => write!(f, "address unbound"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::UnexpectedSender => write!(f, "unexpected sender"),
            Self::WrongRole => write!(f, "not available on this remote"),
            Self::Busy => write!(f, "busy"),
            Self::NoSuchCandidate => write!(f, "no such candidate"),
        }
    }
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        LinkError::Transport(err)
    }
}

impl From<StoreError> for LinkError {
    fn from(err: StoreError) -> Self {
        LinkError::Storage(err)
    }
}
