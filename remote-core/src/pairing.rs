//! Pairing: discover candidates, bind one, and tell the other parties.
//!
//! A pairing is a short sequence of config requests. The first step binds
//! the new partner back to this remote and must succeed. The second step
//! propagates the droid address to the secondary remote; its failure leaves
//! the binding in place and is reported as a degraded pairing.

use heapless::Vec;
use remote_proto::{ConfigRequest, HardwareAddress, RemoteParams};

use crate::error::LinkError;
use crate::transport::{DiscoveredNode, NodeList, StationType};

/// What is being paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairTarget {
    Droid,
    Remote,
}

impl PairTarget {
    #[must_use]
    pub const fn station_type(self) -> StationType {
        match self {
            Self::Droid => StationType::Droid,
            Self::Remote => StationType::Remote,
        }
    }
}

/// A discovery result waiting for the operator to pick a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSession {
    target: PairTarget,
    candidates: NodeList,
}

impl PairingSession {
    /// Keep only the discovered nodes of the target's station type.
    #[must_use]
    pub fn from_discovery(target: PairTarget, nodes: NodeList) -> Self {
        let mut candidates = nodes;
        candidates.retain(|node| node.station.station_type() == target.station_type());
        Self { target, candidates }
    }

    #[must_use]
    pub const fn target(&self) -> PairTarget {
        self.target
    }

    #[must_use]
    pub fn candidates(&self) -> &[DiscoveredNode] {
        &self.candidates
    }

    #[must_use]
    pub fn candidate(&self, index: usize) -> Option<&DiscoveredNode> {
        self.candidates.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepKind {
    /// Tell the new partner our address.
    BindBack,
    /// Tell the secondary remote the droid's address.
    PropagateDroid,
}

/// One config request of a pairing handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandshakeStep {
    pub kind: StepKind,
    /// Operator-facing label, e.g. "L ID -> D".
    pub label: &'static str,
    pub target: HardwareAddress,
    pub request: ConfigRequest,
    /// A required step aborts the pairing on failure.
    pub required: bool,
}

/// Requests needed to bind `selected`, given the bindings in `params` from
/// before the pairing.
#[must_use]
pub fn handshake_plan(
    target: PairTarget,
    selected: HardwareAddress,
    own: HardwareAddress,
    params: &RemoteParams,
) -> Vec<HandshakeStep, 2> {
    let mut steps = Vec::new();

    let bind_back = HandshakeStep {
        kind: StepKind::BindBack,
        label: match target {
            PairTarget::Droid => "L ID -> D",
            PairTarget::Remote => "L ID -> R",
        },
        target: selected,
        request: ConfigRequest::SetPeerRemoteAddress(own),
        required: true,
    };

    let propagate = match target {
        PairTarget::Droid => params
            .peer_address
            .bound()
            .map(|peer| (peer, selected)),
        PairTarget::Remote => params
            .droid_address
            .bound()
            .map(|droid| (selected, droid)),
    }
    .map(|(to, droid)| HandshakeStep {
        kind: StepKind::PropagateDroid,
        label: "D ID -> R",
        target: to,
        request: ConfigRequest::SetDroidAddress(droid),
        required: false,
    });

    // Capacity is 2 and at most two steps are pushed.
    let _ = steps.push(bind_back);
    if let Some(step) = propagate {
        let _ = steps.push(step);
    }
    steps
}

/// How a pairing ended when the new binding was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingOutcome {
    Complete,
    /// Bound and persisted, but an optional step failed.
    Degraded { step: StepKind, error: LinkError },
}
