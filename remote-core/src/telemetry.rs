//! Telemetry ingest: liveness and loss tracking for the droid and the peer
//! remote.
//!
//! Only the primary remote consumes telemetry. It accepts State envelopes
//! from the droid and Control envelopes from the secondary remote; when the
//! corresponding address is bound, the sender must match it.

use remote_proto::{
    cyclic_diff, ControlPayload, DeviceRole, HardwareAddress, Payload, RemoteParams, StatePayload,
    SEQ_MODULUS,
};

use crate::error::LinkError;
use crate::role::RemoteRole;
use crate::transport::Inbound;

/// A peer silent for this long is considered lost.
pub const NO_COMM_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Liveness {
    Live,
    NoComm,
}

/// Which link a telemetry envelope arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetrySource {
    Droid,
    PeerRemote,
}

/// Per-peer link statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerLinkState {
    address: HardwareAddress,
    last_seen_ms: Option<u64>,
    last_seq: Option<u8>,
    liveness: Liveness,
    received: u32,
    missed: u32,
    rssi: u8,
}

impl Default for PeerLinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerLinkState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            address: HardwareAddress::UNBOUND,
            last_seen_ms: None,
            last_seq: None,
            liveness: Liveness::NoComm,
            received: 0,
            missed: 0,
            rssi: 0,
        }
    }

    /// Account for one envelope and return how many were lost before it.
    ///
    /// Loss is not reported for the first envelope or the first one after
    /// a NoComm gap.
    pub fn record(&mut self, address: HardwareAddress, seq: u8, rssi: u8, now_ms: u64) -> u8 {
        let resync = self.liveness == Liveness::NoComm
            || self
                .last_seen_ms
                .map_or(true, |seen| now_ms.saturating_sub(seen) >= NO_COMM_TIMEOUT_MS);

        let missed = match self.last_seq {
            Some(last) if !resync => cyclic_diff(last, seq, SEQ_MODULUS).saturating_sub(1),
            _ => 0,
        };

        self.address = address;
        self.last_seen_ms = Some(now_ms);
        self.last_seq = Some(seq);
        self.liveness = Liveness::Live;
        self.received = self.received.wrapping_add(1);
        self.missed = self.missed.wrapping_add(u32::from(missed));
        self.rssi = rssi;
        missed
    }

    /// Re-evaluate liveness. Returns true when the link just went silent.
    pub fn refresh(&mut self, now_ms: u64) -> bool {
        let silent = self
            .last_seen_ms
            .map_or(true, |seen| now_ms.saturating_sub(seen) >= NO_COMM_TIMEOUT_MS);
        let lost = silent && self.liveness == Liveness::Live;
        if silent {
            self.liveness = Liveness::NoComm;
        }
        lost
    }

    #[must_use]
    pub const fn liveness(&self) -> Liveness {
        self.liveness
    }

    #[must_use]
    pub const fn address(&self) -> HardwareAddress {
        self.address
    }

    #[must_use]
    pub const fn received(&self) -> u32 {
        self.received
    }

    #[must_use]
    pub const fn missed(&self) -> u32 {
        self.missed
    }

    #[must_use]
    pub const fn rssi(&self) -> u8 {
        self.rssi
    }
}

/// Outcome of one accepted telemetry envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IngestReport {
    pub source: TelemetrySource,
    pub missed: u8,
}

/// Link state for both telemetry sources plus the latest payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryIngest {
    droid: PeerLinkState,
    peer_remote: PeerLinkState,
    droid_state: Option<StatePayload>,
    peer_control: Option<ControlPayload>,
}

impl TelemetryIngest {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            droid: PeerLinkState::new(),
            peer_remote: PeerLinkState::new(),
            droid_state: None,
            peer_control: None,
        }
    }

    /// Validate and account for one Control or State envelope.
    ///
    /// # Errors
    ///
    /// [`LinkError::UnexpectedSender`] if this unit does not consume the
    /// envelope or the sender is not the bound one. Nothing is updated.
    pub fn ingest(
        &mut self,
        role: RemoteRole,
        params: &RemoteParams,
        inbound: &Inbound,
        now_ms: u64,
    ) -> Result<IngestReport, LinkError> {
        if role != RemoteRole::Primary {
            return Err(LinkError::UnexpectedSender);
        }

        let env = &inbound.envelope;
        let accepts = |bound: HardwareAddress| bound.is_zero() || bound == inbound.source;

        match env.payload {
            Payload::State(state)
                if env.source == DeviceRole::Droid && accepts(params.droid_address) =>
            {
                let missed = self.droid.record(inbound.source, env.seq, inbound.rssi, now_ms);
                self.droid_state = Some(state);
                Ok(IngestReport {
                    source: TelemetrySource::Droid,
                    missed,
                })
            }
            Payload::Control(control)
                if env.source == DeviceRole::SecondaryRemote && accepts(params.peer_address) =>
            {
                let missed = self
                    .peer_remote
                    .record(inbound.source, env.seq, inbound.rssi, now_ms);
                self.peer_control = Some(control);
                Ok(IngestReport {
                    source: TelemetrySource::PeerRemote,
                    missed,
                })
            }
            // Config traffic belongs to the exchange, not here.
            _ => Err(LinkError::UnexpectedSender),
        }
    }

    /// Re-evaluate liveness of both links.
    pub fn refresh(&mut self, now_ms: u64) {
        if self.droid.refresh(now_ms) {
            warn!("droid link lost");
        }
        if self.peer_remote.refresh(now_ms) {
            warn!("peer remote link lost");
        }
    }

    #[must_use]
    pub const fn droid(&self) -> &PeerLinkState {
        &self.droid
    }

    #[must_use]
    pub const fn peer_remote(&self) -> &PeerLinkState {
        &self.peer_remote
    }

    #[must_use]
    pub const fn droid_state(&self) -> Option<&StatePayload> {
        self.droid_state.as_ref()
    }

    #[must_use]
    pub const fn peer_control(&self) -> Option<&ControlPayload> {
        self.peer_control.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_proto::{ConfigMessage, ConfigRequest, Envelope};

    const DROID: HardwareAddress = HardwareAddress::new(0x0013_A200, 0x0000_00D1);
    const PEER: HardwareAddress = HardwareAddress::new(0x0013_A200, 0x0000_00A2);

    fn state_from(source: HardwareAddress, seq: u8) -> Inbound {
        Inbound {
            source,
            rssi: 40,
            envelope: Envelope::new(DeviceRole::Droid, seq, Payload::State(StatePayload::default())),
        }
    }

    fn control_from(source: HardwareAddress, role: DeviceRole, seq: u8) -> Inbound {
        Inbound {
            source,
            rssi: 50,
            envelope: Envelope::new(role, seq, Payload::Control(ControlPayload::default())),
        }
    }

    fn bound_params() -> RemoteParams {
        RemoteParams {
            droid_address: DROID,
            peer_address: PEER,
            ..RemoteParams::default()
        }
    }

    #[test]
    fn test_consecutive_state_no_loss() {
        let mut ingest = TelemetryIngest::new();
        let params = bound_params();
        for (i, seq) in [3u8, 4, 5].into_iter().enumerate() {
            let report = ingest
                .ingest(RemoteRole::Primary, &params, &state_from(DROID, seq), i as u64 * 20)
                .unwrap();
            assert_eq!(report.missed, 0);
        }
        assert_eq!(ingest.droid().liveness(), Liveness::Live);
        assert_eq!(ingest.droid().received(), 3);
    }

    #[test]
    fn test_gap_counts_missed() {
        let mut ingest = TelemetryIngest::new();
        let params = bound_params();
        ingest
            .ingest(RemoteRole::Primary, &params, &state_from(DROID, 6), 0)
            .unwrap();
        // 6 -> 1 wraps past 7 and 0.
        let report = ingest
            .ingest(RemoteRole::Primary, &params, &state_from(DROID, 1), 30)
            .unwrap();
        assert_eq!(report.missed, 2);
        assert_eq!(ingest.droid().missed(), 2);
    }

    #[test]
    fn test_duplicate_is_not_loss() {
        let mut ingest = TelemetryIngest::new();
        let params = bound_params();
        ingest
            .ingest(RemoteRole::Primary, &params, &state_from(DROID, 2), 0)
            .unwrap();
        let report = ingest
            .ingest(RemoteRole::Primary, &params, &state_from(DROID, 2), 1)
            .unwrap();
        assert_eq!(report.missed, 0);
    }

    #[test]
    fn test_no_comm_after_timeout_and_resync() {
        let mut ingest = TelemetryIngest::new();
        let params = bound_params();
        ingest
            .ingest(RemoteRole::Primary, &params, &state_from(DROID, 0), 1_000)
            .unwrap();
        ingest.refresh(1_499);
        assert_eq!(ingest.droid().liveness(), Liveness::Live);
        ingest.refresh(1_500);
        assert_eq!(ingest.droid().liveness(), Liveness::NoComm);

        let report = ingest
            .ingest(RemoteRole::Primary, &params, &state_from(DROID, 5), 2_000)
            .unwrap();
        assert_eq!(report.missed, 0);
        assert_eq!(ingest.droid().liveness(), Liveness::Live);
    }

    #[test]
    fn test_state_from_foreign_droid_rejected() {
        let mut ingest = TelemetryIngest::new();
        let params = bound_params();
        let stranger = HardwareAddress::new(0x0013_A200, 0x0000_0BAD);
        assert_eq!(
            ingest.ingest(RemoteRole::Primary, &params, &state_from(stranger, 0), 0),
            Err(LinkError::UnexpectedSender)
        );
        assert_eq!(ingest.droid().received(), 0);
        assert!(ingest.droid_state().is_none());
    }

    #[test]
    fn test_unbound_droid_accepts_any_sender() {
        let mut ingest = TelemetryIngest::new();
        let params = RemoteParams::default();
        assert!(ingest
            .ingest(RemoteRole::Primary, &params, &state_from(DROID, 0), 0)
            .is_ok());
    }

    #[test]
    fn test_control_only_from_secondary() {
        let mut ingest = TelemetryIngest::new();
        let params = bound_params();
        assert_eq!(
            ingest.ingest(
                RemoteRole::Primary,
                &params,
                &control_from(PEER, DeviceRole::PrimaryRemote, 0),
                0
            ),
            Err(LinkError::UnexpectedSender)
        );
        let report = ingest
            .ingest(
                RemoteRole::Primary,
                &params,
                &control_from(PEER, DeviceRole::SecondaryRemote, 0),
                0,
            )
            .unwrap();
        assert_eq!(report.source, TelemetrySource::PeerRemote);
        assert!(ingest.peer_control().is_some());
    }

    #[test]
    fn test_secondary_consumes_nothing() {
        let mut ingest = TelemetryIngest::new();
        let params = bound_params();
        assert_eq!(
            ingest.ingest(RemoteRole::Secondary, &params, &state_from(DROID, 0), 0),
            Err(LinkError::UnexpectedSender)
        );
    }

    #[test]
    fn test_config_is_not_telemetry() {
        let mut ingest = TelemetryIngest::new();
        let inbound = Inbound {
            source: PEER,
            rssi: 0,
            envelope: Envelope::new(
                DeviceRole::SecondaryRemote,
                0,
                Payload::Config(ConfigMessage::Request(ConfigRequest::calibrate())),
            ),
        };
        assert_eq!(
            ingest.ingest(RemoteRole::Primary, &bound_params(), &inbound, 0),
            Err(LinkError::UnexpectedSender)
        );
    }
}
