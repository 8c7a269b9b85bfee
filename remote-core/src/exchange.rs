//! Config exchange: request/reply between a remote and a peer.
//!
//! The client side sends one request and waits for the matching reply:
//! same kind, from the addressed peer. Telemetry arriving in the meantime
//! is handed back to the caller rather than dropped. There is no retry.
//!
//! The server side decides what a request means for this unit. Only the
//! secondary remote accepts configuration; the primary is the one that
//! issues it.

use remote_proto::{
    ConfigKind, ConfigMessage, ConfigRequest, DeviceRole, Envelope, HardwareAddress, Payload,
    PacketType, RejectReason, RemoteConfig, ReplyCode, StreamSequencer, CONFIG_MAGIC,
};

use crate::clock::Clock;
use crate::error::LinkError;
use crate::role::RemoteRole;
use crate::transport::{Inbound, LinkTransport, TransportError};

/// How long a client waits for a reply.
pub const CONFIG_REPLY_TIMEOUT_MS: u32 = 1000;

/// One outstanding request, borrowing what it needs from its owner.
pub struct ConfigExchange<'a, T, C> {
    pub transport: &'a mut T,
    pub clock: &'a C,
    pub sequencer: &'a mut StreamSequencer,
    pub source: DeviceRole,
}

impl<T: LinkTransport, C: Clock> ConfigExchange<'_, T, C> {
    /// Send `request` to `target` and wait up to `timeout_ms` for its reply.
    ///
    /// Non-matching envelopes received while waiting are passed to
    /// `unrelated`.
    ///
    /// # Errors
    ///
    /// [`LinkError::AddressUnbound`] without sending anything if `target`
    /// is zero; [`LinkError::Transport`] on send failure or timeout.
    pub async fn request(
        self,
        target: HardwareAddress,
        request: ConfigRequest,
        timeout_ms: u32,
        mut unrelated: impl FnMut(Inbound),
    ) -> Result<ReplyCode, LinkError> {
        if target.is_zero() {
            return Err(LinkError::AddressUnbound);
        }

        let kind = request.kind();
        let envelope = Envelope::new(
            self.source,
            self.sequencer.next_sequence(PacketType::Config),
            Payload::Config(ConfigMessage::Request(request)),
        );
        let deadline = self.clock.now_ms() + u64::from(timeout_ms);

        debug!("config {:?} -> {}", kind, target);
        self.transport.send(target, &envelope, false).await?;

        loop {
            let now = self.clock.now_ms();
            if now >= deadline {
                return Err(TransportError::Timeout.into());
            }
            let remaining = u32::try_from(deadline - now).unwrap_or(u32::MAX);
            let inbound = self.transport.receive(remaining).await?;
            if let Some(code) = reply_for(&inbound, target, kind) {
                debug!("config {:?} <- {}: {:?}", kind, target, code);
                return Ok(code);
            }
            unrelated(inbound);
        }
    }
}

fn reply_for(inbound: &Inbound, target: HardwareAddress, kind: ConfigKind) -> Option<ReplyCode> {
    match inbound.envelope.payload {
        Payload::Config(ConfigMessage::Reply { kind: k, code })
            if k == kind && inbound.source == target =>
        {
            Some(code)
        }
        _ => None,
    }
}

/// Collapse a reply into success or [`LinkError::ProtocolReject`].
///
/// # Errors
///
/// Passes through `result`'s error, or the reply's reject reason.
pub fn expect_ok(result: Result<ReplyCode, LinkError>) -> Result<(), LinkError> {
    match result? {
        ReplyCode::Ok => Ok(()),
        ReplyCode::Error(reason) => Err(LinkError::ProtocolReject(reason)),
    }
}

/// What an accepted request asks this unit to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigEffect {
    BindPeer(HardwareAddress),
    BindDroid(HardwareAddress),
    ApplyConfig(RemoteConfig),
    /// Wipe storage and halt. No reply is sent.
    FactoryReset,
    StartCalibration,
}

/// Decide whether to accept `request` from `source`.
///
/// # Errors
///
/// The reason sent back in the reply.
pub fn evaluate_request(
    role: RemoteRole,
    bound_peer: HardwareAddress,
    source: HardwareAddress,
    request: &ConfigRequest,
) -> Result<ConfigEffect, RejectReason> {
    if role == RemoteRole::Primary {
        return Err(RejectReason::NotPermitted);
    }
    if !bound_peer.is_zero() && source != bound_peer {
        return Err(RejectReason::UnknownSender);
    }

    match *request {
        ConfigRequest::SetPeerRemoteAddress(address) if address == source => {
            Ok(ConfigEffect::BindPeer(address))
        }
        ConfigRequest::SetPeerRemoteAddress(_) => Err(RejectReason::AddressMismatch),
        ConfigRequest::SetDroidAddress(address) => Ok(ConfigEffect::BindDroid(address)),
        ConfigRequest::SetRemoteParams(config) => Ok(ConfigEffect::ApplyConfig(config)),
        ConfigRequest::FactoryReset { magic } if magic == CONFIG_MAGIC => {
            Ok(ConfigEffect::FactoryReset)
        }
        ConfigRequest::Calibrate { magic } if magic == CONFIG_MAGIC => {
            Ok(ConfigEffect::StartCalibration)
        }
        ConfigRequest::FactoryReset { .. } | ConfigRequest::Calibrate { .. } => {
            Err(RejectReason::BadMagic)
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::mock::{block_on, MockClock, MockTransport};
    use remote_proto::{ControlPayload, StatePayload};
    use std::vec::Vec;

    const LEFT: HardwareAddress = HardwareAddress::new(0x0013_A200, 0x0000_00A1);
    const RIGHT: HardwareAddress = HardwareAddress::new(0x0013_A200, 0x0000_00A2);
    const DROID: HardwareAddress = HardwareAddress::new(0x0013_A200, 0x0000_00D1);

    fn reply(source: HardwareAddress, kind: ConfigKind, code: ReplyCode) -> Inbound {
        Inbound {
            source,
            rssi: 30,
            envelope: Envelope::new(
                DeviceRole::SecondaryRemote,
                0,
                Payload::Config(ConfigMessage::reply(kind, code)),
            ),
        }
    }

    fn run(
        transport: &mut MockTransport,
        target: HardwareAddress,
        request: ConfigRequest,
        unrelated: &mut Vec<Inbound>,
    ) -> Result<ReplyCode, LinkError> {
        let clock = MockClock::new();
        let mut sequencer = StreamSequencer::new();
        let exchange = ConfigExchange {
            transport,
            clock: &clock,
            sequencer: &mut sequencer,
            source: DeviceRole::PrimaryRemote,
        };
        block_on(exchange.request(target, request, CONFIG_REPLY_TIMEOUT_MS, |inbound| {
            unrelated.push(inbound)
        }))
    }

    #[test]
    fn test_unbound_target_sends_nothing() {
        let mut transport = MockTransport::new();
        let result = run(
            &mut transport,
            HardwareAddress::UNBOUND,
            ConfigRequest::calibrate(),
            &mut Vec::new(),
        );
        assert_eq!(result, Err(LinkError::AddressUnbound));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_reply_ok() {
        let mut transport = MockTransport::new();
        transport.push_inbound(reply(RIGHT, ConfigKind::Calibrate, ReplyCode::Ok));
        let result = run(&mut transport, RIGHT, ConfigRequest::calibrate(), &mut Vec::new());
        assert_eq!(result, Ok(ReplyCode::Ok));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RIGHT);
        assert_eq!(
            sent[0].1.payload,
            Payload::Config(ConfigMessage::Request(ConfigRequest::calibrate()))
        );
    }

    #[test]
    fn test_telemetry_while_waiting_is_forwarded() {
        let mut transport = MockTransport::new();
        let state = Inbound {
            source: DROID,
            rssi: 40,
            envelope: Envelope::new(DeviceRole::Droid, 2, Payload::State(StatePayload::default())),
        };
        let control = Inbound {
            source: RIGHT,
            rssi: 40,
            envelope: Envelope::new(
                DeviceRole::SecondaryRemote,
                5,
                Payload::Control(ControlPayload::default()),
            ),
        };
        transport.push_inbound(state);
        transport.push_inbound(control);
        transport.push_inbound(reply(RIGHT, ConfigKind::SetDroidAddress, ReplyCode::Ok));

        let mut unrelated = Vec::new();
        let result = run(
            &mut transport,
            RIGHT,
            ConfigRequest::SetDroidAddress(DROID),
            &mut unrelated,
        );
        assert_eq!(result, Ok(ReplyCode::Ok));
        assert_eq!(unrelated, [state, control]);
    }

    #[test]
    fn test_reply_of_other_kind_or_sender_ignored() {
        let mut transport = MockTransport::new();
        transport.push_inbound(reply(RIGHT, ConfigKind::FactoryReset, ReplyCode::Ok));
        transport.push_inbound(reply(DROID, ConfigKind::Calibrate, ReplyCode::Ok));
        let mut unrelated = Vec::new();
        let result = run(&mut transport, RIGHT, ConfigRequest::calibrate(), &mut unrelated);
        assert_eq!(result, Err(LinkError::Transport(TransportError::Timeout)));
        assert_eq!(unrelated.len(), 2);
    }

    #[test]
    fn test_send_failure_reported() {
        let mut transport = MockTransport::new();
        transport.fail_sends(TransportError::Unreachable);
        let result = run(&mut transport, RIGHT, ConfigRequest::calibrate(), &mut Vec::new());
        assert_eq!(result, Err(LinkError::Transport(TransportError::Unreachable)));
    }

    #[test]
    fn test_expect_ok_maps_reject() {
        assert_eq!(expect_ok(Ok(ReplyCode::Ok)), Ok(()));
        assert_eq!(
            expect_ok(Ok(ReplyCode::Error(RejectReason::BadMagic))),
            Err(LinkError::ProtocolReject(RejectReason::BadMagic))
        );
        assert_eq!(expect_ok(Err(LinkError::Busy)), Err(LinkError::Busy));
    }

    #[test]
    fn test_primary_refuses_configuration() {
        assert_eq!(
            evaluate_request(
                RemoteRole::Primary,
                HardwareAddress::UNBOUND,
                RIGHT,
                &ConfigRequest::calibrate()
            ),
            Err(RejectReason::NotPermitted)
        );
    }

    #[test]
    fn test_peer_binding_must_name_sender() {
        let unbound = HardwareAddress::UNBOUND;
        assert_eq!(
            evaluate_request(
                RemoteRole::Secondary,
                unbound,
                LEFT,
                &ConfigRequest::SetPeerRemoteAddress(LEFT)
            ),
            Ok(ConfigEffect::BindPeer(LEFT))
        );
        assert_eq!(
            evaluate_request(
                RemoteRole::Secondary,
                unbound,
                LEFT,
                &ConfigRequest::SetPeerRemoteAddress(DROID)
            ),
            Err(RejectReason::AddressMismatch)
        );
    }

    #[test]
    fn test_bound_peer_rejects_strangers() {
        assert_eq!(
            evaluate_request(
                RemoteRole::Secondary,
                LEFT,
                DROID,
                &ConfigRequest::SetDroidAddress(DROID)
            ),
            Err(RejectReason::UnknownSender)
        );
    }

    #[test]
    fn test_magic_checked() {
        assert_eq!(
            evaluate_request(
                RemoteRole::Secondary,
                LEFT,
                LEFT,
                &ConfigRequest::FactoryReset { magic: 1 }
            ),
            Err(RejectReason::BadMagic)
        );
        assert_eq!(
            evaluate_request(RemoteRole::Secondary, LEFT, LEFT, &ConfigRequest::factory_reset()),
            Ok(ConfigEffect::FactoryReset)
        );
        assert_eq!(
            evaluate_request(RemoteRole::Secondary, LEFT, LEFT, &ConfigRequest::calibrate()),
            Ok(ConfigEffect::StartCalibration)
        );
    }
}
