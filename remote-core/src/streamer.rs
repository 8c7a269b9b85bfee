//! Control streamer: turns a raw input sample into a Control envelope and
//! fans it out to the bound peers.
//!
//! The secondary remote sends each frame once to the primary remote. Either
//! remote sends it `send_repeats + 1` times to the droid, except while the
//! joystick is being calibrated. Repeats carry the same sequence number.

use remote_proto::{ControlPayload, Envelope, HardwareAddress, Payload, RemoteParams, Stick};

use crate::indicator::Color;
use crate::input::RawInput;
use crate::role::RemoteRole;
use crate::transport::{LinkTransport, TransportError};

/// Build the Control payload for one input sample.
#[must_use]
pub fn build_payload(role: RemoteRole, params: &RemoteParams, input: &RawInput) -> ControlPayload {
    let config = &params.config;
    let incremental_rotation = role
        .rotation_button(config)
        .is_some_and(|button| input.buttons.contains(button.mask()));

    ControlPayload {
        primary: role.holds_authority(config.left_is_primary),
        incremental_rotation,
        buttons: input.buttons,
        stick: Stick::new(
            params.h_calib.normalize(input.joy_h, config.deadband_percent),
            params.v_calib.normalize(input.joy_v, config.deadband_percent),
        ),
        pitch: input.pitch,
        roll: input.roll,
        heading: input.heading,
        pot1: input.pot1,
        pot2: input.pot2,
        battery: input.battery,
    }
}

/// Where one Control frame goes this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamPlan {
    pub peer: Option<HardwareAddress>,
    pub droid: Option<HardwareAddress>,
    /// Number of sends to the droid.
    pub droid_copies: u8,
}

impl StreamPlan {
    #[must_use]
    pub fn new(role: RemoteRole, params: &RemoteParams, calibrating: bool) -> Self {
        let peer = match role {
            RemoteRole::Secondary => params.peer_address.bound(),
            RemoteRole::Primary => None,
        };
        let droid = if calibrating {
            None
        } else {
            params.droid_address.bound()
        };
        Self {
            peer,
            droid,
            droid_copies: params.config.send_repeats.saturating_add(1),
        }
    }
}

/// Result of streaming one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamReport {
    pub sent: u8,
    pub failed: u8,
    pub last_error: Option<TransportError>,
}

impl StreamReport {
    const fn empty() -> Self {
        Self {
            sent: 0,
            failed: 0,
            last_error: None,
        }
    }

    fn account(&mut self, result: Result<(), TransportError>) {
        match result {
            Ok(()) => self.sent += 1,
            Err(e) => {
                self.failed += 1;
                self.last_error = Some(e);
            }
        }
    }
}

/// Send `envelope` according to `plan`. Failures are counted, never retried.
pub async fn stream_control<T: LinkTransport>(
    transport: &mut T,
    envelope: &Envelope,
    plan: &StreamPlan,
) -> StreamReport {
    let mut report = StreamReport::empty();
    if !matches!(envelope.payload, Payload::Control(_)) {
        return report;
    }

    if let Some(peer) = plan.peer {
        report.account(transport.send(peer, envelope, false).await);
    }
    if let Some(droid) = plan.droid {
        for _ in 0..plan.droid_copies {
            report.account(transport.send(droid, envelope, false).await);
        }
    }

    if let Some(e) = report.last_error {
        debug!("control stream: {} of {} sends failed: {}", report.failed, report.failed + report.sent, e);
    }
    report
}

/// Comm LED colour for the current binding state and last stream result.
#[must_use]
pub fn comm_color(params: &RemoteParams, report: &StreamReport) -> Color {
    if report.failed > 0 {
        return Color::Red;
    }
    match (params.droid_address.is_zero(), params.peer_address.is_zero()) {
        (false, false) => Color::White,
        (false, true) => Color::Blue,
        (true, false) => Color::Magenta,
        (true, true) => Color::Off,
    }
}
