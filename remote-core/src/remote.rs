//! The remote application context.
//!
//! [`Remote`] owns every piece of link state and the four collaborators
//! (radio, parameter store, indicator, clock). The firmware calls
//! [`Remote::step`] once per tick and feeds console lines to
//! [`Remote::handle_console`]; everything else hangs off those two.
//!
//! # Tick phases
//!
//! ```text
//! tick % 4 == 0   stream Control
//! tick % 4 == 1   update status LED
//! otherwise       comm LED off
//! tick % 10 == 0  LED brightness housekeeping
//! ```

use core::fmt::{self, Write};

use heapless::String;
use remote_proto::{
    Button, Buttons, ConfigMessage, ConfigRequest, Envelope, HardwareAddress,
    PacketType, Payload, RejectReason, RemoteConfig, RemoteParams, ReplyCode, StreamSequencer,
    MAX_DEADBAND_PERCENT, MAX_LED_BRIGHTNESS, MAX_SEND_REPEATS,
};

use crate::calibration::{CalibrationOutcome, CalibrationSession};
use crate::clock::Clock;
use crate::console::{parse_command, ConsoleCommand, ConsoleError, Setting, Side};
use crate::error::LinkError;
use crate::exchange::{
    evaluate_request, expect_ok, ConfigEffect, ConfigExchange, CONFIG_REPLY_TIMEOUT_MS,
};
use crate::indicator::{Color, FlashPattern, Indicator, Led, Severity};
use crate::input::{ActivityTracker, RawInput};
use crate::pairing::{handshake_plan, PairTarget, PairingOutcome, PairingSession};
use crate::params::ParamsSlot;
use crate::role::RemoteRole;
use crate::store::{ParamStore, StoreError};
use crate::streamer::{build_payload, comm_color, stream_control, StreamPlan};
use crate::telemetry::{Liveness, PeerLinkState, TelemetryIngest, TelemetrySource};
use crate::transport::{DiscoveredNode, Inbound, LinkTransport, NodeList};

const PHASES: u32 = 4;
const CONTROL_PHASE: u32 = 0;
const STATUS_PHASE: u32 = 1;
const HOUSEKEEPING_INTERVAL: u32 = 10;

/// Input idle time after which the LEDs are dimmed.
pub const IDLE_DIM_MS: u64 = 10_000;
const DIM_BRIGHTNESS: u8 = 1;

/// Buttons on the peer's control stream that end a remote calibration.
const PEER_CALIBRATION_DONE: Buttons = Buttons(Buttons::CONFIRM.0 | Buttons::LEFT.0 | Buttons::RIGHT.0);

/// Long-running operator workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
    Idle,
    Pairing(PairingSession),
    Calibrating(CalibrationSession),
}

/// What the firmware should do after a console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleAction {
    Done,
    /// Run the hardware self test.
    RunTestsuite,
    /// Run the IMU calibration routine.
    CalibrateImu,
}

/// A remote: primary (left) or secondary (right).
pub struct Remote<T, S, D, C> {
    role: RemoteRole,
    transport: T,
    store: S,
    indicator: D,
    clock: C,
    slot: ParamsSlot,
    params: RemoteParams,
    sequencer: StreamSequencer,
    telemetry: TelemetryIngest,
    workflow: Workflow,
    tick: u32,
    running_status: bool,
    peer_calibrating: bool,
    last_buttons: Buttons,
    activity: ActivityTracker,
}

impl<T, S, D, C> Remote<T, S, D, C>
where
    T: LinkTransport,
    S: ParamStore,
    D: Indicator,
    C: Clock,
{
    /// Load parameters and apply them to the indicator.
    ///
    /// # Errors
    ///
    /// [`LinkError::Storage`] if the parameter block cannot be reserved or
    /// the defaults cannot be written back.
    pub fn new(
        role: RemoteRole,
        transport: T,
        mut store: S,
        indicator: D,
        clock: C,
    ) -> Result<Self, LinkError> {
        let (slot, params, outcome) = ParamsSlot::load(&mut store)?;
        info!("{} remote up, params {:?}", role.name(), outcome);

        let mut remote = Self {
            role,
            transport,
            store,
            indicator,
            clock,
            slot,
            params,
            sequencer: StreamSequencer::new(),
            telemetry: TelemetryIngest::new(),
            workflow: Workflow::Idle,
            tick: 0,
            running_status: false,
            peer_calibrating: false,
            last_buttons: Buttons::NONE,
            activity: ActivityTracker::new(),
        };
        remote.apply_config();
        Ok(remote)
    }

    #[must_use]
    pub const fn role(&self) -> RemoteRole {
        self.role
    }

    #[must_use]
    pub const fn params(&self) -> &RemoteParams {
        &self.params
    }

    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryIngest {
        &self.telemetry
    }

    #[must_use]
    pub const fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn is_calibrating(&self) -> bool {
        matches!(self.workflow, Workflow::Calibrating(_))
    }

    /// The peer was told to calibrate and has not confirmed yet.
    #[must_use]
    pub const fn peer_calibrating(&self) -> bool {
        self.peer_calibrating
    }

    /// One cooperative tick.
    pub async fn step(&mut self, input: &RawInput) {
        let now = self.clock.now_ms();

        while let Some(inbound) = self.transport.try_receive() {
            self.handle_inbound(inbound).await;
        }
        self.telemetry.refresh(now);
        self.activity.observe(input, now);

        if let Workflow::Calibrating(session) = &mut self.workflow {
            session.observe(input.joy_h, input.joy_v);
            if !input.buttons.pressed_since(self.last_buttons).is_empty() {
                self.finish_calibration();
            }
        }

        match self.tick % PHASES {
            CONTROL_PHASE => self.stream(input).await,
            STATUS_PHASE => {
                let color = self.status_color(input);
                self.indicator.set_led(Led::Status, color);
            }
            _ => self.indicator.set_led(Led::Comm, Color::Off),
        }

        if self.tick % HOUSEKEEPING_INTERVAL == 0 {
            let level = if self.activity.idle_ms(now) >= IDLE_DIM_MS {
                DIM_BRIGHTNESS
            } else {
                brightness_level(&self.params.config)
            };
            self.indicator.set_brightness(level);
        }

        self.last_buttons = input.buttons;
        self.tick = self.tick.wrapping_add(1);
    }

    async fn stream(&mut self, input: &RawInput) {
        let payload = build_payload(self.role, &self.params, input);
        let envelope = Envelope::new(
            self.role.device_role(),
            self.sequencer.next_sequence(PacketType::Control),
            Payload::Control(payload),
        );
        let plan = StreamPlan::new(self.role, &self.params, self.is_calibrating());
        let report = stream_control(&mut self.transport, &envelope, &plan).await;
        self.indicator
            .set_led(Led::Comm, comm_color(&self.params, &report));

        if self.running_status {
            info!(
                "ctl #{} stick {} {} buttons {} sent {} failed {}",
                envelope.seq,
                payload.stick.h,
                payload.stick.v,
                payload.buttons.raw(),
                report.sent,
                report.failed
            );
        }
    }

    fn status_color(&self, input: &RawInput) -> Color {
        if self.is_calibrating() {
            return Color::Blue;
        }
        if !input.healthy || !self.transport.is_ready() {
            return Color::Red;
        }
        let linked = match self.role {
            RemoteRole::Primary => {
                !self.params.droid_address.is_zero()
                    && self.telemetry.droid().liveness() == Liveness::Live
            }
            RemoteRole::Secondary => !self.params.peer_address.is_zero(),
        };
        if !linked {
            return Color::Yellow;
        }
        if build_payload(self.role, &self.params, input).stick.is_centered() {
            Color::White
        } else {
            Color::Green
        }
    }

    /// Dispatch one inbound envelope.
    pub async fn handle_inbound(&mut self, inbound: Inbound) {
        let local = self.transport.local_address();
        match inbound.envelope.payload {
            _ if inbound.source == local => trace!("dropping loop-back envelope"),
            Payload::Config(ConfigMessage::Request(request)) => {
                self.serve_config(inbound.source, request).await;
            }
            _ => {
                let now = self.clock.now_ms();
                absorb(
                    &mut self.telemetry,
                    &mut self.peer_calibrating,
                    self.role,
                    &self.params,
                    local,
                    &inbound,
                    now,
                );
            }
        }
    }

    async fn serve_config(&mut self, source: HardwareAddress, request: ConfigRequest) {
        let kind = request.kind();
        let result = match evaluate_request(self.role, self.params.peer_address, source, &request) {
            Ok(ConfigEffect::FactoryReset) => {
                warn!("factory reset requested by {}", source);
                self.factory_reset()
            }
            Ok(effect) => self.apply_effect(effect),
            Err(reason) => Err(reason),
        };
        if let Err(reason) = result {
            warn!("config {:?} from {} rejected: {}", kind, source, reason);
        }

        let reply = Envelope::new(
            self.role.device_role(),
            self.sequencer.next_sequence(PacketType::Config),
            Payload::Config(ConfigMessage::reply(kind, ReplyCode::from(result))),
        );
        if let Err(e) = self.transport.send(source, &reply, false).await {
            warn!("config reply to {} failed: {}", source, e);
        }
    }

    fn apply_effect(&mut self, effect: ConfigEffect) -> Result<(), RejectReason> {
        let storage_failure = |e: StoreError| {
            error!("persisting config failed: {}", e);
            RejectReason::StorageFailure
        };
        match effect {
            ConfigEffect::BindPeer(address) => {
                self.commit(|p| p.peer_address = address).map_err(storage_failure)
            }
            ConfigEffect::BindDroid(address) => {
                self.commit(|p| p.droid_address = address).map_err(storage_failure)
            }
            ConfigEffect::ApplyConfig(config) => {
                self.commit(|p| p.config = config).map_err(storage_failure)?;
                self.apply_config();
                Ok(())
            }
            ConfigEffect::StartCalibration => self
                .start_calibration()
                .map_err(|_| RejectReason::NotPermitted),
            ConfigEffect::FactoryReset => Err(RejectReason::UnsupportedRequest),
        }
    }

    /// Mutate the parameters and write them through. Unchanged parameters
    /// are not rewritten; a failed write restores the previous values.
    fn commit(&mut self, change: impl FnOnce(&mut RemoteParams)) -> Result<(), StoreError> {
        let previous = self.params;
        change(&mut self.params);
        if self.params == previous {
            return Ok(());
        }
        if let Err(e) = self.slot.persist(&mut self.store, &self.params) {
            self.params = previous;
            return Err(e);
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), LinkError> {
        self.slot
            .persist(&mut self.store, &self.params)
            .map_err(LinkError::Storage)
    }

    fn apply_config(&mut self) {
        self.indicator
            .set_brightness(brightness_level(&self.params.config));
    }

    /// Send one config request to `target` and wait for an Ok reply.
    async fn exchange(
        &mut self,
        target: HardwareAddress,
        request: ConfigRequest,
    ) -> Result<(), LinkError> {
        let role = self.role;
        let local = self.transport.local_address();
        let params = self.params;
        let telemetry = &mut self.telemetry;
        let peer_calibrating = &mut self.peer_calibrating;
        let clock = &self.clock;

        let exchange = ConfigExchange {
            transport: &mut self.transport,
            clock,
            sequencer: &mut self.sequencer,
            source: role.device_role(),
        };
        let result = exchange
            .request(target, request, CONFIG_REPLY_TIMEOUT_MS, |inbound| {
                absorb(
                    telemetry,
                    peer_calibrating,
                    role,
                    &params,
                    local,
                    &inbound,
                    clock.now_ms(),
                );
            })
            .await;
        expect_ok(result)
    }

    /// Send `request` to the bound peer remote.
    ///
    /// # Errors
    ///
    /// [`LinkError::AddressUnbound`] without sending if no peer is bound,
    /// otherwise the transport error or the peer's reject reason.
    pub async fn exchange_with_peer(&mut self, request: ConfigRequest) -> Result<(), LinkError> {
        self.exchange(self.params.peer_address, request).await
    }

    fn require_primary(&self) -> Result<(), LinkError> {
        match self.role {
            RemoteRole::Primary => Ok(()),
            RemoteRole::Secondary => Err(LinkError::WrongRole),
        }
    }

    /// Change the shared config on the primary.
    ///
    /// The candidate config is sent to the bound peer first and committed
    /// only once the peer accepted it. Without a peer the change is local,
    /// unless `needs_peer`.
    async fn update_config(
        &mut self,
        change: impl FnOnce(&mut RemoteConfig),
        needs_peer: bool,
    ) -> Result<(), LinkError> {
        self.require_primary()?;

        let mut config = self.params.config;
        change(&mut config);
        if config == self.params.config {
            return Ok(());
        }

        match self.params.peer_address.bound() {
            Some(peer) => {
                if let Err(e) = self.exchange(peer, ConfigRequest::SetRemoteParams(config)).await {
                    warn!("peer refused config change: {}", e);
                    return Err(e);
                }
            }
            None if needs_peer => return Err(LinkError::AddressUnbound),
            None => {}
        }

        // The peer already runs the new config, so a storage failure keeps
        // it in memory rather than diverging.
        self.params.config = config;
        self.apply_config();
        self.persist()
    }

    pub async fn set_led_brightness(&mut self, level: u8) -> Result<(), LinkError> {
        let level = level.min(MAX_LED_BRIGHTNESS);
        self.update_config(|c| c.led_brightness = level, false).await
    }

    pub async fn set_deadband(&mut self, percent: u8) -> Result<(), LinkError> {
        let percent = percent.min(MAX_DEADBAND_PERCENT);
        self.update_config(|c| c.deadband_percent = percent, false).await
    }

    pub async fn set_send_repeats(&mut self, repeats: u8) -> Result<(), LinkError> {
        let repeats = repeats.min(MAX_SEND_REPEATS);
        self.update_config(|c| c.send_repeats = repeats, false).await
    }

    pub async fn set_incremental_rotation(
        &mut self,
        left: Option<Button>,
        right: Option<Button>,
    ) -> Result<(), LinkError> {
        self.update_config(
            |c| {
                c.left_incr_rotation = left;
                c.right_incr_rotation = right;
            },
            false,
        )
        .await
    }

    /// Hand primary authority to the left or right remote. Needs a bound
    /// peer, since both remotes must agree on who is primary.
    pub async fn set_left_is_primary(&mut self, left_is_primary: bool) -> Result<(), LinkError> {
        self.update_config(|c| c.left_is_primary = left_is_primary, true)
            .await
    }

    /// Bind the droid locally (console `set_droid`).
    pub fn set_droid_address(&mut self, address: HardwareAddress) -> Result<(), LinkError> {
        self.commit(|p| p.droid_address = address)?;
        info!("droid address set to {}", address);
        Ok(())
    }

    /// Bind the peer remote locally (console `set_other_remote`).
    pub fn set_peer_address(&mut self, address: HardwareAddress) -> Result<(), LinkError> {
        self.commit(|p| p.peer_address = address)?;
        info!("peer address set to {}", address);
        Ok(())
    }

    /// Discover nodes and keep those of `target`'s type as candidates.
    ///
    /// Returns the number of candidates. Starting again while a pairing is
    /// open replaces it.
    pub async fn begin_pairing(&mut self, target: PairTarget) -> Result<usize, LinkError> {
        self.require_primary()?;
        if self.is_calibrating() {
            return Err(LinkError::Busy);
        }

        let mut nodes = NodeList::new();
        self.transport.discover_nodes(&mut nodes).await?;
        let session = PairingSession::from_discovery(target, nodes);
        let count = session.candidates().len();
        info!("pairing {:?}: {} candidates", target, count);

        let mut message: String<32> = String::new();
        let _ = write!(message, "{count} found");
        self.indicator.show_message(&message, Severity::Info);

        self.workflow = Workflow::Pairing(session);
        Ok(count)
    }

    /// Candidates of the open pairing, if any.
    #[must_use]
    pub fn pairing_candidates(&self) -> &[DiscoveredNode] {
        match &self.workflow {
            Workflow::Pairing(session) => session.candidates(),
            _ => &[],
        }
    }

    /// Bind candidate `index` and run the handshake.
    ///
    /// The new address is recorded in memory before the handshake. It is
    /// persisted once the required step succeeded; a failed optional step
    /// still persists and yields [`PairingOutcome::Degraded`].
    ///
    /// A failed required step leaves the address recorded but unsaved; the
    /// next persisted change (a setting or a calibration) writes it to flash.
    ///
    /// # Errors
    ///
    /// [`LinkError::NoSuchCandidate`] if no pairing is open or `index` is
    /// out of range; the required step's error if it failed.
    pub async fn select_candidate(&mut self, index: usize) -> Result<PairingOutcome, LinkError> {
        let Workflow::Pairing(session) = &self.workflow else {
            return Err(LinkError::NoSuchCandidate);
        };
        let target = session.target();
        let selected = session
            .candidate(index)
            .map(|node| node.address)
            .ok_or(LinkError::NoSuchCandidate)?;
        self.workflow = Workflow::Idle;

        let plan = handshake_plan(target, selected, self.transport.local_address(), &self.params);
        match target {
            PairTarget::Droid => self.params.droid_address = selected,
            PairTarget::Remote => self.params.peer_address = selected,
        }
        info!("pairing {:?} with {}", target, selected);

        for step in &plan {
            let Err(error) = self.exchange(step.target, step.request).await else {
                continue;
            };
            let mut message: String<48> = String::new();
            let _ = write!(message, "{}: {}", step.label, error);
            self.indicator.show_message(&message, Severity::Failure);

            if step.required {
                error!("pairing failed at {}: {}", step.label, error);
                return Err(error);
            }
            warn!("pairing degraded at {}: {}", step.label, error);
            self.persist()?;
            return Ok(PairingOutcome::Degraded {
                step: step.kind,
                error,
            });
        }

        self.persist()?;
        self.indicator.show_message("Paired", Severity::Success);
        Ok(PairingOutcome::Complete)
    }

    pub fn cancel_pairing(&mut self) {
        if matches!(self.workflow, Workflow::Pairing(_)) {
            self.workflow = Workflow::Idle;
        }
    }

    /// Enter joystick calibration. Already calibrating is not an error.
    ///
    /// # Errors
    ///
    /// [`LinkError::Busy`] while a pairing is open.
    pub fn start_calibration(&mut self) -> Result<(), LinkError> {
        match self.workflow {
            Workflow::Calibrating(_) => Ok(()),
            Workflow::Pairing(_) => Err(LinkError::Busy),
            Workflow::Idle => {
                info!("calibration started");
                self.workflow = Workflow::Calibrating(CalibrationSession::new());
                self.indicator.set_led(Led::Status, Color::Blue);
                Ok(())
            }
        }
    }

    /// Leave calibration, storing the captured range if it is acceptable.
    ///
    /// Returns `None` if no calibration was active.
    pub fn finish_calibration(&mut self) -> Option<CalibrationOutcome> {
        let Workflow::Calibrating(session) = self.workflow else {
            return None;
        };
        self.workflow = Workflow::Idle;

        let outcome = session.finish();
        match outcome {
            CalibrationOutcome::Accepted { h, v } => {
                match self.commit(|p| {
                    p.h_calib = h;
                    p.v_calib = v;
                }) {
                    Ok(()) => {
                        info!("calibration accepted");
                        self.indicator.flash(FlashPattern::CalibrationAccepted);
                    }
                    Err(e) => {
                        error!("storing calibration failed: {}", e);
                        self.indicator.flash(FlashPattern::CalibrationRejected);
                    }
                }
            }
            CalibrationOutcome::Rejected { .. } => {
                warn!("calibration rejected, range too small");
                self.indicator.flash(FlashPattern::CalibrationRejected);
            }
        }
        Some(outcome)
    }

    /// Ask the peer remote to calibrate its joystick.
    pub async fn calibrate_peer(&mut self) -> Result<(), LinkError> {
        self.require_primary()?;
        self.exchange_with_peer(ConfigRequest::calibrate()).await?;
        self.peer_calibrating = true;
        Ok(())
    }

    /// Tell the peer remote to wipe itself and forget it. The request is
    /// not acknowledged, so a send failure is only logged.
    pub async fn factory_reset_peer(&mut self) -> Result<(), LinkError> {
        self.require_primary()?;
        let peer = self.params.peer_address.bound().ok_or(LinkError::AddressUnbound)?;

        let envelope = Envelope::new(
            self.role.device_role(),
            self.sequencer.next_sequence(PacketType::Config),
            Payload::Config(ConfigMessage::Request(ConfigRequest::factory_reset())),
        );
        if let Err(e) = self.transport.send(peer, &envelope, false).await {
            warn!("factory reset to {} not sent: {}", peer, e);
        }

        self.commit(|p| p.peer_address = HardwareAddress::UNBOUND)?;
        Ok(())
    }

    /// Wipe the parameter store and stop.
    pub fn factory_reset(&mut self) -> ! {
        if let Err(e) = self.store.factory_reset() {
            error!("factory reset failed: {}", e);
        }
        self.indicator.show_message("Please restart", Severity::Info);
        self.indicator.halt()
    }

    /// Human-readable status, one item per line.
    pub fn write_status(&self, out: &mut impl Write) -> fmt::Result {
        let config = &self.params.config;
        writeln!(out, "role: {}", self.role.name())?;
        writeln!(out, "own: {}", self.transport.local_address())?;
        writeln!(out, "droid: {}", self.params.droid_address)?;
        writeln!(out, "other remote: {}", self.params.peer_address)?;
        writeln!(
            out,
            "primary: {}",
            if config.left_is_primary { "left" } else { "right" }
        )?;
        writeln!(
            out,
            "led {} repeats {} deadband {}%",
            config.led_brightness, config.send_repeats, config.deadband_percent
        )?;
        for (name, calib) in [("h", &self.params.h_calib), ("v", &self.params.v_calib)] {
            writeln!(
                out,
                "calib {}: {}/{}/{}",
                name, calib.min, calib.center, calib.max
            )?;
        }
        writeln!(out, "ctl seq: {}", self.sequencer.peek(PacketType::Control))?;
        write_link(out, "droid link", self.telemetry.droid())?;
        write_link(out, "remote link", self.telemetry.peer_remote())?;
        match &self.workflow {
            Workflow::Idle => writeln!(out, "workflow: idle")?,
            Workflow::Pairing(session) => writeln!(
                out,
                "workflow: pairing ({} candidates)",
                session.candidates().len()
            )?,
            Workflow::Calibrating(session) => {
                writeln!(out, "workflow: calibrating ({} samples)", session.samples())?
            }
        }
        if self.peer_calibrating {
            writeln!(out, "peer calibrating")?;
        }
        Ok(())
    }

    /// Run one console line, writing any output to `out`.
    pub async fn handle_console(
        &mut self,
        line: &str,
        out: &mut impl Write,
    ) -> Result<ConsoleAction, ConsoleError> {
        match parse_command(line)? {
            ConsoleCommand::Status => {
                let _ = self.write_status(out);
            }
            ConsoleCommand::RunningStatus(on) => self.running_status = on,
            ConsoleCommand::Testsuite => return Ok(ConsoleAction::RunTestsuite),
            ConsoleCommand::CalibrateImu => return Ok(ConsoleAction::CalibrateImu),
            ConsoleCommand::Calibrate => self.start_calibration()?,
            ConsoleCommand::Reset => self.factory_reset(),
            ConsoleCommand::SetDroid(address) => self.set_droid_address(address)?,
            ConsoleCommand::SetOtherRemote(address) => self.set_peer_address(address)?,
            ConsoleCommand::PairDroid => self.pair_and_list(PairTarget::Droid, out).await?,
            ConsoleCommand::PairRemote => self.pair_and_list(PairTarget::Remote, out).await?,
            ConsoleCommand::PairSelect(index) => match self.select_candidate(index).await? {
                PairingOutcome::Complete => {
                    let _ = writeln!(out, "paired");
                }
                PairingOutcome::Degraded { step, error } => {
                    let _ = writeln!(out, "paired, but {step:?} failed: {error}");
                }
            },
            ConsoleCommand::PairCancel => self.cancel_pairing(),
            ConsoleCommand::Set(Setting::LedBrightness, value) => {
                self.set_led_brightness(value).await?;
            }
            ConsoleCommand::Set(Setting::Deadband, value) => self.set_deadband(value).await?,
            ConsoleCommand::Set(Setting::SendRepeats, value) => {
                self.set_send_repeats(value).await?;
            }
            ConsoleCommand::Primary(side) => {
                self.set_left_is_primary(side == Side::Left).await?;
            }
        }
        Ok(ConsoleAction::Done)
    }

    async fn pair_and_list(
        &mut self,
        target: PairTarget,
        out: &mut impl Write,
    ) -> Result<(), LinkError> {
        self.begin_pairing(target).await?;
        for (i, node) in self.pairing_candidates().iter().enumerate() {
            let _ = writeln!(out, "{i}: {} {}", node.name, node.address);
        }
        Ok(())
    }
}

const fn brightness_level(config: &RemoteConfig) -> u8 {
    config.led_brightness << 2
}

fn write_link(out: &mut impl Write, name: &str, link: &PeerLinkState) -> fmt::Result {
    let liveness = match link.liveness() {
        Liveness::Live => "live",
        Liveness::NoComm => "no comm",
    };
    writeln!(
        out,
        "{}: {} rx {} missed {} rssi -{}",
        name,
        liveness,
        link.received(),
        link.missed(),
        link.rssi()
    )
}

/// Feed a non-config envelope to telemetry. Shared by the main dispatch and
/// by config exchanges waiting for a reply.
fn absorb(
    telemetry: &mut TelemetryIngest,
    peer_calibrating: &mut bool,
    role: RemoteRole,
    params: &RemoteParams,
    local: HardwareAddress,
    inbound: &Inbound,
    now_ms: u64,
) {
    if inbound.source == local {
        trace!("dropping loop-back envelope");
        return;
    }
    if let Payload::Config(_) = inbound.envelope.payload {
        trace!("dropping config envelope from {}", inbound.source);
        return;
    }

    match telemetry.ingest(role, params, inbound, now_ms) {
        Ok(report) => {
            if report.missed > 0 {
                debug!("{:?}: {} envelopes missed", report.source, report.missed);
            }
            let peer_done = report.source == TelemetrySource::PeerRemote
                && telemetry
                    .peer_control()
                    .is_some_and(|c| c.buttons.intersects(PEER_CALIBRATION_DONE));
            if *peer_calibrating && peer_done {
                info!("peer calibration finished");
                *peer_calibrating = false;
            }
        }
        Err(_) => warn!(
            "unexpected {:?} from {} ({:?})",
            inbound.envelope.packet_type(),
            inbound.source,
            inbound.envelope.source
        ),
    }
}
