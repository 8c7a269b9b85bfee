//! Test doubles for the core traits.

extern crate std;

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use remote_proto::{ConfigKind, ConfigMessage, Envelope, HardwareAddress, Payload, ReplyCode};

use crate::clock::Clock;
use crate::indicator::{Color, FlashPattern, Indicator, Led, Severity};
use crate::transport::{DiscoveredNode, Inbound, LinkTransport, NodeList, TransportError};

/// Drive a future that never pends (all mocks complete immediately).
pub fn block_on<F: Future>(mut f: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);

    // SAFETY: We don't move f after pinning
    let mut f = unsafe { Pin::new_unchecked(&mut f) };

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {
                panic!("Mock future returned Pending unexpectedly");
            }
        }
    }
}

#[derive(Default)]
struct TransportState {
    local: HardwareAddress,
    sent: Vec<(HardwareAddress, Envelope)>,
    inbound: VecDeque<Inbound>,
    send_error: Option<TransportError>,
    unreachable: Vec<HardwareAddress>,
    /// Peers that answer config requests, and with what.
    responders: Vec<(HardwareAddress, ReplyCode)>,
    /// Per-kind overrides of `responders`; `None` stays silent.
    kind_responders: Vec<(HardwareAddress, ConfigKind, Option<ReplyCode>)>,
    nodes: Vec<DiscoveredNode>,
}

/// In-memory radio. Clones share state so a test can keep a handle after
/// moving the transport into a `Remote`.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(local: HardwareAddress) -> Self {
        let transport = Self::new();
        transport.state.borrow_mut().local = local;
        transport
    }

    pub fn sent(&self) -> Vec<(HardwareAddress, Envelope)> {
        self.state.borrow().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.state.borrow_mut().sent.clear();
    }

    /// Config requests sent so far, with their targets.
    pub fn sent_requests(&self) -> Vec<(HardwareAddress, remote_proto::ConfigRequest)> {
        self.state
            .borrow()
            .sent
            .iter()
            .filter_map(|(to, env)| match env.payload {
                Payload::Config(ConfigMessage::Request(req)) => Some((*to, req)),
                _ => None,
            })
            .collect()
    }

    pub fn push_inbound(&self, inbound: Inbound) {
        self.state.borrow_mut().inbound.push_back(inbound);
    }

    pub fn fail_sends(&self, error: TransportError) {
        self.state.borrow_mut().send_error = Some(error);
    }

    pub fn make_unreachable(&self, address: HardwareAddress) {
        self.state.borrow_mut().unreachable.push(address);
    }

    /// Answer every config request sent to `address` with `code`.
    pub fn respond(&self, address: HardwareAddress, code: ReplyCode) {
        let mut state = self.state.borrow_mut();
        state.responders.retain(|(a, _)| *a != address);
        state.responders.push((address, code));
    }

    /// Answer `kind` requests sent to `address` with `code`, or not at all
    /// when `None`. Takes precedence over [`MockTransport::respond`].
    pub fn respond_to(&self, address: HardwareAddress, kind: ConfigKind, code: Option<ReplyCode>) {
        let mut state = self.state.borrow_mut();
        state
            .kind_responders
            .retain(|(a, k, _)| !(*a == address && *k == kind));
        state.kind_responders.push((address, kind, code));
    }

    pub fn add_node(&self, node: DiscoveredNode) {
        self.state.borrow_mut().nodes.push(node);
    }
}

impl LinkTransport for MockTransport {
    fn send(
        &mut self,
        to: HardwareAddress,
        envelope: &Envelope,
        allow_broadcast: bool,
    ) -> impl Future<Output = Result<(), TransportError>> {
        let mut state = self.state.borrow_mut();
        let result = if to.is_broadcast() && !allow_broadcast {
            Err(TransportError::BroadcastNotAllowed)
        } else if let Some(e) = state.send_error {
            Err(e)
        } else if state.unreachable.contains(&to) {
            Err(TransportError::Unreachable)
        } else {
            state.sent.push((to, *envelope));
            if let Payload::Config(ConfigMessage::Request(req)) = envelope.payload {
                let code = match state
                    .kind_responders
                    .iter()
                    .find(|(a, k, _)| *a == to && *k == req.kind())
                {
                    Some((_, _, code)) => *code,
                    None => state
                        .responders
                        .iter()
                        .find(|(a, _)| *a == to)
                        .map(|(_, code)| *code),
                };
                if let Some(code) = code {
                    state.inbound.push_back(Inbound {
                        source: to,
                        rssi: 40,
                        envelope: Envelope::new(
                            remote_proto::DeviceRole::SecondaryRemote,
                            0,
                            Payload::Config(ConfigMessage::reply(req.kind(), code)),
                        ),
                    });
                }
            }
            Ok(())
        };
        core::future::ready(result)
    }

    fn receive(&mut self, _timeout_ms: u32) -> impl Future<Output = Result<Inbound, TransportError>> {
        core::future::ready(
            self.state
                .borrow_mut()
                .inbound
                .pop_front()
                .ok_or(TransportError::Timeout),
        )
    }

    fn try_receive(&mut self) -> Option<Inbound> {
        self.state.borrow_mut().inbound.pop_front()
    }

    fn discover_nodes(
        &mut self,
        nodes: &mut NodeList,
    ) -> impl Future<Output = Result<(), TransportError>> {
        nodes.clear();
        for node in self.state.borrow().nodes.iter().take(nodes.capacity()) {
            let _ = nodes.push(node.clone());
        }
        core::future::ready(Ok(()))
    }

    fn local_address(&self) -> HardwareAddress {
        self.state.borrow().local
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// Manually advanced clock.
#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Default)]
pub struct IndicatorLog {
    pub leds: Vec<(Led, Color)>,
    pub brightness: Vec<u8>,
    pub flashes: Vec<FlashPattern>,
    pub messages: Vec<(String, Severity)>,
}

/// Records everything shown to the operator. `halt` panics with "halted".
#[derive(Clone, Default)]
pub struct MockIndicator {
    log: Rc<RefCell<IndicatorLog>>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_led(&self, led: Led) -> Option<Color> {
        self.log
            .borrow()
            .leds
            .iter()
            .rev()
            .find(|(l, _)| *l == led)
            .map(|(_, c)| *c)
    }

    pub fn last_brightness(&self) -> Option<u8> {
        self.log.borrow().brightness.last().copied()
    }

    pub fn flashes(&self) -> Vec<FlashPattern> {
        self.log.borrow().flashes.clone()
    }

    pub fn messages(&self) -> Vec<(String, Severity)> {
        self.log.borrow().messages.clone()
    }
}

impl Indicator for MockIndicator {
    fn set_led(&mut self, led: Led, color: Color) {
        self.log.borrow_mut().leds.push((led, color));
    }

    fn set_brightness(&mut self, level: u8) {
        self.log.borrow_mut().brightness.push(level);
    }

    fn flash(&mut self, pattern: FlashPattern) {
        self.log.borrow_mut().flashes.push(pattern);
    }

    fn show_message(&mut self, message: &str, severity: Severity) {
        self.log
            .borrow_mut()
            .messages
            .push((message.to_string(), severity));
    }

    fn halt(&mut self) -> ! {
        panic!("halted");
    }
}
