//! XBee radio on UART0, implementing [`LinkTransport`].
//!
//! The UART is split: [`RadioReceiver`] owns RX and runs in its own task,
//! turning API frames into queued [`Inbound`] envelopes or local replies
//! (TX status, AT responses). [`XBeeRadio`] owns TX and is driven by the
//! remote's main loop.
//!
//! # Pins
//!
//! - GPIO 0: UART0 TX (to XBee DIN)
//! - GPIO 1: UART0 RX (from XBee DOUT)
//!
//! The module must be configured for API mode 1 (`AP=1`) at 115200 baud.

use defmt::{debug, info, warn};
use embassy_rp::uart::{Async, UartRx, UartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{with_timeout, Duration, Instant};
use heapless::Vec;
use remote_core::{
    DiscoveredNode, Inbound, LinkTransport, NodeList, StationId, TransportError,
};
use remote_proto::{Envelope, HardwareAddress, MAX_ENVELOPE_SIZE};
use xbee_proto::{
    encode_at_command, encode_tx64, parse_node_discovery, AtStatus, DeliveryStatus, Frame,
    XBeeParser, FRAME_OVERHEAD, MAX_AT_DATA, MAX_RF_DATA,
};

/// UART baud rate the XBee is configured for.
pub const BAUD_RATE: u32 = 115_200;

/// Inbound envelopes buffered between ticks.
pub const INBOUND_DEPTH: usize = 8;

/// TX status and AT responses waiting for the sender.
pub const REPLY_DEPTH: usize = 4;

const TX_STATUS_TIMEOUT: Duration = Duration::from_millis(100);
const AT_TIMEOUT: Duration = Duration::from_millis(500);
/// `ND` answers for up to `NT` (default 2.5 s) plus margin.
const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(3_000);

const TX_FRAME_SIZE: usize = FRAME_OVERHEAD + 11 + MAX_RF_DATA;
const AT_FRAME_SIZE: usize = FRAME_OVERHEAD + 4 + MAX_AT_DATA;

pub type InboundChannel = Channel<CriticalSectionRawMutex, Inbound, INBOUND_DEPTH>;
pub type ReplyChannel = Channel<CriticalSectionRawMutex, Frame, REPLY_DEPTH>;

/// RX half: parses the byte stream and routes frames.
pub struct RadioReceiver<'d> {
    rx: UartRx<'d, Async>,
    parser: XBeeParser,
    inbound: Sender<'d, CriticalSectionRawMutex, Inbound, INBOUND_DEPTH>,
    replies: Sender<'d, CriticalSectionRawMutex, Frame, REPLY_DEPTH>,
}

impl<'d> RadioReceiver<'d> {
    #[must_use]
    pub fn new(
        rx: UartRx<'d, Async>,
        inbound: &'d InboundChannel,
        replies: &'d ReplyChannel,
    ) -> Self {
        Self {
            rx,
            parser: XBeeParser::new(),
            inbound: inbound.sender(),
            replies: replies.sender(),
        }
    }

    /// Read and dispatch frames forever.
    pub async fn run(&mut self) -> ! {
        let mut byte = [0u8; 1];
        loop {
            if let Err(e) = self.rx.read(&mut byte).await {
                warn!("radio uart: {:?}", e);
                self.parser.reset();
                continue;
            }
            match self.parser.push_byte(byte[0]) {
                Ok(Some(frame)) => self.dispatch(frame),
                Ok(None) => {}
                // Parser already resynchronised on the next start delimiter.
                Err(e) => debug!("xbee frame dropped: {:?}", e),
            }
        }
    }

    fn dispatch(&mut self, frame: Frame) {
        match frame {
            Frame::Rx64 {
                source, rssi, data, ..
            } => match Envelope::decode(&data) {
                Ok(envelope) => {
                    let inbound = Inbound {
                        source,
                        rssi,
                        envelope,
                    };
                    if self.inbound.try_send(inbound).is_err() {
                        warn!("inbound queue full, dropping envelope from {:?}", source);
                    }
                }
                Err(e) => debug!("undecodable envelope from {:?}: {:?}", source, e),
            },
            Frame::TxStatus { .. } | Frame::AtResponse { .. } => {
                if self.replies.try_send(frame).is_err() {
                    warn!("reply queue full");
                }
            }
            Frame::Unsupported(api_id) => debug!("ignoring api frame {:x}", api_id),
        }
    }
}

/// TX half plus the queues filled by [`RadioReceiver`].
pub struct XBeeRadio<'d> {
    tx: UartTx<'d, Async>,
    inbound: Receiver<'d, CriticalSectionRawMutex, Inbound, INBOUND_DEPTH>,
    replies: Receiver<'d, CriticalSectionRawMutex, Frame, REPLY_DEPTH>,
    frame_id: u8,
    local: HardwareAddress,
    ready: bool,
}

impl<'d> XBeeRadio<'d> {
    /// Create the radio and read its serial number.
    ///
    /// A module that does not answer `SH`/`SL` leaves the radio not ready;
    /// every send then fails with [`TransportError::NotReady`].
    pub async fn new(
        tx: UartTx<'d, Async>,
        inbound: &'d InboundChannel,
        replies: &'d ReplyChannel,
    ) -> Self {
        let mut radio = Self {
            tx,
            inbound: inbound.receiver(),
            replies: replies.receiver(),
            frame_id: 0,
            local: HardwareAddress::UNBOUND,
            ready: false,
        };
        match radio.read_serial_number().await {
            Ok(address) => {
                info!("xbee ready, address {:?}", address);
                radio.local = address;
                radio.ready = true;
            }
            Err(e) => warn!("xbee not responding: {:?}", e),
        }
        radio
    }

    async fn read_serial_number(&mut self) -> Result<HardwareAddress, TransportError> {
        let hi = self.at_command(*b"SH", &[]).await?;
        let lo = self.at_command(*b"SL", &[]).await?;
        Ok(HardwareAddress::new(be_u32(&hi)?, be_u32(&lo)?))
    }

    /// Frame ids cycle through 1..=255; 0 would suppress the response.
    fn next_frame_id(&mut self) -> u8 {
        self.frame_id = self.frame_id.wrapping_add(1).max(1);
        self.frame_id
    }

    /// Drop replies left over from an earlier, timed-out request.
    fn flush_replies(&mut self) {
        while self.replies.try_receive().is_ok() {}
    }

    async fn write(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.tx.write(frame).await.map_err(|e| {
            warn!("radio uart write: {:?}", e);
            TransportError::Io
        })
    }

    async fn at_command(
        &mut self,
        command: [u8; 2],
        parameter: &[u8],
    ) -> Result<Vec<u8, MAX_AT_DATA>, TransportError> {
        self.flush_replies();
        let id = self.next_frame_id();
        let mut buf = [0u8; AT_FRAME_SIZE];
        let len = encode_at_command(id, command, parameter, &mut buf)
            .map_err(|_| TransportError::Encode)?;
        self.write(&buf[..len]).await?;

        let deadline = Instant::now() + AT_TIMEOUT;
        loop {
            match self.next_reply(deadline).await? {
                Frame::AtResponse {
                    frame_id,
                    status,
                    data,
                    ..
                } if frame_id == id => {
                    return match status {
                        AtStatus::Ok => Ok(data),
                        other => {
                            warn!("AT {:?} failed: {:?}", command, other);
                            Err(TransportError::Io)
                        }
                    };
                }
                _ => {}
            }
        }
    }

    async fn next_reply(&mut self, deadline: Instant) -> Result<Frame, TransportError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        with_timeout(remaining, self.replies.receive())
            .await
            .map_err(|_| TransportError::Timeout)
    }
}

impl LinkTransport for XBeeRadio<'_> {
    async fn send(
        &mut self,
        to: HardwareAddress,
        envelope: &Envelope,
        allow_broadcast: bool,
    ) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        if to.is_broadcast() && !allow_broadcast {
            return Err(TransportError::BroadcastNotAllowed);
        }

        let mut payload = [0u8; MAX_ENVELOPE_SIZE];
        let payload_len = envelope.encode(&mut payload)?;
        self.flush_replies();
        let id = self.next_frame_id();
        let mut buf = [0u8; TX_FRAME_SIZE];
        let len = encode_tx64(id, to, 0, &payload[..payload_len], &mut buf)
            .map_err(|_| TransportError::Encode)?;
        self.write(&buf[..len]).await?;

        let deadline = Instant::now() + TX_STATUS_TIMEOUT;
        loop {
            if let Frame::TxStatus { frame_id, status } = self.next_reply(deadline).await? {
                if frame_id != id {
                    continue;
                }
                return match status {
                    DeliveryStatus::Success => Ok(()),
                    DeliveryStatus::NoAck => Err(TransportError::Unreachable),
                    DeliveryStatus::CcaFailure => Err(TransportError::Busy),
                    DeliveryStatus::Purged | DeliveryStatus::Other(_) => Err(TransportError::Io),
                };
            }
        }
    }

    async fn receive(&mut self, timeout_ms: u32) -> Result<Inbound, TransportError> {
        with_timeout(
            Duration::from_millis(timeout_ms.into()),
            self.inbound.receive(),
        )
        .await
        .map_err(|_| TransportError::Timeout)
    }

    fn try_receive(&mut self) -> Option<Inbound> {
        self.inbound.try_receive().ok()
    }

    async fn discover_nodes(&mut self, nodes: &mut NodeList) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        nodes.clear();
        self.flush_replies();
        let id = self.next_frame_id();
        let mut buf = [0u8; AT_FRAME_SIZE];
        let len =
            encode_at_command(id, *b"ND", &[], &mut buf).map_err(|_| TransportError::Encode)?;
        self.write(&buf[..len]).await?;

        // One response per node, then an empty one when discovery ends.
        let deadline = Instant::now() + DISCOVERY_TIMEOUT;
        loop {
            let frame = match self.next_reply(deadline).await {
                Ok(frame) => frame,
                Err(TransportError::Timeout) => break,
                Err(e) => return Err(e),
            };
            let Frame::AtResponse { frame_id, data, .. } = frame else {
                continue;
            };
            if frame_id != id {
                continue;
            }
            if data.is_empty() {
                break;
            }
            match parse_node_discovery(&data) {
                Ok(node) => {
                    let discovered = DiscoveredNode {
                        address: node.address,
                        name: node.name,
                        station: StationId(node.my),
                    };
                    if nodes.push(discovered).is_err() {
                        warn!("discovery list full");
                    }
                }
                Err(e) => debug!("bad ND record: {:?}", e),
            }
        }
        info!("discovery found {} nodes", nodes.len());
        Ok(())
    }

    fn local_address(&self) -> HardwareAddress {
        self.local
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// `SH`/`SL` values come back big-endian, possibly without leading zeros.
fn be_u32(bytes: &[u8]) -> Result<u32, TransportError> {
    if bytes.is_empty() || bytes.len() > 4 {
        return Err(TransportError::Io);
    }
    Ok(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}
