//! Operator console over USB CDC-ACM.
//!
//! [`ConsoleReader`] assembles newline-terminated commands and queues them
//! for the remote task; [`ConsoleWriter`] drains command output back to the
//! host. Lines and output travel through static channels so the remote task
//! never blocks on USB.

use core::fmt::Write;

use defmt::{info, warn};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_usb::class::cdc_acm::{self, CdcAcmClass};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use heapless::{String, Vec};
use remote_core::{
    Clock, ConsoleAction, Indicator, LinkTransport, ParamStore, Remote, MAX_COMMAND_LENGTH,
};

use crate::input::InputPins;

/// Full-speed bulk packet size.
pub const PACKET_SIZE: usize = 64;

/// Output of one command, e.g. the `status` report.
pub const OUTPUT_CAPACITY: usize = 1024;

pub type ConsoleLine = String<MAX_COMMAND_LENGTH>;
pub type ConsoleText = String<OUTPUT_CAPACITY>;

pub type LineChannel = Channel<CriticalSectionRawMutex, ConsoleLine, 2>;
pub type OutputChannel = Channel<CriticalSectionRawMutex, ConsoleText, 2>;
pub type OutputSender<'d> = Sender<'d, CriticalSectionRawMutex, ConsoleText, 2>;

type UsbDriver<'d> = Driver<'d, USB>;

/// Add the CDC-ACM class to the USB builder.
pub fn configure_usb_console<'d>(
    builder: &mut Builder<'d, UsbDriver<'d>>,
    state: &'d mut cdc_acm::State<'d>,
) -> CdcAcmClass<'d, UsbDriver<'d>> {
    CdcAcmClass::new(builder, state, PACKET_SIZE as u16)
}

/// Reads command lines from the host.
pub struct ConsoleReader<'d> {
    rx: cdc_acm::Receiver<'d, UsbDriver<'d>>,
    lines: Sender<'d, CriticalSectionRawMutex, ConsoleLine, 2>,
    buffer: Vec<u8, MAX_COMMAND_LENGTH>,
    overflow: bool,
}

impl<'d> ConsoleReader<'d> {
    #[must_use]
    pub fn new(rx: cdc_acm::Receiver<'d, UsbDriver<'d>>, lines: &'d LineChannel) -> Self {
        Self {
            rx,
            lines: lines.sender(),
            buffer: Vec::new(),
            overflow: false,
        }
    }

    pub async fn run(&mut self) -> ! {
        let mut packet = [0u8; PACKET_SIZE];
        loop {
            self.rx.wait_connection().await;
            info!("console connected");
            loop {
                match self.rx.read_packet(&mut packet).await {
                    Ok(n) => {
                        for &byte in &packet[..n] {
                            self.feed(byte).await;
                        }
                    }
                    Err(EndpointError::Disabled) => break,
                    Err(EndpointError::BufferOverflow) => warn!("console packet overflow"),
                }
            }
            self.buffer.clear();
            self.overflow = false;
        }
    }

    /// A line longer than the buffer is dropped whole, up to its newline.
    async fn feed(&mut self, byte: u8) {
        if byte != b'\n' && byte != b'\r' {
            if self.buffer.push(byte).is_err() {
                self.overflow = true;
            }
            return;
        }
        if self.overflow {
            warn!("console line too long, dropped");
        } else if let Ok(text) = core::str::from_utf8(&self.buffer) {
            let mut line = ConsoleLine::new();
            if !text.trim().is_empty() && line.push_str(text).is_ok() {
                self.lines.send(line).await;
            }
        }
        self.buffer.clear();
        self.overflow = false;
    }
}

/// Writes queued command output to the host.
pub struct ConsoleWriter<'d> {
    tx: cdc_acm::Sender<'d, UsbDriver<'d>>,
    output: Receiver<'d, CriticalSectionRawMutex, ConsoleText, 2>,
    packet: Vec<u8, PACKET_SIZE>,
}

impl<'d> ConsoleWriter<'d> {
    #[must_use]
    pub fn new(tx: cdc_acm::Sender<'d, UsbDriver<'d>>, output: &'d OutputChannel) -> Self {
        Self {
            tx,
            output: output.receiver(),
            packet: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.tx.wait_connection().await;
            while self.write_text().await.is_ok() {}
        }
    }

    async fn write_text(&mut self) -> Result<(), EndpointError> {
        let text = self.output.receive().await;
        self.packet.clear();
        for &byte in text.as_bytes() {
            if byte == b'\n' {
                self.put(b'\r').await?;
            }
            self.put(byte).await?;
        }
        // A transfer ending on a full packet needs a zero-length terminator.
        let len = self.packet.len();
        self.tx.write_packet(&self.packet).await?;
        if len == PACKET_SIZE {
            self.tx.write_packet(&[]).await?;
        }
        Ok(())
    }

    async fn put(&mut self, byte: u8) -> Result<(), EndpointError> {
        if self.packet.is_full() {
            self.tx.write_packet(&self.packet).await?;
            self.packet.clear();
        }
        let _ = self.packet.push(byte);
        Ok(())
    }
}

/// Run one console line against the remote, writing its output to `out`.
///
/// Board-level commands (`testsuite`, `calibrate_imu`) are handled here;
/// everything else is the remote's.
pub async fn run_line<T, S, D, C>(
    remote: &mut Remote<T, S, D, C>,
    inputs: &mut InputPins<'_>,
    line: &str,
    out: &mut ConsoleText,
) where
    T: LinkTransport,
    S: ParamStore,
    D: Indicator,
    C: Clock,
{
    match remote.handle_console(line, out).await {
        Ok(ConsoleAction::Done) => {
            let _ = writeln!(out, "ok");
        }
        Ok(ConsoleAction::RunTestsuite) => {
            let passed = crate::selftest::run(remote.transport(), inputs, out).await;
            let _ = writeln!(out, "{}", if passed { "ok" } else { "FAILED" });
        }
        Ok(ConsoleAction::CalibrateImu) => {
            let _ = writeln!(out, "error: no IMU fitted");
        }
        Err(e) => {
            let _ = writeln!(out, "error: {}", e);
        }
    }
}
