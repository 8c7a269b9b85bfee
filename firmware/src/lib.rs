//! RP2040 firmware for the droid remotes.
//!
//! Each remote is a Raspberry Pi Pico with an XBee 802.15.4 module, a
//! two-axis stick, eight buttons, a pot and two RGB LEDs. The same image
//! builds for either hand; the Cargo feature picks the role.
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with five tasks:
//!
//! - **Radio RX**: parses XBee frames from UART0 into queued envelopes and
//!   local replies ([`radio::RadioReceiver`])
//! - **USB**: runs the USB device stack
//! - **Console RX / TX**: CDC-ACM command lines in, command output out
//!   ([`console`])
//! - **Remote**: the 10 ms tick driving [`remote_core::Remote`], interleaved
//!   with console commands
//!
//! # Modules
//!
//! - [`radio`]: XBee transport ([`XBeeRadio`])
//! - [`flash`]: parameter sector of the on-chip flash ([`ParamsFlash`])
//! - [`leds`]: PWM RGB indicators ([`RgbLeds`])
//! - [`input`]: ADC and button sampling ([`InputPins`])
//! - [`console`]: USB console plumbing
//! - [`selftest`]: the `testsuite` command
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//! - **`left-remote`** (default): Build the left remote
//! - **`right-remote`**: Build the right remote

#![no_std]

#[cfg(all(feature = "left-remote", feature = "right-remote"))]
compile_error!("Cannot enable both `left-remote` and `right-remote` - pick the hand this image is for");

#[cfg(not(any(feature = "left-remote", feature = "right-remote")))]
compile_error!("Enable one of `left-remote` or `right-remote`");

pub mod console;
pub mod flash;
pub mod input;
pub mod leds;
pub mod radio;
pub mod selftest;

use embassy_time::Instant;
use remote_core::{Clock, FlashParamStore, Remote, RemoteRole};

pub use console::{ConsoleReader, ConsoleWriter};
pub use flash::ParamsFlash;
pub use input::InputPins;
pub use leds::RgbLeds;
pub use radio::{RadioReceiver, XBeeRadio};

/// Role this image runs as.
#[cfg(feature = "left-remote")]
pub const ROLE: RemoteRole = RemoteRole::Primary;
#[cfg(all(feature = "right-remote", not(feature = "left-remote")))]
pub const ROLE: RemoteRole = RemoteRole::Secondary;

/// Remote tick period.
pub const TICK_MS: u64 = 10;

/// Milliseconds from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// The remote as wired on this board.
pub type BoardRemote =
    Remote<XBeeRadio<'static>, FlashParamStore<ParamsFlash<'static>>, RgbLeds<'static>, EmbassyClock>;
