//! Operator-facing indicators: LEDs, flash patterns and short messages.

/// The two RGB indicators on a remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    /// Overall health and mode.
    Status,
    /// Radio activity and binding state.
    Comm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Off,
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
}

/// Short blocking light sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashPattern {
    /// Double green flash.
    CalibrationAccepted,
    /// Double red flash.
    CalibrationRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    Info,
    Success,
    Failure,
}

/// Sink for everything the operator sees besides the console.
pub trait Indicator {
    fn set_led(&mut self, led: Led, color: Color);

    /// Global LED brightness, 0..=31.
    fn set_brightness(&mut self, level: u8);

    fn flash(&mut self, pattern: FlashPattern);

    /// Show a short message, e.g. "L ID -> D: timeout".
    fn show_message(&mut self, message: &str, severity: Severity);

    /// Show "please restart" forever. Entered after a factory reset.
    fn halt(&mut self) -> !;
}
