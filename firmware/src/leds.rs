//! Status and comm RGB LEDs on PWM, implementing [`Indicator`].
//!
//! # Pins
//!
//! | LED    | R | G | B |
//! |--------|---|---|---|
//! | Status | 2 | 3 | 4 |
//! | Comm   | 5 | 6 | 7 |
//!
//! GPIO 2..7 map onto PWM slices 1..3, channels A and B in turn. LEDs are
//! common cathode (high = on).

use core::fmt::Write;

use defmt::{error, info, warn};
use embassy_rp::pwm::{Config, Pwm};
use embassy_time::{block_for, Duration};
use remote_core::{Color, FlashPattern, Indicator, Led, Severity};

use crate::console::{ConsoleText, OutputSender};

/// PWM counter top; duty 0..=TOP.
const PWM_TOP: u16 = 0x0FFF;

/// Highest brightness level the core asks for.
const MAX_LEVEL: u8 = 31;

const FLASH_ON: Duration = Duration::from_millis(150);
const FLASH_OFF: Duration = Duration::from_millis(150);

/// Both RGB indicators. Messages are echoed to the USB console.
pub struct RgbLeds<'d> {
    slices: [Pwm<'d>; 3],
    config: Config,
    status: Color,
    comm: Color,
    level: u8,
    console: OutputSender<'d>,
}

impl<'d> RgbLeds<'d> {
    /// `slices` drive GPIO 2/3, 4/5 and 6/7 on their A/B outputs.
    #[must_use]
    pub fn new(slices: [Pwm<'d>; 3], console: OutputSender<'d>) -> Self {
        let mut config = Config::default();
        config.top = PWM_TOP;
        let mut leds = Self {
            slices,
            config,
            status: Color::Off,
            comm: Color::Off,
            level: MAX_LEVEL,
            console,
        };
        leds.refresh();
        leds
    }

    fn refresh(&mut self) {
        let duty = (u32::from(self.level.min(MAX_LEVEL)) * u32::from(PWM_TOP)
            / u32::from(MAX_LEVEL)) as u16;
        let (sr, sg, sb) = rgb(self.status);
        let (cr, cg, cb) = rgb(self.comm);
        let channels = [sr, sg, sb, cr, cg, cb].map(|on| if on { duty } else { 0 });

        for (slice, pair) in self.slices.iter_mut().zip(channels.chunks_exact(2)) {
            self.config.compare_a = pair[0];
            self.config.compare_b = pair[1];
            slice.set_config(&self.config);
        }
    }
}

const fn rgb(color: Color) -> (bool, bool, bool) {
    match color {
        Color::Off => (false, false, false),
        Color::White => (true, true, true),
        Color::Red => (true, false, false),
        Color::Green => (false, true, false),
        Color::Blue => (false, false, true),
        Color::Yellow => (true, true, false),
        Color::Magenta => (true, false, true),
    }
}

impl Indicator for RgbLeds<'_> {
    fn set_led(&mut self, led: Led, color: Color) {
        let slot = match led {
            Led::Status => &mut self.status,
            Led::Comm => &mut self.comm,
        };
        if *slot != color {
            *slot = color;
            self.refresh();
        }
    }

    fn set_brightness(&mut self, level: u8) {
        if self.level != level {
            self.level = level;
            self.refresh();
        }
    }

    /// Blocks for the length of the pattern.
    fn flash(&mut self, pattern: FlashPattern) {
        let color = match pattern {
            FlashPattern::CalibrationAccepted => Color::Green,
            FlashPattern::CalibrationRejected => Color::Red,
        };
        let previous = self.status;
        for _ in 0..2 {
            self.status = color;
            self.refresh();
            block_for(FLASH_ON);
            self.status = Color::Off;
            self.refresh();
            block_for(FLASH_OFF);
        }
        self.status = previous;
        self.refresh();
    }

    fn show_message(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!("{}", message),
            Severity::Failure => warn!("{}", message),
        }
        let mut text = ConsoleText::new();
        let _ = writeln!(text, "{}", message);
        if self.console.try_send(text).is_err() {
            warn!("console busy, message not echoed");
        }
    }

    /// Solid red until power cycled.
    fn halt(&mut self) -> ! {
        error!("halted, restart required");
        self.status = Color::Red;
        self.comm = Color::Off;
        self.refresh();
        loop {
            cortex_m::asm::wfi();
        }
    }
}
