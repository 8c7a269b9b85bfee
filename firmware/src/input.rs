//! Stick, potentiometer, battery and button sampling.
//!
//! # Pins
//!
//! | Function        | GPIO  | Notes |
//! |-----------------|-------|-------|
//! | Stick H / V     | 26/27 | ADC0/ADC1, 12 bit |
//! | Pot 1           | 28    | ADC2 |
//! | VSYS / 3        | 29    | ADC3, battery |
//! | B1..B4          | 10-13 | active low, pulled up |
//! | Joy, Confirm    | 14/15 | |
//! | Left, Right     | 16/17 | |

use embassy_rp::adc::{Adc, Async, Channel};
use embassy_rp::gpio::Input;
use remote_core::RawInput;
use remote_proto::Buttons;

/// Battery empty and full, millivolts (single LiPo cell on VSYS).
const BATTERY_EMPTY_MV: u32 = 3_300;
const BATTERY_FULL_MV: u32 = 4_200;

/// Physical inputs of one remote.
pub struct InputPins<'d> {
    adc: Adc<'d, Async>,
    joy_h: Channel<'d>,
    joy_v: Channel<'d>,
    pot: Channel<'d>,
    vsys: Channel<'d>,
    /// In [`Buttons`] bit order: B1..B4, Joy, Confirm, Left, Right.
    buttons: [Input<'d>; 8],
}

impl<'d> InputPins<'d> {
    #[must_use]
    pub fn new(
        adc: Adc<'d, Async>,
        joy_h: Channel<'d>,
        joy_v: Channel<'d>,
        pot: Channel<'d>,
        vsys: Channel<'d>,
        buttons: [Input<'d>; 8],
    ) -> Self {
        Self {
            adc,
            joy_h,
            joy_v,
            pot,
            vsys,
            buttons,
        }
    }

    /// Take one sample. A failed conversion marks the sample unhealthy and
    /// leaves that reading at its neutral value.
    pub async fn sample(&mut self) -> RawInput {
        let mut input = RawInput {
            buttons: self.buttons(),
            ..RawInput::default()
        };

        match self.adc.read(&mut self.joy_h).await {
            Ok(raw) => input.joy_h = raw,
            Err(_) => input.healthy = false,
        }
        match self.adc.read(&mut self.joy_v).await {
            Ok(raw) => input.joy_v = raw,
            Err(_) => input.healthy = false,
        }
        match self.adc.read(&mut self.pot).await {
            Ok(raw) => input.pot1 = (raw >> 4) as u8,
            Err(_) => input.healthy = false,
        }
        match self.adc.read(&mut self.vsys).await {
            Ok(raw) => input.battery = battery_percent(raw),
            Err(_) => input.healthy = false,
        }
        input
    }

    fn buttons(&self) -> Buttons {
        let bits = self
            .buttons
            .iter()
            .enumerate()
            .filter(|(_, pin)| pin.is_low())
            .fold(0u8, |acc, (i, _)| acc | (1 << i));
        Buttons(bits)
    }
}

/// VSYS is divided by 3 before the 3.3 V reference ADC.
fn battery_percent(raw: u16) -> u8 {
    let mv = u32::from(raw) * 3 * 3_300 / 4_096;
    let clamped = mv.clamp(BATTERY_EMPTY_MV, BATTERY_FULL_MV);
    ((clamped - BATTERY_EMPTY_MV) * 100 / (BATTERY_FULL_MV - BATTERY_EMPTY_MV)) as u8
}
