//! `testsuite`: quick hardware check from the console.

use core::fmt::Write;

use remote_core::LinkTransport;

use crate::console::ConsoleText;
use crate::input::InputPins;

/// Readings this close to either rail mean a disconnected or shorted pot.
const RAIL_MARGIN: u16 = 16;

/// Report radio and input health. Returns true if everything passed.
pub async fn run(
    radio: &impl LinkTransport,
    inputs: &mut InputPins<'_>,
    out: &mut ConsoleText,
) -> bool {
    let mut passed = true;

    if radio.is_ready() {
        let _ = writeln!(out, "radio: ok {}", radio.local_address());
    } else {
        let _ = writeln!(out, "radio: not responding");
        passed = false;
    }

    let sample = inputs.sample().await;
    let _ = writeln!(
        out,
        "stick: h {} v {}  pot {}  battery {}%  buttons {:08b}",
        sample.joy_h, sample.joy_v, sample.pot1, sample.battery, sample.buttons.raw()
    );
    if !sample.healthy {
        let _ = writeln!(out, "adc: conversion failed");
        passed = false;
    }
    for (name, raw) in [("stick h", sample.joy_h), ("stick v", sample.joy_v)] {
        if raw < RAIL_MARGIN || raw > 4095 - RAIL_MARGIN {
            let _ = writeln!(out, "{}: at rail, check wiring", name);
            passed = false;
        }
    }
    passed
}
