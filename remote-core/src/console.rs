//! Operator console command parser.
//!
//! One command per line, words separated by whitespace:
//!
//! ```text
//! status
//! running_status on|off
//! testsuite
//! calibrate_imu
//! calibrate
//! reset
//! set_droid <hex address>
//! set_other_remote <hex address>
//! pair_droid | pair_remote
//! pair_select <n>
//! pair_cancel
//! set led_brightness|deadband|send_repeats <n>
//! primary left|right
//! ```
//!
//! Addresses are 1 to 16 hex digits, case-insensitive, e.g.
//! `set_droid 0013a20041b2c3d4`.

use core::fmt;

use heapless::Vec;
use remote_proto::HardwareAddress;

use crate::error::LinkError;

/// Maximum console line length (excluding the terminator).
pub const MAX_COMMAND_LENGTH: usize = 64;

const MAX_WORDS: usize = 4;
const MAX_HEX_DIGITS: usize = 16;

/// A shared setting adjustable from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setting {
    LedBrightness,
    Deadband,
    SendRepeats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum ConsoleCommand {
    Status,
    RunningStatus(bool),
    Testsuite,
    CalibrateImu,
    /// Joystick calibration on this remote.
    Calibrate,
    /// Factory reset.
    Reset,
    SetDroid(HardwareAddress),
    SetOtherRemote(HardwareAddress),
    PairDroid,
    PairRemote,
    PairSelect(usize),
    PairCancel,
    Set(Setting, u8),
    Primary(Side),
}

/// Error type for console commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConsoleError {
    UnknownCommand,
    InvalidArgument,
    InvalidArgumentCount,
    /// Command parsed but the operation failed.
    Failed(LinkError),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "Unknown command"),
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::InvalidArgumentCount => write!(f, "Invalid number of arguments"),
            Self::Failed(e) => write!(f, "Failed: {e}"),
        }
    }
}

impl From<LinkError> for ConsoleError {
    fn from(err: LinkError) -> Self {
        ConsoleError::Failed(err)
    }
}

/// Parse one console line.
///
/// # Errors
///
/// [`ConsoleError::UnknownCommand`] for an empty line or unknown verb,
/// [`ConsoleError::InvalidArgumentCount`] for the wrong number of words,
/// [`ConsoleError::InvalidArgument`] for a malformed argument.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let mut words: Vec<&str, MAX_WORDS> = Vec::new();
    for word in line.split_ascii_whitespace() {
        words.push(word).map_err(|_| ConsoleError::InvalidArgumentCount)?;
    }
    let (&verb, args) = words.split_first().ok_or(ConsoleError::UnknownCommand)?;

    let command = match verb {
        "status" => nullary(args, ConsoleCommand::Status)?,
        "testsuite" => nullary(args, ConsoleCommand::Testsuite)?,
        "calibrate_imu" => nullary(args, ConsoleCommand::CalibrateImu)?,
        "calibrate" => nullary(args, ConsoleCommand::Calibrate)?,
        "reset" => nullary(args, ConsoleCommand::Reset)?,
        "pair_droid" => nullary(args, ConsoleCommand::PairDroid)?,
        "pair_remote" => nullary(args, ConsoleCommand::PairRemote)?,
        "pair_cancel" => nullary(args, ConsoleCommand::PairCancel)?,
        "running_status" => ConsoleCommand::RunningStatus(parse_on_off(unary(args)?)?),
        "set_droid" => ConsoleCommand::SetDroid(parse_hex_address(unary(args)?)?),
        "set_other_remote" => ConsoleCommand::SetOtherRemote(parse_hex_address(unary(args)?)?),
        "pair_select" => ConsoleCommand::PairSelect(usize::from(parse_decimal_u8(unary(args)?)?)),
        "primary" => ConsoleCommand::Primary(match unary(args)? {
            "left" => Side::Left,
            "right" => Side::Right,
            _ => return Err(ConsoleError::InvalidArgument),
        }),
        "set" => {
            let [name, value] = args else {
                return Err(ConsoleError::InvalidArgumentCount);
            };
            let setting = match *name {
                "led_brightness" => Setting::LedBrightness,
                "deadband" => Setting::Deadband,
                "send_repeats" => Setting::SendRepeats,
                _ => return Err(ConsoleError::InvalidArgument),
            };
            ConsoleCommand::Set(setting, parse_decimal_u8(value)?)
        }
        _ => return Err(ConsoleError::UnknownCommand),
    };
    Ok(command)
}

fn nullary(args: &[&str], command: ConsoleCommand) -> Result<ConsoleCommand, ConsoleError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(ConsoleError::InvalidArgumentCount)
    }
}

fn unary<'a>(args: &[&'a str]) -> Result<&'a str, ConsoleError> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(ConsoleError::InvalidArgumentCount),
    }
}

fn parse_on_off(word: &str) -> Result<bool, ConsoleError> {
    match word {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        _ => Err(ConsoleError::InvalidArgument),
    }
}

/// Parse 1 to 16 hex digits as a 64-bit address.
pub fn parse_hex_address(word: &str) -> Result<HardwareAddress, ConsoleError> {
    let digits = word.as_bytes();
    if digits.is_empty() || digits.len() > MAX_HEX_DIGITS {
        return Err(ConsoleError::InvalidArgument);
    }
    let mut value: u64 = 0;
    for &b in digits {
        // At most 16 digits, so the shift never drops set bits.
        value = (value << 4) | u64::from(hex_digit(b)?);
    }
    Ok(HardwareAddress::from_u64(value))
}

#[inline]
fn hex_digit(b: u8) -> Result<u8, ConsoleError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        _ => Err(ConsoleError::InvalidArgument),
    }
}

fn parse_decimal_u8(word: &str) -> Result<u8, ConsoleError> {
    if word.is_empty() {
        return Err(ConsoleError::InvalidArgument);
    }
    let mut value: u8 = 0;
    for &b in word.as_bytes() {
        if !b.is_ascii_digit() {
            return Err(ConsoleError::InvalidArgument);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(b - b'0'))
            .ok_or(ConsoleError::InvalidArgument)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_droid_full_address() {
        assert_eq!(
            parse_command("set_droid 1122334455667788"),
            Ok(ConsoleCommand::SetDroid(HardwareAddress::new(0x1122_3344, 0x5566_7788)))
        );
    }

    #[test]
    fn test_hex_is_case_insensitive_and_short_forms_allowed() {
        assert_eq!(
            parse_command("set_other_remote 0013A200abCD"),
            Ok(ConsoleCommand::SetOtherRemote(HardwareAddress::from_u64(0x0013_A200_ABCD)))
        );
        assert_eq!(parse_hex_address("1"), Ok(HardwareAddress::new(0, 1)));
    }

    #[test]
    fn test_bad_hex_rejected() {
        assert_eq!(parse_command("set_droid 12G4"), Err(ConsoleError::InvalidArgument));
        assert_eq!(
            parse_command("set_droid 11223344556677889"),
            Err(ConsoleError::InvalidArgument)
        );
    }

    #[test]
    fn test_argument_count() {
        assert_eq!(parse_command("set_droid"), Err(ConsoleError::InvalidArgumentCount));
        assert_eq!(parse_command("status now"), Err(ConsoleError::InvalidArgumentCount));
        assert_eq!(parse_command("set deadband"), Err(ConsoleError::InvalidArgumentCount));
        assert_eq!(parse_command("a b c d e"), Err(ConsoleError::InvalidArgumentCount));
    }

    #[test]
    fn test_unknown_and_empty() {
        assert_eq!(parse_command("fly"), Err(ConsoleError::UnknownCommand));
        assert_eq!(parse_command("   "), Err(ConsoleError::UnknownCommand));
    }

    #[test]
    fn test_running_status() {
        assert_eq!(parse_command("running_status on"), Ok(ConsoleCommand::RunningStatus(true)));
        assert_eq!(
            parse_command("running_status false"),
            Ok(ConsoleCommand::RunningStatus(false))
        );
        assert_eq!(parse_command("running_status maybe"), Err(ConsoleError::InvalidArgument));
    }

    #[test]
    fn test_settings_and_pairing() {
        assert_eq!(
            parse_command("set send_repeats 2"),
            Ok(ConsoleCommand::Set(Setting::SendRepeats, 2))
        );
        assert_eq!(parse_command("set volume 2"), Err(ConsoleError::InvalidArgument));
        assert_eq!(parse_command("set deadband 300"), Err(ConsoleError::InvalidArgument));
        assert_eq!(parse_command("pair_select 1"), Ok(ConsoleCommand::PairSelect(1)));
        assert_eq!(parse_command("primary right"), Ok(ConsoleCommand::Primary(Side::Right)));
        assert_eq!(parse_command("  reset \r"), Ok(ConsoleCommand::Reset));
    }
}
