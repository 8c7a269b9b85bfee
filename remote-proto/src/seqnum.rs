//! Cyclic sequence counters and loss detection.
//!
//! Envelopes carry a 3-bit sequence number, one counter per (sender, stream).
//! Loss is detected by the forward distance between the last number seen and
//! the one just received. A burst of 8 or more lost envelopes is
//! indistinguishable from a shorter one.

use crate::types::PacketType;

/// Modulus of envelope sequence numbers.
pub const SEQ_MODULUS: u8 = 8;

/// Forward distance from `expected` to `received` modulo `modulus`.
///
/// # Example
///
/// ```
/// use remote_proto::cyclic_diff;
///
/// assert_eq!(cyclic_diff(3, 3, 8), 0);
/// assert_eq!(cyclic_diff(7, 0, 8), 1);
/// assert_eq!(cyclic_diff(6, 1, 8), 3);
/// ```
///
/// # Panics
///
/// Panics if `modulus` is zero.
#[inline]
#[must_use]
pub const fn cyclic_diff(expected: u8, received: u8, modulus: u8) -> u8 {
    let m = modulus as u16;
    ((received as u16 % m + m - expected as u16 % m) % m) as u8
}

/// Counter that wraps at `M`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CyclicCounter<const M: u8> {
    value: u8,
}

impl<const M: u8> CyclicCounter<M> {
    pub const MODULUS: u8 = M;

    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// `None` if `value >= M`.
    #[must_use]
    pub const fn from_value(value: u8) -> Option<Self> {
        if value < M {
            Some(Self { value })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.value
    }

    /// Return the current value and step to the next one.
    pub fn advance(&mut self) -> u8 {
        let current = self.value;
        self.value = if current + 1 >= M { 0 } else { current + 1 };
        current
    }
}

/// 3-bit envelope sequence counter.
pub type SeqCounter = CyclicCounter<SEQ_MODULUS>;

/// Outgoing sequence counters of one sender, one per stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamSequencer {
    control: SeqCounter,
    state: SeqCounter,
    config: SeqCounter,
}

impl StreamSequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            control: SeqCounter::new(),
            state: SeqCounter::new(),
            config: SeqCounter::new(),
        }
    }

    /// Sequence number for the next envelope on `stream`.
    ///
    /// Call exactly once per emitted envelope.
    pub fn next_sequence(&mut self, stream: PacketType) -> u8 {
        match stream {
            PacketType::Control => self.control.advance(),
            PacketType::State => self.state.advance(),
            PacketType::Config => self.config.advance(),
        }
    }

    /// Number the next envelope on `stream` will carry.
    #[must_use]
    pub fn peek(&self, stream: PacketType) -> u8 {
        match stream {
            PacketType::Control => self.control.value(),
            PacketType::State => self.state.value(),
            PacketType::Config => self.config.value(),
        }
    }
}
