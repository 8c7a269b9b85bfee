//! Monotonic millisecond clock.

/// Source of monotonic time.
pub trait Clock {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;
}

impl<C: Clock> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
