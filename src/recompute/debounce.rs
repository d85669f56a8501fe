//! Single-slot trailing debounce.
//!
//! The caller supplies `now` on every call, so the timer is a plain deadline
//! and tests can drive it with synthetic instants.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    slot: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, slot: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Replace whatever is armed with `value`, due `delay` after `now`.
    pub fn arm(&mut self, value: T, now: Instant) {
        self.arm_at(value, now + self.delay);
    }

    /// Replace whatever is armed with `value`, due at `deadline`.
    pub fn arm_at(&mut self, value: T, deadline: Instant) {
        self.slot = Some((deadline, value));
    }

    /// Drop the armed value, if any. Returns whether something was armed.
    pub fn cancel(&mut self) -> bool {
        self.slot.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Take the armed value once its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.slot {
            Some((deadline, _)) if *deadline <= now => self.slot.take().map(|(_, value)| value),
            _ => None,
        }
    }
}
