//! Explicit debounce timer handles.
//!
//! Each timer is a deadline that any new qualifying input pushes further
//! out (supersession). There is no other cancellation: a pending fire is
//! only ever displaced by a newer `bump` or dropped with the timer.

use std::time::{Duration, Instant};

/// A single debounce deadline.
///
/// The owner drives time explicitly: `bump` on qualifying input, `poll`
/// from its event loop. `poll` reports a fire exactly once per armed
/// deadline.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm the timer, superseding any pending deadline.
    pub fn bump(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// True exactly once when the armed deadline has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm without firing.
    pub fn clear(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
