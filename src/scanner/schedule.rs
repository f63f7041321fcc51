//! Deadline for the delayed focus-region clear.

use std::time::Instant;

/// A single pending focus clear.
///
/// Scheduling replaces any earlier deadline, so at most one clear is ever
/// pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusClearSchedule {
    deadline: Option<Instant>,
}

impl FocusClearSchedule {
    pub fn schedule(&mut self, at: Instant) {
        self.deadline = Some(at);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Clears and returns true if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
