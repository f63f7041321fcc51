//! Host seams the scanner reads but does not own.

use crate::geometry::DisplayRotation;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// The display the preview is shown on.
pub trait Display: Send {
    /// Current rotation of the display relative to its natural orientation.
    fn rotation(&self) -> DisplayRotation;
}

/// A display whose rotation is set by the host.
///
/// Clones share the same rotation, so the host can keep one handle and give
/// another to the scanner.
#[derive(Debug, Clone, Default)]
pub struct FixedDisplay {
    rotation: Arc<Mutex<DisplayRotation>>,
}

impl FixedDisplay {
    pub fn new(rotation: DisplayRotation) -> Self {
        Self {
            rotation: Arc::new(Mutex::new(rotation)),
        }
    }

    pub fn set_rotation(&self, rotation: DisplayRotation) {
        *self.rotation.lock().unwrap_or_else(PoisonError::into_inner) = rotation;
    }
}

impl Display for FixedDisplay {
    fn rotation(&self) -> DisplayRotation {
        *self.rotation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Monotonic time source for timers.
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
