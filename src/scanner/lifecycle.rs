//! Host lifecycle mapping.

use super::Scanner;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lifecycle transitions a host reports to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    /// Host became visible.
    Start,
    /// Host is in the foreground.
    Resume,
    /// Host lost the foreground.
    Pause,
    /// Host is no longer visible.
    Stop,
}

impl Scanner {
    /// Drives the scanner from a host lifecycle transition.
    ///
    /// Any order of events is tolerated.
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        debug!(?event, "Lifecycle event");
        match event {
            LifecycleEvent::Start => self.start(),
            LifecycleEvent::Resume => self.resume(),
            LifecycleEvent::Pause => self.pause(),
            LifecycleEvent::Stop => self.release(),
        }
    }
}
