//! Owner-thread event dispatch.
//!
//! Camera, image reader and detector callbacks may fire on any thread.
//! They never touch scanner state directly: they post a [`ScannerEvent`]
//! through an [`EventSender`] and the thread owning the
//! [`Scanner`](crate::Scanner) drains the [`EventQueue`].

use crate::camera::CameraEvent;
use crate::processor::DetectionOutcome;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// A callback marshalled onto the owner thread.
#[derive(Debug)]
pub enum ScannerEvent {
    /// Device or capture session callback.
    Camera(CameraEvent),
    /// The processing image reader has a new image.
    ImageAvailable,
    /// The detector finished a request.
    DetectionComplete(DetectionOutcome),
}

/// Creates a connected sender/queue pair.
pub fn channel() -> (EventSender, EventQueue) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventQueue { rx })
}

/// Cloneable handle for posting events from any thread.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<ScannerEvent>,
}

impl EventSender {
    /// Posts an event. Returns false if the queue has been dropped.
    pub fn post(&self, event: ScannerEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::SendError(event)) => {
                tracing::trace!(?event, "Event queue closed, dropping event");
                false
            }
        }
    }
}

/// Receiving end, owned by the scanner's thread.
#[derive(Debug)]
pub struct EventQueue {
    rx: Receiver<ScannerEvent>,
}

impl EventQueue {
    /// Next pending event without blocking.
    pub fn try_next(&self) -> Option<ScannerEvent> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `None` on timeout or when every sender is gone.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ScannerEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
