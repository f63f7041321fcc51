//! Scriptable detector for tests and the demo binary.

use super::{
    BarcodeDetector, DetectionOutcome, DetectionTicket, DetectorError, DetectorFactory,
    DetectorImage, RawBarcode,
};
use crate::barcode::BarcodeFormat;
use crate::dispatch::{EventSender, ScannerEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call made into the mock detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorCall {
    Create(Vec<BarcodeFormat>),
    Detect {
        ticket: DetectionTicket,
        width: u32,
        height: u32,
        rotation_degrees: u32,
    },
    Cancel(DetectionTicket),
    Close,
}

#[derive(Default)]
struct DetectorState {
    calls: Vec<DetectorCall>,
    script: VecDeque<Result<Vec<RawBarcode>, DetectorError>>,
    responder: Option<EventSender>,
    fail_create: Option<DetectorError>,
}

/// Factory and shared log for [`MockDetector`]s.
///
/// With a responder attached, every `detect` is answered immediately with
/// the next scripted result, or an empty list when the script is empty.
#[derive(Clone, Default)]
pub struct MockDetectorFactory {
    state: Arc<Mutex<DetectorState>>,
}

impl MockDetectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(sender: EventSender) -> Self {
        let factory = Self::new();
        factory.lock().responder = Some(sender);
        factory
    }

    fn lock(&self) -> MutexGuard<'_, DetectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the result for a future detection.
    pub fn push_result(&self, result: Result<Vec<RawBarcode>, DetectorError>) {
        self.lock().script.push_back(result);
    }

    /// Makes the next `create` fail.
    pub fn fail_next_create(&self, err: DetectorError) {
        self.lock().fail_create = Some(err);
    }

    pub fn calls(&self) -> Vec<DetectorCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&DetectorCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Ticket of the most recent `detect`.
    pub fn last_ticket(&self) -> Option<DetectionTicket> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            DetectorCall::Detect { ticket, .. } => Some(*ticket),
            _ => None,
        })
    }

    /// Builds the outcome for `ticket` from the script.
    pub fn outcome(&self, ticket: DetectionTicket) -> DetectionOutcome {
        let result = self.lock().script.pop_front().unwrap_or_else(|| Ok(Vec::new()));
        DetectionOutcome { ticket, result }
    }
}

impl DetectorFactory for MockDetectorFactory {
    fn create(
        &mut self,
        formats: &[BarcodeFormat],
    ) -> Result<Box<dyn BarcodeDetector>, DetectorError> {
        let mut state = self.lock();
        if let Some(err) = state.fail_create.take() {
            return Err(err);
        }
        state.calls.push(DetectorCall::Create(formats.to_vec()));
        drop(state);
        Ok(Box::new(MockDetector {
            factory: self.clone(),
            closed: false,
        }))
    }
}

/// Detector that records calls into its factory's log.
pub struct MockDetector {
    factory: MockDetectorFactory,
    closed: bool,
}

impl BarcodeDetector for MockDetector {
    fn detect(&mut self, image: DetectorImage, ticket: DetectionTicket) -> Result<(), DetectorError> {
        if self.closed {
            return Err(DetectorError::Unavailable("detector closed".into()));
        }
        let responder = {
            let mut state = self.factory.lock();
            state.calls.push(DetectorCall::Detect {
                ticket,
                width: image.width,
                height: image.height,
                rotation_degrees: image.rotation_degrees,
            });
            state.responder.clone()
        };
        if let Some(sender) = responder {
            sender.post(ScannerEvent::DetectionComplete(self.factory.outcome(ticket)));
        }
        Ok(())
    }

    fn cancel(&mut self, ticket: DetectionTicket) {
        self.factory.lock().calls.push(DetectorCall::Cancel(ticket));
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.factory.lock().calls.push(DetectorCall::Close);
        }
    }
}
