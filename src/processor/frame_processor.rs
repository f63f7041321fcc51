//! Single-slot frame processing.
//!
//! At most one frame is in detection at a time. The frame stays in the
//! slot until its outcome arrives or the processor is stopped, and is
//! released at exactly that point.

use super::{
    sort_barcodes, BarcodeComparator, BarcodeDetector, DetectionOutcome, DetectionTicket,
    DetectorError, DetectorFactory,
};
use crate::barcode::{Barcode, BarcodeFormat, BarcodeResult};
use crate::capture::{Frame, FrameMetadata};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

struct InFlight {
    ticket: DetectionTicket,
    frame: Frame,
    metadata: FrameMetadata,
}

/// What became of a detection outcome.
#[derive(Debug)]
pub enum Completion {
    /// Detection succeeded; barcodes are mapped and sorted.
    Published(BarcodeResult),
    /// Detection failed; the error has been logged.
    Failed(DetectorError),
    /// The outcome belongs to a request that is no longer in flight.
    Stale,
}

/// Feeds frames to a barcode detector one at a time.
pub struct FrameProcessor {
    factory: Box<dyn DetectorFactory>,
    detector: Option<Box<dyn BarcodeDetector>>,
    formats: Vec<BarcodeFormat>,
    sort: Option<Arc<dyn BarcodeComparator>>,
    slot: Option<InFlight>,
    next_ticket: u64,
    barcodes: Vec<Barcode>,
}

impl FrameProcessor {
    /// Creates a processor detecting every format.
    pub fn new(factory: Box<dyn DetectorFactory>) -> Self {
        Self {
            factory,
            detector: None,
            formats: vec![BarcodeFormat::AllFormats],
            sort: None,
            slot: None,
            next_ticket: 0,
            barcodes: Vec::new(),
        }
    }

    /// True while a frame is in detection.
    pub fn is_processing(&self) -> bool {
        self.slot.is_some()
    }

    pub fn formats(&self) -> &[BarcodeFormat] {
        &self.formats
    }

    /// Most recently published barcodes; empty after [`stop`](Self::stop).
    pub fn barcodes(&self) -> &[Barcode] {
        &self.barcodes
    }

    /// Submits a frame for detection.
    ///
    /// Returns false if the frame was not accepted, in which case it has
    /// already been released. Callers are expected to check
    /// [`is_processing`](Self::is_processing) first.
    pub fn process(&mut self, frame: Frame, metadata: FrameMetadata) -> bool {
        if self.slot.is_some() {
            trace!(sequence = frame.sequence(), "Processor busy, dropping frame");
            return false;
        }

        let ticket = DetectionTicket(self.next_ticket);
        self.next_ticket += 1;

        let detector = match self.detector() {
            Ok(detector) => detector,
            Err(e) => {
                error!(error = %e, "Barcode detector unavailable");
                return false;
            }
        };

        let image = frame.to_detector_image(metadata.rotation_degrees);
        if let Err(e) = detector.detect(image, ticket) {
            error!(error = %e, "Barcode detection could not start");
            return false;
        }

        trace!(
            ?ticket,
            sequence = frame.sequence(),
            rotation = metadata.rotation_degrees,
            "Frame submitted for detection"
        );
        self.slot = Some(InFlight {
            ticket,
            frame,
            metadata,
        });
        true
    }

    /// Applies a detector outcome.
    ///
    /// The in-flight frame is released and the slot cleared before the
    /// result is mapped, so a new frame may be accepted immediately.
    pub fn complete(&mut self, outcome: DetectionOutcome) -> Completion {
        let in_flight = match self.slot.take() {
            Some(in_flight) if in_flight.ticket == outcome.ticket => in_flight,
            other => {
                self.slot = other;
                trace!(ticket = ?outcome.ticket, "Ignoring stale detection outcome");
                return Completion::Stale;
            }
        };

        let InFlight {
            frame, metadata, ..
        } = in_flight;
        frame.close();

        match outcome.result {
            Ok(raw) => {
                let mut barcodes: Vec<Barcode> = raw.into_iter().map(Barcode::from).collect();
                if let Some(sort) = &self.sort {
                    sort_barcodes(&mut barcodes, sort.as_ref(), &metadata);
                }
                self.barcodes = barcodes.clone();
                Completion::Published(BarcodeResult {
                    barcodes,
                    frame: metadata,
                    completed_at: Utc::now(),
                })
            }
            Err(e) => {
                error!(error = %e, "Barcode processing error");
                Completion::Failed(e)
            }
        }
    }

    /// Cancels any in-flight detection, releases its frame and closes the
    /// detector. The next frame builds a fresh detector.
    pub fn stop(&mut self) {
        self.abandon_in_flight();
        self.barcodes.clear();
        if let Some(mut detector) = self.detector.take() {
            detector.close();
            debug!("Barcode detector closed");
        }
    }

    /// Changes the formats to detect. An empty list means all formats.
    ///
    /// The current detector is closed; the next frame builds one for the
    /// new formats.
    pub fn set_formats(&mut self, formats: Vec<BarcodeFormat>) {
        self.formats = if formats.is_empty() {
            vec![BarcodeFormat::AllFormats]
        } else {
            formats
        };
        if let Some(mut detector) = self.detector.take() {
            self.abandon_in_flight_with(detector.as_mut());
            detector.close();
        }
        debug!(formats = ?self.formats, "Barcode formats updated");
    }

    /// Sets or clears the ordering applied before publication.
    pub fn set_sort(&mut self, sort: Option<Arc<dyn BarcodeComparator>>) {
        self.sort = sort;
    }

    fn detector(&mut self) -> Result<&mut Box<dyn BarcodeDetector>, DetectorError> {
        if self.detector.is_none() {
            let detector = self.factory.create(&self.formats)?;
            debug!(formats = ?self.formats, "Barcode detector created");
            self.detector = Some(detector);
        }
        self.detector
            .as_mut()
            .ok_or_else(|| DetectorError::Unavailable("detector not created".into()))
    }

    fn abandon_in_flight(&mut self) {
        if let Some(in_flight) = self.slot.take() {
            match self.detector.as_mut() {
                Some(detector) => detector.cancel(in_flight.ticket),
                None => warn!(ticket = ?in_flight.ticket, "In-flight frame without a detector"),
            }
            debug!(ticket = ?in_flight.ticket, "In-flight detection cancelled");
            in_flight.frame.close();
        }
    }

    fn abandon_in_flight_with(&mut self, detector: &mut dyn BarcodeDetector) {
        if let Some(in_flight) = self.slot.take() {
            detector.cancel(in_flight.ticket);
            debug!(ticket = ?in_flight.ticket, "In-flight detection cancelled");
            in_flight.frame.close();
        }
    }
}

impl Drop for FrameProcessor {
    fn drop(&mut self) {
        self.stop();
    }
}
