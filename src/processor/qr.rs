//! QR detection backed by `rqrr`.
//!
//! Each request decodes the luminance plane on a worker thread and posts
//! its outcome to the owner's event queue. Coordinates are reported in the
//! unrotated frame; rqrr finds grids in any orientation.

use super::{
    BarcodeDetector, DetectionOutcome, DetectionTicket, DetectorError, DetectorFactory,
    DetectorImage, RawBarcode,
};
use crate::barcode::{BarcodeFormat, BarcodeValueType};
use crate::dispatch::{EventSender, ScannerEvent};
use crate::geometry::{Point, Rect};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, trace, warn};

/// Builds [`QrDetector`]s that report to `sender`.
pub struct QrDetectorFactory {
    sender: EventSender,
}

impl QrDetectorFactory {
    pub fn new(sender: EventSender) -> Self {
        Self { sender }
    }
}

impl DetectorFactory for QrDetectorFactory {
    fn create(
        &mut self,
        formats: &[BarcodeFormat],
    ) -> Result<Box<dyn BarcodeDetector>, DetectorError> {
        let enabled = BarcodeFormat::QrCode.is_enabled_by(formats);
        if !enabled {
            warn!(?formats, "QR detector created without QR enabled; it will report nothing");
        }
        Ok(Box::new(QrDetector {
            sender: self.sender.clone(),
            enabled,
            cancelled: Arc::new(Mutex::new(HashSet::new())),
            closed: false,
        }))
    }
}

/// Detects QR codes off the owner thread.
pub struct QrDetector {
    sender: EventSender,
    enabled: bool,
    cancelled: Arc<Mutex<HashSet<DetectionTicket>>>,
    closed: bool,
}

impl BarcodeDetector for QrDetector {
    fn detect(&mut self, image: DetectorImage, ticket: DetectionTicket) -> Result<(), DetectorError> {
        if self.closed {
            return Err(DetectorError::Unavailable("detector closed".into()));
        }
        if image.luma().is_none() {
            return Err(DetectorError::Failed(format!(
                "image buffer too small for {}x{}",
                image.width, image.height
            )));
        }

        let sender = self.sender.clone();
        let cancelled = Arc::clone(&self.cancelled);
        let enabled = self.enabled;
        thread::Builder::new()
            .name("qr-detect".into())
            .spawn(move || {
                let result = if enabled {
                    Ok(decode(&image))
                } else {
                    Ok(Vec::new())
                };
                let was_cancelled = cancelled
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&ticket);
                let result = if was_cancelled {
                    Err(DetectorError::Cancelled)
                } else {
                    result
                };
                sender.post(ScannerEvent::DetectionComplete(DetectionOutcome {
                    ticket,
                    result,
                }));
            })
            .map_err(|e| DetectorError::Unavailable(format!("failed to spawn worker: {e}")))?;
        Ok(())
    }

    fn cancel(&mut self, ticket: DetectionTicket) {
        self.cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticket);
    }

    fn close(&mut self) {
        self.closed = true;
        debug!("QR detector closed");
    }
}

/// Decodes every QR grid in the image's luminance plane.
pub fn decode(image: &DetectorImage) -> Vec<RawBarcode> {
    let Some(luma) = image.luma() else {
        return Vec::new();
    };
    let width = image.width as usize;
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width, image.height as usize, |x, y| {
            luma[y * width + x]
        });

    prepared
        .detect_grids()
        .into_iter()
        .filter_map(|grid| {
            let corners: Vec<Point> = grid.bounds.iter().map(|p| Point::new(p.x, p.y)).collect();
            match grid.decode() {
                Ok((_meta, content)) => Some(RawBarcode {
                    bounding_box: bounding_box(&corners),
                    corner_points: corners,
                    value_type: value_type(&content),
                    display_value: Some(content.clone()),
                    raw_value: Some(content),
                    format: BarcodeFormat::QrCode,
                }),
                Err(e) => {
                    trace!(error = %e, "QR grid found but not decodable");
                    None
                }
            }
        })
        .collect()
}

fn bounding_box(points: &[Point]) -> Option<Rect> {
    let left = points.iter().map(|p| p.x).min()?;
    let top = points.iter().map(|p| p.y).min()?;
    let right = points.iter().map(|p| p.x).max()?;
    let bottom = points.iter().map(|p| p.y).max()?;
    Some(Rect::new(left, top, right, bottom))
}

fn value_type(content: &str) -> BarcodeValueType {
    let lower = content.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        BarcodeValueType::Url
    } else if lower.starts_with("mailto:") {
        BarcodeValueType::Email
    } else if lower.starts_with("tel:") {
        BarcodeValueType::Phone
    } else if lower.starts_with("smsto:") || lower.starts_with("sms:") {
        BarcodeValueType::Sms
    } else if lower.starts_with("wifi:") {
        BarcodeValueType::Wifi
    } else if lower.starts_with("geo:") {
        BarcodeValueType::Geo
    } else {
        BarcodeValueType::Text
    }
}
