//! The barcode detector collaborator.
//!
//! Detection runs outside the owner thread. A detector accepts one
//! [`DetectorImage`] per [`DetectionTicket`] and later reports exactly one
//! [`DetectionOutcome`] for it, usually by posting
//! [`ScannerEvent::DetectionComplete`](crate::dispatch::ScannerEvent).

use crate::barcode::{BarcodeFormat, BarcodeValueType};
use crate::capture::ImageFormat;
use crate::geometry::{Point, Rect};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a detector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    #[error("barcode detection failed: {0}")]
    Failed(String),
    #[error("barcode detector unavailable: {0}")]
    Unavailable(String),
    #[error("barcode detection cancelled")]
    Cancelled,
}

/// Correlates a detection request with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionTicket(pub(crate) u64);

/// Image handed to a detector.
#[derive(Debug, Clone)]
pub struct DetectorImage {
    /// Pixels shared with the originating frame.
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation that makes the image upright.
    pub rotation_degrees: u32,
    pub format: ImageFormat,
}

impl DetectorImage {
    /// The luminance plane, `width * height` bytes, if the buffer holds one.
    pub fn luma(&self) -> Option<&[u8]> {
        let len = (self.width as usize) * (self.height as usize);
        self.data.get(..len)
    }
}

/// A barcode candidate as reported by a detector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBarcode {
    pub bounding_box: Option<Rect>,
    pub corner_points: Vec<Point>,
    pub display_value: Option<String>,
    pub raw_value: Option<String>,
    pub format: BarcodeFormat,
    pub value_type: BarcodeValueType,
}

/// Result of one detection request.
#[derive(Debug)]
pub struct DetectionOutcome {
    pub ticket: DetectionTicket,
    pub result: Result<Vec<RawBarcode>, DetectorError>,
}

/// A configured detector instance.
pub trait BarcodeDetector: Send {
    /// Starts detection. Completion is reported asynchronously.
    fn detect(&mut self, image: DetectorImage, ticket: DetectionTicket) -> Result<(), DetectorError>;

    /// Abandons an in-flight request. Its outcome may still arrive.
    fn cancel(&mut self, ticket: DetectionTicket);

    /// Releases detector resources.
    fn close(&mut self);
}

/// Builds detectors for a set of formats.
pub trait DetectorFactory: Send {
    fn create(&mut self, formats: &[BarcodeFormat])
        -> Result<Box<dyn BarcodeDetector>, DetectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_plane() {
        let image = DetectorImage {
            data: vec![1u8; 6 * 4 * 3 / 2].into(),
            width: 6,
            height: 4,
            rotation_degrees: 0,
            format: ImageFormat::Yuv420,
        };
        assert_eq!(image.luma().map(<[u8]>::len), Some(24));

        let short = DetectorImage {
            data: vec![1u8; 3].into(),
            ..image
        };
        assert!(short.luma().is_none());
    }
}
