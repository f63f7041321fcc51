//! Barcode values published to observers.

mod format;

pub use format::{BarcodeFormat, BarcodeValueType, ALL_FORMATS_MIN_WIDTH};

use crate::capture::FrameMetadata;
use crate::geometry::{Point, Rect};
use crate::processor::RawBarcode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barcode {
    /// Bounding box in frame coordinates, if the detector reported one.
    pub bounding_box: Option<Rect>,
    /// Corner points, clockwise from top-left.
    pub corner_points: Vec<Point>,
    /// Human-readable value.
    pub display_value: Option<String>,
    /// Raw encoded value.
    pub raw_value: Option<String>,
    pub format: BarcodeFormat,
    pub value_type: BarcodeValueType,
}

impl From<RawBarcode> for Barcode {
    fn from(raw: RawBarcode) -> Self {
        Self {
            bounding_box: raw.bounding_box,
            corner_points: raw.corner_points,
            display_value: raw.display_value,
            raw_value: raw.raw_value,
            format: raw.format,
            value_type: raw.value_type,
        }
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.display_value, &self.raw_value) {
            (Some(value), _) | (None, Some(value)) => f.write_str(value),
            (None, None) => write!(f, "<{:?}>", self.format),
        }
    }
}

/// Barcodes found in one processed frame, in publication order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeResult {
    pub barcodes: Vec<Barcode>,
    /// Frame the barcodes were found in.
    pub frame: FrameMetadata,
    /// When detection finished.
    pub completed_at: DateTime<Utc>,
}

impl BarcodeResult {
    /// First barcode, if any.
    pub fn first(&self) -> Option<&Barcode> {
        self.barcodes.first()
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }
}
