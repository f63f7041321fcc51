//! Ordering strategies for published barcodes.

use crate::barcode::Barcode;
use crate::capture::FrameMetadata;
use crate::geometry::Point;
use std::cmp::Ordering;

/// Orders barcodes found in one frame.
///
/// The frame the barcodes came from is passed explicitly so strategies can
/// use its dimensions.
pub trait BarcodeComparator: Send + Sync {
    fn compare(&self, a: &Barcode, b: &Barcode, frame: &FrameMetadata) -> Ordering;
}

impl<F> BarcodeComparator for F
where
    F: Fn(&Barcode, &Barcode, &FrameMetadata) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &Barcode, b: &Barcode, frame: &FrameMetadata) -> Ordering {
        self(a, b, frame)
    }
}

/// Puts the barcode nearest the frame center first.
///
/// Barcodes without a bounding box sort after all others.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentralBarcodeComparator;

impl BarcodeComparator for CentralBarcodeComparator {
    fn compare(&self, a: &Barcode, b: &Barcode, frame: &FrameMetadata) -> Ordering {
        let center = Point::new((frame.width / 2) as i32, (frame.height / 2) as i32);
        match (a.bounding_box, b.bounding_box) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(box_a), Some(box_b)) => {
                let dist_a = box_a.center().distance_to(&center);
                let dist_b = box_b.center().distance_to(&center);
                dist_a.total_cmp(&dist_b)
            }
        }
    }
}

/// Stable sort of `barcodes` by `comparator` in the context of `frame`.
pub fn sort_barcodes(
    barcodes: &mut [Barcode],
    comparator: &dyn BarcodeComparator,
    frame: &FrameMetadata,
) {
    barcodes.sort_by(|a, b| comparator.compare(a, b, frame));
}
