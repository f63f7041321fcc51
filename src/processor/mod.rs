//! Barcode detection pipeline.
//!
//! The [`FrameProcessor`] keeps at most one frame in detection and maps
//! detector output into sorted [`Barcode`](crate::barcode::Barcode)s.

mod detector;
mod frame_processor;
pub mod mock;
#[cfg(feature = "qr")]
mod qr;
mod sort;

pub use detector::{
    BarcodeDetector, DetectionOutcome, DetectionTicket, DetectorError, DetectorFactory,
    DetectorImage, RawBarcode,
};
pub use frame_processor::{Completion, FrameProcessor};
pub use mock::{DetectorCall, MockDetectorFactory};
#[cfg(feature = "qr")]
pub use qr::{decode as decode_qr, QrDetector, QrDetectorFactory};
pub use sort::{sort_barcodes, BarcodeComparator, CentralBarcodeComparator};
