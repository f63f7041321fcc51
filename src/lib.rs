//! Scanlens
//!
//! Camera-preview barcode scanning core: drives a camera through
//! open/configure/stream, feeds one frame at a time to a barcode detector
//! and publishes what it finds.
//!
//! # Architecture
//!
//! ```text
//! platform callbacks ──► dispatch::EventQueue ──► Scanner (owner thread)
//!                                                   │
//!                      camera::CameraSession ◄──────┤
//!                      capture::ImageReader  ◄──────┤
//!                      processor::FrameProcessor ◄──┘──► ScanObserver
//! ```
//!
//! # Design Principles
//!
//! - **Single owner**: all state lives on one thread; callbacks are
//!   marshalled as [`ScannerEvent`]s
//! - **Drop, never queue**: a frame arriving while another is in detection,
//!   or while paused, is released immediately
//! - **Release on failure**: any camera failure tears down every camera
//!   resource before it is reported
//! - **Stale callbacks are harmless**: every asynchronous request carries a
//!   token, and results for released attempts are closed and ignored
//!
//! # Example
//!
//! ```
//! use scanlens::camera::mock::{back_camera, MockPlatform};
//! use scanlens::camera::CameraId;
//! use scanlens::capture::MockFrameFeed;
//! use scanlens::dispatch;
//! use scanlens::platform::FixedDisplay;
//! use scanlens::processor::{MockDetectorFactory, RawBarcode};
//! use scanlens::{BarcodeFormat, Scanner};
//!
//! let (sender, queue) = dispatch::channel();
//! let platform = MockPlatform::with_responder(sender.clone());
//! let feed = MockFrameFeed::with_responder(sender.clone());
//! let detectors = MockDetectorFactory::with_responder(sender);
//! detectors.push_result(Ok(vec![RawBarcode {
//!     display_value: Some("hello".into()),
//!     format: BarcodeFormat::QrCode,
//!     ..Default::default()
//! }]));
//!
//! let mut scanner = Scanner::new(
//!     Box::new(platform.manager(vec![(CameraId::new("0"), back_camera())])),
//!     Box::new(feed.factory()),
//!     Box::new(detectors),
//!     Box::new(FixedDisplay::default()),
//! );
//! scanner.start();
//! scanner.pump(&queue);
//!
//! feed.push_synthetic();
//! scanner.pump(&queue);
//! assert_eq!(scanner.latest_result().unwrap().barcodes[0].to_string(), "hello");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod barcode;
pub mod camera;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod platform;
pub mod preview;
pub mod processor;
pub mod scanner;

// Re-export main types for convenience
pub use barcode::{Barcode, BarcodeFormat, BarcodeResult, BarcodeValueType};
pub use camera::{CameraError, CameraSession, FlashMode, LensFacing, SessionState};
pub use capture::{Frame, FrameMetadata};
pub use config::FileConfig;
pub use dispatch::{EventQueue, EventSender, ScannerEvent};
pub use processor::{BarcodeComparator, CentralBarcodeComparator, FrameProcessor};
pub use scanner::{
    ClearFocusDelay, LifecycleEvent, Options, OptionsBuilder, ScanObserver, ScanStats, Scanner,
    ScannerControl,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
