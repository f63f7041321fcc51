//! Prometheus metrics for the scanner.
//!
//! # Metrics Exposed
//!
//! - `scanlens_camera_streaming` - Camera streaming status (1=streaming)
//! - `scanlens_paused` - Frame processing paused (1=paused)
//! - `scanlens_frames_received_total` - Frames acquired from the reader
//! - `scanlens_frames_dropped_busy_total` - Frames dropped while a detection ran
//! - `scanlens_frames_dropped_paused_total` - Frames dropped while paused
//! - `scanlens_frames_dropped_failed_total` - Frames whose detection could not start
//! - `scanlens_frames_submitted_total` - Frames handed to the detector
//! - `scanlens_detections_published_total` - Non-empty results published
//! - `scanlens_detection_failures_total` - Failed detections
//! - `scanlens_camera_errors_total` - Camera failures
//! - `scanlens_camera_starts_total` - Camera open attempts
//! - `scanlens_focus_requests_total` / `scanlens_focus_clears_total`
//!
//! With the `metrics` feature, [`MetricsServer`] serves them over HTTP.
//!
//! # Example
//!
//! ```
//! use scanlens::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let mut snapshot = MetricsSnapshot::default();
//! snapshot.stats.frames_received = 12;
//! registry.update(&snapshot);
//! assert!(registry.encode().unwrap().contains("scanlens_frames_received_total 12"));
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
