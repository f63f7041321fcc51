//! Metrics collection and registry.

use crate::camera::SessionState;
use crate::scanner::{ScanStats, Scanner};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of scanner state for a metrics update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Whether the camera is streaming.
    pub camera_streaming: bool,
    /// Whether frame processing is paused.
    pub paused: bool,
    /// Counters accumulated by the scanner.
    pub stats: ScanStats,
}

impl MetricsSnapshot {
    /// Captures the current state of a scanner.
    pub fn from_scanner(scanner: &Scanner) -> Self {
        Self {
            camera_streaming: matches!(
                scanner.camera_state(),
                SessionState::Streaming | SessionState::FocusLocking
            ),
            paused: scanner.is_paused(),
            stats: *scanner.stats(),
        }
    }
}

struct Counters {
    frames_received: IntCounter,
    frames_dropped_busy: IntCounter,
    frames_dropped_paused: IntCounter,
    frames_dropped_failed: IntCounter,
    frames_submitted: IntCounter,
    detections_published: IntCounter,
    detection_failures: IntCounter,
    camera_errors: IntCounter,
    camera_starts: IntCounter,
    focus_requests: IntCounter,
    focus_clears: IntCounter,
}

/// Prometheus metrics registry for the scanner.
pub struct MetricsRegistry {
    registry: Registry,
    camera_streaming: IntGauge,
    paused: IntGauge,
    counters: Counters,
}

impl MetricsRegistry {
    /// Creates a registry with every scanner metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let camera_streaming = IntGauge::new(
            "scanlens_camera_streaming",
            "Camera streaming status (1=streaming, 0=not streaming)",
        )?;
        let paused = IntGauge::new(
            "scanlens_paused",
            "Frame processing paused (1=paused, 0=running)",
        )?;
        registry.register(Box::new(camera_streaming.clone()))?;
        registry.register(Box::new(paused.clone()))?;

        let counter = |name: &str, help: &str| -> Result<IntCounter, MetricsError> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let counters = Counters {
            frames_received: counter(
                "scanlens_frames_received_total",
                "Frames acquired from the processing reader",
            )?,
            frames_dropped_busy: counter(
                "scanlens_frames_dropped_busy_total",
                "Frames dropped because a detection was in flight",
            )?,
            frames_dropped_paused: counter(
                "scanlens_frames_dropped_paused_total",
                "Frames dropped while processing was paused",
            )?,
            frames_dropped_failed: counter(
                "scanlens_frames_dropped_failed_total",
                "Frames dropped because detection could not start",
            )?,
            frames_submitted: counter(
                "scanlens_frames_submitted_total",
                "Frames handed to the barcode detector",
            )?,
            detections_published: counter(
                "scanlens_detections_published_total",
                "Non-empty detection results published to observers",
            )?,
            detection_failures: counter(
                "scanlens_detection_failures_total",
                "Detections that ended in an error",
            )?,
            camera_errors: counter(
                "scanlens_camera_errors_total",
                "Camera failures reported to observers",
            )?,
            camera_starts: counter(
                "scanlens_camera_starts_total",
                "Camera open attempts",
            )?,
            focus_requests: counter(
                "scanlens_focus_requests_total",
                "Tap-to-focus requests",
            )?,
            focus_clears: counter(
                "scanlens_focus_clears_total",
                "Scheduled focus-region clears that ran",
            )?,
        };

        Ok(Self {
            registry,
            camera_streaming,
            paused,
            counters,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.camera_streaming
            .set(if snapshot.camera_streaming { 1 } else { 0 });
        self.paused.set(if snapshot.paused { 1 } else { 0 });

        // Counters only move forward; increment by the difference.
        let stats = &snapshot.stats;
        let c = &self.counters;
        advance(&c.frames_received, stats.frames_received);
        advance(&c.frames_dropped_busy, stats.frames_dropped_busy);
        advance(&c.frames_dropped_paused, stats.frames_dropped_paused);
        advance(&c.frames_dropped_failed, stats.frames_dropped_failed);
        advance(&c.frames_submitted, stats.frames_submitted);
        advance(&c.detections_published, stats.detections_published);
        advance(&c.detection_failures, stats.detection_failures);
        advance(&c.camera_errors, stats.camera_errors);
        advance(&c.camera_starts, stats.camera_starts);
        advance(&c.focus_requests, stats.focus_requests);
        advance(&c.focus_clears, stats.focus_clears);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}
