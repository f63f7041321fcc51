//! The scanner orchestrator.
//!
//! [`Scanner`] composes a [`CameraSession`] with a [`FrameProcessor`] and
//! owns everything between them: the processing image reader, the pause
//! flag, caller surfaces and the delayed focus clear. It runs on a single
//! owner thread; platform callbacks reach it as
//! [`ScannerEvent`](crate::dispatch::ScannerEvent)s.
//!
//! # Example
//!
//! ```
//! use scanlens::camera::mock::{back_camera, MockPlatform};
//! use scanlens::camera::CameraId;
//! use scanlens::capture::MockFrameFeed;
//! use scanlens::dispatch;
//! use scanlens::platform::FixedDisplay;
//! use scanlens::processor::MockDetectorFactory;
//! use scanlens::{Scanner, SessionState};
//!
//! let (sender, queue) = dispatch::channel();
//! let platform = MockPlatform::with_responder(sender.clone());
//! let feed = MockFrameFeed::with_responder(sender.clone());
//! let detectors = MockDetectorFactory::with_responder(sender);
//!
//! let mut scanner = Scanner::new(
//!     Box::new(platform.manager(vec![(CameraId::new("0"), back_camera())])),
//!     Box::new(feed.factory()),
//!     Box::new(detectors),
//!     Box::new(FixedDisplay::default()),
//! );
//! scanner.start();
//! scanner.pump(&queue);
//! assert_eq!(scanner.camera_state(), SessionState::Streaming);
//! ```

mod lifecycle;
mod options;
mod schedule;

pub use lifecycle::LifecycleEvent;
pub use options::{ClearFocusDelay, Options, OptionsBuilder, OptionsError};
pub use schedule::FocusClearSchedule;

use crate::barcode::{Barcode, BarcodeFormat, BarcodeResult, ALL_FORMATS_MIN_WIDTH};
use crate::camera::{
    CameraError, CameraManager, CameraSession, FlashMode, LensFacing, SessionState, SurfaceRef,
};
use crate::capture::{
    FrameMetadata, ImageFormat, ImageReader, ImageReaderFactory, MAX_IMAGES_IN_READER,
};
use crate::dispatch::{EventQueue, ScannerEvent};
use crate::geometry::{self, rotation_compensation, Rect, Size};
use crate::platform::{Clock, Display, SystemClock};
use crate::preview::{calculate_preview_rect, PreviewScaleType};
use crate::processor::{BarcodeComparator, Completion, DetectorFactory, FrameProcessor};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Share of the frame width a barcode is expected to occupy.
pub const BARCODE_SCREEN_PROPORTION: f64 = 0.3;

/// Settings that can be applied to a scanner one at a time or all at once.
pub trait ScannerControl {
    fn set_camera_facing(&mut self, facing: LensFacing);
    fn set_camera_flash_mode(&mut self, flash_mode: FlashMode);
    fn set_barcode_formats(&mut self, formats: Vec<BarcodeFormat>);
    fn set_min_barcode_width(&mut self, width: Option<u32>);
    fn set_barcodes_sort(&mut self, sort: Option<Arc<dyn BarcodeComparator>>);
    fn set_preview_scale_type(&mut self, scale_type: PreviewScaleType);
    fn set_clear_focus_delay(&mut self, delay: ClearFocusDelay);

    /// Applies every field of `options` through its setter.
    fn set_options(&mut self, options: Options) {
        let Options {
            camera_facing,
            flash_mode,
            barcode_formats,
            min_barcode_width,
            barcodes_sort,
            preview_scale_type,
            clear_focus_delay,
        } = options;
        self.set_camera_facing(camera_facing);
        self.set_camera_flash_mode(flash_mode);
        self.set_barcode_formats(barcode_formats);
        self.set_min_barcode_width(min_barcode_width);
        self.set_barcodes_sort(barcodes_sort);
        self.set_preview_scale_type(preview_scale_type);
        self.set_clear_focus_delay(clear_focus_delay);
    }
}

/// Receives scan results and camera failures.
pub trait ScanObserver: Send {
    /// Every non-empty result, in publication order.
    fn on_barcodes(&mut self, _barcodes: &[Barcode]) {}

    /// The first barcode of every non-empty result.
    fn on_barcode(&mut self, _barcode: &Barcode) {}

    /// A camera failure. The camera has already been released.
    fn on_camera_error(&mut self, _error: &CameraError) {}
}

/// Running counters kept by the scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub frames_received: u64,
    pub frames_dropped_busy: u64,
    pub frames_dropped_paused: u64,
    /// Frames the processor could not hand to a detector.
    pub frames_dropped_failed: u64,
    pub frames_submitted: u64,
    pub detections_published: u64,
    pub detection_failures: u64,
    pub camera_errors: u64,
    pub camera_starts: u64,
    pub focus_requests: u64,
    pub focus_clears: u64,
}

/// Lifecycle-bound barcode scanner.
pub struct Scanner {
    camera: CameraSession,
    processor: FrameProcessor,
    readers: Box<dyn ImageReaderFactory>,
    reader: Option<Box<dyn ImageReader>>,
    display: Box<dyn Display>,
    clock: Box<dyn Clock>,
    custom_surfaces: Vec<SurfaceRef>,
    observers: Vec<Box<dyn ScanObserver>>,
    paused: bool,
    subscribed: bool,
    min_barcode_width: Option<u32>,
    preview_scale_type: PreviewScaleType,
    clear_focus_delay: ClearFocusDelay,
    focus_clear: FocusClearSchedule,
    latest: Option<BarcodeResult>,
    stats: ScanStats,
}

impl Scanner {
    pub fn new(
        manager: Box<dyn CameraManager>,
        readers: Box<dyn ImageReaderFactory>,
        detectors: Box<dyn DetectorFactory>,
        display: Box<dyn Display>,
    ) -> Self {
        Self {
            camera: CameraSession::new(manager),
            processor: FrameProcessor::new(detectors),
            readers,
            reader: None,
            display,
            clock: Box::new(SystemClock),
            custom_surfaces: Vec::new(),
            observers: Vec::new(),
            paused: false,
            subscribed: false,
            min_barcode_width: None,
            preview_scale_type: PreviewScaleType::default(),
            clear_focus_delay: ClearFocusDelay::default(),
            focus_clear: FocusClearSchedule::default(),
            latest: None,
            stats: ScanStats::default(),
        }
    }

    /// Replaces the clock used for focus-clear timing.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn ScanObserver>) {
        self.observers.push(observer);
    }

    /// Adds a caller surface to the stream, restarting a running camera.
    pub fn add_surface(&mut self, surface: SurfaceRef) {
        self.update_camera_feature(|scanner| scanner.custom_surfaces.push(surface));
    }

    /// Starts the camera and processing.
    ///
    /// Clears the pause flag. Does nothing else if the camera is already
    /// started or opening. Failures go to observers.
    pub fn start(&mut self) {
        self.paused = false;
        if self.camera.is_started() {
            debug!("Scanner start ignored, camera already started");
            return;
        }
        if self.camera.is_opening() {
            debug!("Scanner start ignored, camera is opening");
            return;
        }

        self.subscribed = true;
        if let Err(err) = self.start_camera() {
            self.report_camera_error(err);
        }
    }

    fn start_camera(&mut self) -> Result<(), CameraError> {
        let surface = self.create_processor_surface()?;
        let mut surfaces = Vec::with_capacity(1 + self.custom_surfaces.len());
        surfaces.push(surface);
        surfaces.extend(self.custom_surfaces.iter().cloned());

        self.camera.start(surfaces)?;
        self.stats.camera_starts += 1;
        Ok(())
    }

    fn create_processor_surface(&mut self) -> Result<SurfaceRef, CameraError> {
        let min_width = self.min_width_for_barcodes();
        let size = self
            .camera
            .output_size(min_width)?
            .ok_or_else(|| CameraError::Generic("no output size available".into()))?;

        if let Some(mut previous) = self.reader.take() {
            previous.close();
        }
        let reader = self
            .readers
            .create(size, ImageFormat::Yuv420, MAX_IMAGES_IN_READER)
            .map_err(|e| CameraError::from_platform("error creating image reader", e))?;
        info!(%size, min_width, "Processing reader created");

        let surface = reader.surface();
        self.reader = Some(reader);
        Ok(surface)
    }

    /// Resumes handing frames to the processor.
    pub fn resume(&mut self) {
        self.paused = false;
        debug!("Scanner resumed");
    }

    /// Drops every new frame until resumed. The camera keeps streaming.
    pub fn pause(&mut self) {
        self.paused = true;
        debug!("Scanner paused");
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stops processing and releases the reader and camera.
    ///
    /// Safe in any state.
    pub fn release(&mut self) {
        self.subscribed = false;
        self.processor.stop();
        if let Some(mut reader) = self.reader.take() {
            reader.close();
        }
        self.camera.release();
        info!("Scanner released");
    }

    /// Runs `update`, releasing the camera first and starting it again
    /// afterwards if it was running.
    pub fn update_camera_feature(&mut self, update: impl FnOnce(&mut Self)) {
        let was_started = self.camera.is_started();
        if was_started {
            self.release();
        }
        update(self);
        if was_started {
            self.start();
        }
    }

    pub fn camera_state(&self) -> SessionState {
        self.camera.state()
    }

    /// Processing output size for the current formats, if a camera is
    /// available.
    pub fn output_size(&self) -> Option<Size> {
        match self.camera.output_size(self.min_width_for_barcodes()) {
            Ok(size) => size,
            Err(e) => {
                warn!(error = %e, "Could not determine output size");
                None
            }
        }
    }

    /// Where the preview surface sits inside a layout of `layout` pixels.
    pub fn preview_rect(&self, layout: Size, portrait: bool) -> Rect {
        calculate_preview_rect(self.preview_scale_type, self.output_size(), layout, portrait)
    }

    /// Minimum frame width for reliable detection.
    ///
    /// The caller's minimum barcode width if set, otherwise the widest
    /// minimum among the configured formats, divided by
    /// [`BARCODE_SCREEN_PROPORTION`].
    pub fn min_width_for_barcodes(&self) -> u32 {
        let min_width = self.min_barcode_width.unwrap_or_else(|| {
            self.processor
                .formats()
                .iter()
                .map(|f| f.min_width())
                .max()
                .unwrap_or(ALL_FORMATS_MIN_WIDTH)
        });
        let min_width_for_barcodes = (min_width as f64 / BARCODE_SCREEN_PROPORTION) as u32;
        trace!(min_width_for_barcodes, "Computed minimum frame width");
        min_width_for_barcodes
    }

    /// Rotation that brings frames from the open camera upright on the
    /// current display.
    pub fn rotation_compensation(&self) -> u32 {
        let sensor_orientation = self.camera.sensor_orientation().unwrap_or(0);
        let front_facing = self.camera.camera_facing() == Some(LensFacing::Front);
        rotation_compensation(self.display.rotation(), sensor_orientation, front_facing)
    }

    /// Focuses on a touch point within a view of the given size.
    ///
    /// Schedules the focus regions to be cleared after the configured delay,
    /// replacing any pending clear.
    pub fn request_camera_focus(
        &mut self,
        view_width: u32,
        view_height: u32,
        touch_x: f32,
        touch_y: f32,
    ) {
        let regions = geometry::calculate_focus_regions(
            view_width,
            view_height,
            touch_x,
            touch_y,
            self.rotation_compensation(),
            self.camera.camera_facing() == Some(LensFacing::Front),
            self.camera.active_array_size(),
        );
        let Some(regions) = regions else {
            debug!("Focus request ignored, no active array size");
            return;
        };

        match self.camera.request_focus(&regions) {
            Ok(true) => self.stats.focus_requests += 1,
            Ok(false) => {}
            Err(err) => self.report_camera_error(err),
        }
        self.schedule_clear_focus_regions();
    }

    fn schedule_clear_focus_regions(&mut self) {
        match self.clear_focus_delay {
            ClearFocusDelay::Never => self.focus_clear.cancel(),
            ClearFocusDelay::After(delay) => {
                let at = self.clock.now() + delay;
                self.focus_clear.schedule(at);
                trace!(?delay, "Focus clear scheduled");
            }
        }
    }

    /// Parses and applies a clear-focus delay in milliseconds, `-1` for never.
    pub fn set_clear_focus_delay_millis(&mut self, millis: i64) -> Result<(), OptionsError> {
        let delay = ClearFocusDelay::from_millis(millis)?;
        self.set_clear_focus_delay(delay);
        Ok(())
    }

    /// When the next timer is due, if one is pending.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.focus_clear.deadline()
    }

    /// Fires due timers.
    pub fn poll_timers(&mut self) {
        if !self.focus_clear.take_due(self.clock.now()) {
            return;
        }
        if !self.camera.is_started() {
            debug!("Focus clear skipped, camera not started");
            return;
        }
        self.stats.focus_clears += 1;
        if let Err(err) = self.camera.clear_focus_regions() {
            self.report_camera_error(err);
        }
    }

    /// Applies one marshalled callback.
    pub fn handle_event(&mut self, event: ScannerEvent) {
        match event {
            ScannerEvent::Camera(event) => {
                if let Err(err) = self.camera.handle_event(event) {
                    self.report_camera_error(err);
                }
            }
            ScannerEvent::ImageAvailable => self.on_image_available(),
            ScannerEvent::DetectionComplete(outcome) => match self.processor.complete(outcome) {
                Completion::Published(result) => self.publish(result),
                Completion::Failed(_) => self.stats.detection_failures += 1,
                Completion::Stale => {}
            },
        }
    }

    /// Handles every queued event, then fires due timers.
    ///
    /// Returns the number of events handled.
    pub fn pump(&mut self, queue: &EventQueue) -> usize {
        let mut handled = 0;
        while let Some(event) = queue.try_next() {
            self.handle_event(event);
            handled += 1;
        }
        self.poll_timers();
        handled
    }

    /// Waits up to `max_wait` for an event, or less if a timer falls due
    /// sooner, then pumps.
    pub fn wait_and_pump(&mut self, queue: &EventQueue, max_wait: Duration) -> usize {
        let wait = match self.focus_clear.deadline() {
            Some(deadline) => deadline
                .saturating_duration_since(self.clock.now())
                .min(max_wait),
            None => max_wait,
        };
        let mut handled = 0;
        if let Some(event) = queue.next_timeout(wait) {
            self.handle_event(event);
            handled += 1;
        }
        handled + self.pump(queue)
    }

    fn on_image_available(&mut self) {
        let Some(reader) = self.reader.as_mut() else {
            trace!("Image available without a reader");
            return;
        };
        let Some(frame) = reader.acquire_latest_image() else {
            return;
        };
        let (width, height) = (reader.width(), reader.height());
        self.stats.frames_received += 1;

        if self.paused {
            trace!(sequence = frame.sequence(), "Scanner paused, dropping frame");
            self.stats.frames_dropped_paused += 1;
            return;
        }
        if self.processor.is_processing() {
            trace!(sequence = frame.sequence(), "Processor busy, dropping frame");
            self.stats.frames_dropped_busy += 1;
            return;
        }

        let metadata = FrameMetadata {
            width,
            height,
            rotation_degrees: self.rotation_compensation(),
            camera_facing: self.camera.camera_facing(),
        };
        if self.processor.process(frame, metadata) {
            self.stats.frames_submitted += 1;
        } else {
            self.stats.frames_dropped_failed += 1;
        }
    }

    fn publish(&mut self, result: BarcodeResult) {
        if !self.subscribed {
            trace!("Result arrived while unsubscribed");
            return;
        }
        let Some(first) = result.first() else {
            trace!("No barcodes found");
            return;
        };

        for observer in &mut self.observers {
            observer.on_barcodes(&result.barcodes);
            observer.on_barcode(first);
        }
        self.stats.detections_published += 1;
        debug!(
            count = result.barcodes.len(),
            first = %first,
            "Barcodes published"
        );
        self.latest = Some(result);
    }

    fn report_camera_error(&mut self, err: CameraError) {
        error!(error = %err, "Camera error");
        self.stats.camera_errors += 1;
        for observer in &mut self.observers {
            observer.on_camera_error(&err);
        }
    }

    /// The most recent non-empty result.
    pub fn latest_result(&self) -> Option<&BarcodeResult> {
        self.latest.as_ref()
    }

    /// Barcodes of the most recent detection; empty once released.
    pub fn barcodes(&self) -> &[Barcode] {
        self.processor.barcodes()
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn barcode_formats(&self) -> &[BarcodeFormat] {
        self.processor.formats()
    }

    pub fn preview_scale_type(&self) -> PreviewScaleType {
        self.preview_scale_type
    }

    pub fn clear_focus_delay(&self) -> ClearFocusDelay {
        self.clear_focus_delay
    }
}

impl ScannerControl for Scanner {
    fn set_camera_facing(&mut self, facing: LensFacing) {
        self.update_camera_feature(|scanner| scanner.camera.set_requested_facing(facing));
    }

    fn set_camera_flash_mode(&mut self, flash_mode: FlashMode) {
        self.update_camera_feature(|scanner| scanner.camera.set_requested_flash_mode(flash_mode));
    }

    fn set_barcode_formats(&mut self, formats: Vec<BarcodeFormat>) {
        self.processor.set_formats(formats);
    }

    fn set_min_barcode_width(&mut self, width: Option<u32>) {
        self.min_barcode_width = width;
    }

    fn set_barcodes_sort(&mut self, sort: Option<Arc<dyn BarcodeComparator>>) {
        self.processor.set_sort(sort);
    }

    /// Only affects [`preview_rect`](Scanner::preview_rect).
    fn set_preview_scale_type(&mut self, scale_type: PreviewScaleType) {
        self.preview_scale_type = scale_type;
    }

    fn set_clear_focus_delay(&mut self, delay: ClearFocusDelay) {
        self.clear_focus_delay = delay;
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::mock::{back_camera, front_camera, MockPlatform, MockSurface, PlatformCall};
    use crate::camera::{
        CameraCharacteristics, CameraEvent, CameraEventKind, CameraId, PlatformError, SurfaceId,
    };
    use crate::capture::MockFrameFeed;
    use crate::dispatch;
    use crate::geometry::DisplayRotation;
    use crate::platform::{FixedDisplay, ManualClock};
    use crate::processor::{
        CentralBarcodeComparator, DetectorCall, DetectorError, MockDetectorFactory, RawBarcode,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct ObserverLog {
        barcodes: Vec<Vec<Barcode>>,
        first: Vec<Barcode>,
        errors: Vec<CameraError>,
    }

    struct Recorder(Arc<Mutex<ObserverLog>>);

    impl ScanObserver for Recorder {
        fn on_barcodes(&mut self, barcodes: &[Barcode]) {
            self.0.lock().unwrap().barcodes.push(barcodes.to_vec());
        }

        fn on_barcode(&mut self, barcode: &Barcode) {
            self.0.lock().unwrap().first.push(barcode.clone());
        }

        fn on_camera_error(&mut self, error: &CameraError) {
            self.0.lock().unwrap().errors.push(error.clone());
        }
    }

    struct Harness {
        scanner: Scanner,
        queue: EventQueue,
        platform: MockPlatform,
        feed: MockFrameFeed,
        detector: MockDetectorFactory,
        display: FixedDisplay,
        clock: ManualClock,
        log: Arc<Mutex<ObserverLog>>,
    }

    impl Harness {
        fn pump(&mut self) -> usize {
            self.scanner.pump(&self.queue)
        }

        fn started() -> Self {
            let mut h = harness(true);
            h.scanner.start();
            h.pump();
            assert_eq!(h.scanner.camera_state(), SessionState::Streaming);
            h
        }

        fn push_frame(&mut self) {
            assert!(self.feed.push_pixels(vec![0u8; 64]));
            self.pump();
        }
    }

    fn harness(respond_detections: bool) -> Harness {
        harness_with(
            respond_detections,
            vec![
                (CameraId::new("0"), back_camera()),
                (CameraId::new("1"), front_camera()),
            ],
        )
    }

    fn harness_with(
        respond_detections: bool,
        cameras: Vec<(CameraId, CameraCharacteristics)>,
    ) -> Harness {
        let (sender, queue) = dispatch::channel();
        let platform = MockPlatform::with_responder(sender.clone());
        let feed = MockFrameFeed::with_responder(sender.clone());
        let detector = if respond_detections {
            MockDetectorFactory::with_responder(sender)
        } else {
            MockDetectorFactory::new()
        };
        let display = FixedDisplay::new(DisplayRotation::Rotation0);
        let clock = ManualClock::new();
        let manager = platform.manager(cameras);

        let mut scanner = Scanner::new(
            Box::new(manager),
            Box::new(feed.factory()),
            Box::new(detector.clone()),
            Box::new(display.clone()),
        )
        .with_clock(Box::new(clock.clone()));
        let log = Arc::new(Mutex::new(ObserverLog::default()));
        scanner.add_observer(Box::new(Recorder(Arc::clone(&log))));

        Harness {
            scanner,
            queue,
            platform,
            feed,
            detector,
            display,
            clock,
            log,
        }
    }

    fn raw(value: &str) -> RawBarcode {
        RawBarcode {
            display_value: Some(value.into()),
            raw_value: Some(value.into()),
            format: BarcodeFormat::QrCode,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_streams_into_processor_surface() {
        let h = Harness::started();
        assert_eq!(h.feed.readers_created(), vec![Size::new(1920, 1080)]);
        assert_eq!(
            h.platform
                .count(|c| *c == PlatformCall::CreateSession(vec![SurfaceId(1000)])),
            1
        );
        assert_eq!(h.scanner.stats().camera_starts, 1);
    }

    #[test]
    fn test_frame_detected_and_published() {
        let mut h = Harness::started();
        h.detector.push_result(Ok(vec![raw("first"), raw("second")]));
        h.push_frame();

        let log = h.log.lock().unwrap();
        assert_eq!(log.barcodes.len(), 1);
        assert_eq!(log.barcodes[0].len(), 2);
        assert_eq!(log.first[0].to_string(), "first");
        drop(log);

        assert_eq!(h.scanner.latest_result().map(|r| r.barcodes.len()), Some(2));
        assert_eq!(h.scanner.barcodes().len(), 2);
        assert_eq!(h.feed.released(), 1);
        assert_eq!(h.feed.outstanding(), 0);
        let stats = h.scanner.stats();
        assert_eq!(stats.frames_submitted, 1);
        assert_eq!(stats.detections_published, 1);
    }

    #[test]
    fn test_empty_result_not_published() {
        let mut h = Harness::started();
        h.push_frame();
        assert!(h.log.lock().unwrap().barcodes.is_empty());
        assert!(h.scanner.latest_result().is_none());
        assert_eq!(h.scanner.stats().detections_published, 0);
        assert_eq!(h.feed.released(), 1);
    }

    #[test]
    fn test_frame_dropped_while_busy() {
        let mut h = harness(false);
        h.scanner.start();
        h.pump();

        h.push_frame();
        h.push_frame();
        assert_eq!(h.detector.count(|c| matches!(c, DetectorCall::Detect { .. })), 1);
        assert_eq!(h.scanner.stats().frames_dropped_busy, 1);
        assert_eq!(h.feed.released(), 1);
        assert_eq!(h.feed.outstanding(), 1);

        h.scanner.release();
        assert_eq!(h.feed.released(), 2);
        assert_eq!(h.feed.outstanding(), 0);
    }

    #[test]
    fn test_paused_frames_never_reach_processor() {
        let mut h = Harness::started();
        h.scanner.pause();
        h.platform.clear_calls();

        h.push_frame();
        assert_eq!(h.detector.count(|c| matches!(c, DetectorCall::Detect { .. })), 0);
        assert_eq!(h.scanner.stats().frames_dropped_paused, 1);
        assert_eq!(h.feed.released(), 1);

        h.scanner.resume();
        assert!(!h.scanner.is_paused());
        assert_eq!(h.scanner.camera_state(), SessionState::Streaming);
        assert!(h.platform.calls().is_empty());

        h.push_frame();
        assert_eq!(h.detector.count(|c| matches!(c, DetectorCall::Detect { .. })), 1);
    }

    #[test]
    fn test_start_clears_pause_and_is_idempotent() {
        let mut h = harness(true);
        h.scanner.pause();
        h.scanner.start();
        assert!(!h.scanner.is_paused());

        // Opening: short-circuit.
        h.scanner.start();
        h.pump();
        // Started: short-circuit.
        h.scanner.start();

        assert_eq!(
            h.platform.count(|c| matches!(c, PlatformCall::OpenCamera(_))),
            1
        );
        assert_eq!(h.feed.readers_created().len(), 1);
    }

    #[test]
    fn test_facing_change_while_running_restarts() {
        let mut h = Harness::started();
        h.platform.clear_calls();

        h.scanner.set_camera_facing(LensFacing::Front);
        h.pump();

        let calls = h.platform.calls();
        assert_eq!(
            &calls[..3],
            &[
                PlatformCall::CloseSession,
                PlatformCall::CloseDevice,
                PlatformCall::OpenCamera(CameraId::new("1")),
            ]
        );
        assert_eq!(h.scanner.camera_state(), SessionState::Streaming);
        assert_eq!(h.feed.readers_closed(), 1);
        assert_eq!(
            h.feed.readers_created(),
            vec![Size::new(1920, 1080), Size::new(1280, 720)]
        );
    }

    #[test]
    fn test_facing_change_while_stopped_applies_without_start() {
        let mut h = harness(true);
        h.scanner.set_camera_facing(LensFacing::Front);
        assert!(h.platform.calls().is_empty());
        assert!(h.feed.readers_created().is_empty());

        h.scanner.start();
        assert_eq!(
            h.platform.calls(),
            vec![PlatformCall::OpenCamera(CameraId::new("1"))]
        );
    }

    #[test]
    fn test_add_surface_while_running_restarts() {
        let mut h = Harness::started();
        h.platform.clear_calls();

        h.scanner.add_surface(Arc::new(MockSurface::new(7)));
        h.pump();

        assert_eq!(h.platform.count(|c| *c == PlatformCall::CloseDevice), 1);
        assert_eq!(
            h.platform.count(|c| *c
                == PlatformCall::CreateSession(vec![SurfaceId(1001), SurfaceId(7)])),
            1
        );
    }

    #[test]
    fn test_add_surface_while_stopped() {
        let mut h = harness(true);
        h.scanner.add_surface(Arc::new(MockSurface::new(7)));
        assert!(h.platform.calls().is_empty());

        h.scanner.start();
        h.pump();
        assert_eq!(
            h.platform
                .count(|c| *c == PlatformCall::CreateSession(vec![SurfaceId(1000), SurfaceId(7)])),
            1
        );
    }

    #[test]
    fn test_flash_mode_applied_on_restart() {
        let mut h = Harness::started();
        h.scanner.set_camera_flash_mode(FlashMode::Torch);
        h.pump();

        let last_repeating = h.platform.calls().into_iter().rev().find_map(|c| match c {
            PlatformCall::SetRepeating(request) => Some(request),
            _ => None,
        });
        assert_eq!(last_repeating.map(|r| r.flash_mode), Some(FlashMode::Torch));
    }

    #[test]
    fn test_focus_request_then_scheduled_clear() {
        let mut h = Harness::started();
        h.platform.clear_calls();

        h.scanner.request_camera_focus(1000, 1000, 10.0, 20.0);
        assert_eq!(h.platform.count(|c| *c == PlatformCall::StopRepeating), 1);
        assert_eq!(
            h.platform
                .count(|c| matches!(c, PlatformCall::Capture(_, Some(_)))),
            1
        );
        assert!(h.scanner.next_timer_deadline().is_some());

        // Trigger completes: preview repeats with the regions.
        h.pump();
        let with_regions = h.platform.count(
            |c| matches!(c, PlatformCall::SetRepeating(request) if request.has_regions()),
        );
        assert_eq!(with_regions, 1);

        h.clock.advance(Duration::from_millis(4999));
        h.pump();
        assert_eq!(h.scanner.stats().focus_clears, 0);

        h.clock.advance(Duration::from_millis(1));
        h.pump();
        assert_eq!(h.scanner.stats().focus_clears, 1);
        assert_eq!(h.platform.count(|c| *c == PlatformCall::StopRepeating), 2);
        let last_repeating = h.platform.calls().into_iter().rev().find_map(|c| match c {
            PlatformCall::SetRepeating(request) => Some(request),
            _ => None,
        });
        assert_eq!(last_repeating.map(|r| r.has_regions()), Some(false));
        assert!(h.scanner.next_timer_deadline().is_none());
    }

    #[test]
    fn test_new_focus_request_reschedules_clear() {
        let mut h = Harness::started();
        h.scanner.request_camera_focus(1000, 1000, 10.0, 20.0);
        h.clock.advance(Duration::from_secs(3));
        h.scanner.request_camera_focus(1000, 1000, 500.0, 500.0);
        h.clock.advance(Duration::from_secs(3));
        h.pump();
        assert_eq!(h.scanner.stats().focus_clears, 0);

        h.clock.advance(Duration::from_secs(2));
        h.pump();
        assert_eq!(h.scanner.stats().focus_clears, 1);
        assert_eq!(h.scanner.stats().focus_requests, 2);
    }

    #[test]
    fn test_clear_focus_delay_never_and_invalid() {
        let mut h = Harness::started();
        assert!(h.scanner.set_clear_focus_delay_millis(-1).is_ok());
        h.scanner.request_camera_focus(1000, 1000, 10.0, 20.0);
        assert!(h.scanner.next_timer_deadline().is_none());

        assert_eq!(
            h.scanner.set_clear_focus_delay_millis(-5),
            Err(OptionsError::InvalidClearFocusDelay(-5))
        );
        assert_eq!(h.scanner.clear_focus_delay(), ClearFocusDelay::Never);
    }

    #[test]
    fn test_focus_clear_skipped_after_release() {
        let mut h = Harness::started();
        h.scanner.request_camera_focus(1000, 1000, 10.0, 20.0);
        h.scanner.release();
        h.platform.clear_calls();

        h.clock.advance(Duration::from_secs(5));
        h.pump();
        assert_eq!(h.scanner.stats().focus_clears, 0);
        assert!(h.platform.calls().is_empty());
    }

    #[test]
    fn test_detector_failure_counts_as_dropped_frame() {
        let mut h = Harness::started();
        h.detector
            .fail_next_create(DetectorError::Unavailable("no model".into()));
        h.push_frame();

        let stats = h.scanner.stats();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.frames_submitted, 0);
        assert_eq!(stats.frames_dropped_failed, 1);
        assert_eq!(h.feed.released(), 1);
        assert_eq!(h.feed.outstanding(), 0);
    }

    #[test]
    fn test_focus_not_counted_without_af_regions() {
        let mut chars = back_camera();
        chars.max_regions_af = 0;
        let mut h = harness_with(true, vec![(CameraId::new("0"), chars)]);
        h.scanner.start();
        h.pump();
        assert_eq!(h.scanner.camera_state(), SessionState::Streaming);
        h.platform.clear_calls();

        h.scanner.request_camera_focus(1000, 1000, 10.0, 20.0);
        assert_eq!(h.scanner.stats().focus_requests, 0);
        assert!(h.platform.calls().is_empty());
        assert_eq!(h.scanner.stats().camera_errors, 0);
        assert!(h.log.lock().unwrap().errors.is_empty());
    }

    #[test]
    fn test_focus_ignored_before_camera_opens() {
        let mut h = harness(true);
        h.scanner.request_camera_focus(1000, 1000, 10.0, 20.0);
        assert_eq!(h.scanner.stats().focus_requests, 0);
        assert!(h.scanner.next_timer_deadline().is_none());
    }

    #[test]
    fn test_open_failure_reported_once() {
        let mut h = harness(true);
        h.platform
            .fail_next_open(PlatformError::Access("permission revoked".into()));
        h.scanner.start();
        h.pump();

        let log = h.log.lock().unwrap();
        assert_eq!(log.errors.len(), 1);
        assert!(matches!(log.errors[0], CameraError::Access(_)));
        drop(log);
        assert_eq!(h.scanner.camera_state(), SessionState::Idle);
        assert_eq!(h.scanner.stats().camera_errors, 1);
    }

    #[test]
    fn test_disconnect_releases_camera_and_reports() {
        let mut h = Harness::started();
        h.platform.clear_calls();
        let token = h.platform.last_token().unwrap();

        h.scanner.handle_event(ScannerEvent::Camera(CameraEvent {
            token,
            kind: CameraEventKind::DeviceDisconnected,
        }));

        assert_eq!(h.scanner.camera_state(), SessionState::Idle);
        assert_eq!(
            h.platform.calls(),
            vec![PlatformCall::CloseSession, PlatformCall::CloseDevice]
        );
        assert_eq!(
            h.log.lock().unwrap().errors,
            vec![CameraError::Access("camera device disconnected".into())]
        );

        // No automatic retry; an explicit start opens again.
        h.scanner.start();
        assert_eq!(
            h.platform.count(|c| matches!(c, PlatformCall::OpenCamera(_))),
            1
        );
    }

    #[test]
    fn test_release_mid_open_closes_late_device() {
        let mut h = harness(true);
        h.scanner.start();
        h.scanner.release();
        h.pump();

        assert_eq!(h.scanner.camera_state(), SessionState::Idle);
        assert_eq!(h.platform.count(|c| *c == PlatformCall::CloseDevice), 1);
        assert_eq!(
            h.platform.count(|c| matches!(c, PlatformCall::CreateSession(_))),
            0
        );
        assert!(h.log.lock().unwrap().errors.is_empty());
    }

    #[test]
    fn test_release_clears_barcodes_and_stops_publishing() {
        let mut h = harness(false);
        h.scanner.start();
        h.pump();
        h.push_frame();
        let ticket = h.detector.last_ticket().unwrap();

        h.scanner.release();
        h.scanner
            .handle_event(ScannerEvent::DetectionComplete(crate::processor::DetectionOutcome {
                ticket,
                result: Ok(vec![raw("late")]),
            }));

        assert!(h.scanner.barcodes().is_empty());
        assert!(h.log.lock().unwrap().barcodes.is_empty());
        assert_eq!(h.feed.readers_closed(), 1);
    }

    #[test]
    fn test_min_width_for_barcodes() {
        let mut h = harness(true);
        assert_eq!(h.scanner.min_width_for_barcodes(), 3853);

        h.scanner
            .set_barcode_formats(vec![BarcodeFormat::Ean13, BarcodeFormat::Code128]);
        assert_eq!(h.scanner.min_width_for_barcodes(), 733);

        h.scanner.set_min_barcode_width(Some(300));
        assert_eq!(h.scanner.min_width_for_barcodes(), 1000);

        h.scanner.set_min_barcode_width(None);
        assert_eq!(h.scanner.min_width_for_barcodes(), 733);
    }

    #[test]
    fn test_qr_only_negotiates_smaller_output() {
        let mut h = harness(true);
        h.scanner.set_barcode_formats(vec![BarcodeFormat::QrCode]);
        assert_eq!(h.scanner.output_size(), Some(Size::new(1280, 720)));
    }

    #[test]
    fn test_frame_rotation_follows_display() {
        let mut h = Harness::started();
        h.display.set_rotation(DisplayRotation::Rotation270);
        assert_eq!(h.scanner.rotation_compensation(), 180);

        h.push_frame();
        let rotation = h.detector.calls().into_iter().find_map(|c| match c {
            DetectorCall::Detect {
                rotation_degrees, ..
            } => Some(rotation_degrees),
            _ => None,
        });
        assert_eq!(rotation, Some(180));
    }

    #[test]
    fn test_preview_rect_uses_output_size() {
        let mut h = harness(true);
        let portrait = h.scanner.preview_rect(Size::new(1080, 1920), true);
        assert_eq!(portrait, Rect::new(0, 0, 1080, 1920));

        h.scanner.set_preview_scale_type(PreviewScaleType::CenterInside);
        let landscape = h.scanner.preview_rect(Size::new(1000, 1000), false);
        assert_eq!(landscape, Rect::new(0, 219, 1000, 781));
    }

    #[test]
    fn test_lifecycle_events() {
        let mut h = harness(true);
        h.scanner.handle_lifecycle(LifecycleEvent::Start);
        h.pump();
        assert_eq!(h.scanner.camera_state(), SessionState::Streaming);

        h.scanner.handle_lifecycle(LifecycleEvent::Pause);
        assert!(h.scanner.is_paused());
        h.scanner.handle_lifecycle(LifecycleEvent::Resume);
        assert!(!h.scanner.is_paused());

        h.scanner.handle_lifecycle(LifecycleEvent::Stop);
        assert_eq!(h.scanner.camera_state(), SessionState::Idle);
        assert_eq!(h.feed.readers_closed(), 1);

        // Stop twice and pause while stopped are harmless.
        h.scanner.handle_lifecycle(LifecycleEvent::Stop);
        h.scanner.handle_lifecycle(LifecycleEvent::Pause);
        h.scanner.handle_lifecycle(LifecycleEvent::Start);
        h.pump();
        assert_eq!(h.scanner.camera_state(), SessionState::Streaming);
    }

    #[test]
    fn test_set_options_applies_to_scanner() {
        let mut h = harness(true);
        let options = Options::builder()
            .barcode_formats(vec![BarcodeFormat::QrCode])
            .min_barcode_width(120)
            .barcodes_sort(Some(Arc::new(CentralBarcodeComparator)))
            .preview_scale_type(PreviewScaleType::CenterCrop)
            .clear_focus_delay_ms(250)
            .build()
            .unwrap();
        h.scanner.set_options(options);

        assert_eq!(h.scanner.barcode_formats(), &[BarcodeFormat::QrCode]);
        assert_eq!(h.scanner.min_width_for_barcodes(), 400);
        assert_eq!(h.scanner.preview_scale_type(), PreviewScaleType::CenterCrop);
        assert_eq!(
            h.scanner.clear_focus_delay(),
            ClearFocusDelay::After(Duration::from_millis(250))
        );
        // Not running: no camera traffic.
        assert!(h.platform.calls().is_empty());
    }

    #[derive(Default)]
    struct RecordingControl {
        facing: Vec<LensFacing>,
        flash: Vec<FlashMode>,
        formats: Vec<Vec<BarcodeFormat>>,
        min_width: Vec<Option<u32>>,
        sort: Vec<Option<Arc<dyn BarcodeComparator>>>,
        scale: Vec<PreviewScaleType>,
        delay: Vec<ClearFocusDelay>,
    }

    impl ScannerControl for RecordingControl {
        fn set_camera_facing(&mut self, facing: LensFacing) {
            self.facing.push(facing);
        }

        fn set_camera_flash_mode(&mut self, flash_mode: FlashMode) {
            self.flash.push(flash_mode);
        }

        fn set_barcode_formats(&mut self, formats: Vec<BarcodeFormat>) {
            self.formats.push(formats);
        }

        fn set_min_barcode_width(&mut self, width: Option<u32>) {
            self.min_width.push(width);
        }

        fn set_barcodes_sort(&mut self, sort: Option<Arc<dyn BarcodeComparator>>) {
            self.sort.push(sort);
        }

        fn set_preview_scale_type(&mut self, scale_type: PreviewScaleType) {
            self.scale.push(scale_type);
        }

        fn set_clear_focus_delay(&mut self, delay: ClearFocusDelay) {
            self.delay.push(delay);
        }
    }

    #[test]
    fn test_set_options_calls_each_setter_once() {
        let sort: Arc<dyn BarcodeComparator> = Arc::new(CentralBarcodeComparator);
        let options = Options::builder()
            .camera_facing(LensFacing::External)
            .flash_mode(FlashMode::Single)
            .barcode_formats(vec![BarcodeFormat::Ean8, BarcodeFormat::UpcE])
            .min_barcode_width(42)
            .barcodes_sort(Some(Arc::clone(&sort)))
            .preview_scale_type(PreviewScaleType::CenterCrop)
            .clear_focus_delay_ms(1234)
            .build()
            .unwrap();

        let mut control = RecordingControl::default();
        control.set_options(options);

        assert_eq!(control.facing, vec![LensFacing::External]);
        assert_eq!(control.flash, vec![FlashMode::Single]);
        assert_eq!(
            control.formats,
            vec![vec![BarcodeFormat::Ean8, BarcodeFormat::UpcE]]
        );
        assert_eq!(control.min_width, vec![Some(42)]);
        assert_eq!(control.sort.len(), 1);
        assert!(Arc::ptr_eq(control.sort[0].as_ref().unwrap(), &sort));
        assert_eq!(control.scale, vec![PreviewScaleType::CenterCrop]);
        assert_eq!(
            control.delay,
            vec![ClearFocusDelay::After(Duration::from_millis(1234))]
        );
    }
}
