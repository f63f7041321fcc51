//! Scriptable in-process camera platform.
//!
//! Every platform call is appended to a shared log so tests can assert on
//! the exact sequence. With a responder attached, the mock also answers
//! asynchronous calls by posting the matching success event, which is
//! enough to drive a full scan loop without hardware.

use super::{
    AeMode, AfMode, AwbMode, CameraCharacteristics, CameraDevice, CameraEvent, CameraEventKind,
    CameraId, CameraManager, CaptureRequest, CaptureSession, CaptureTag, LensFacing,
    PlatformError, SessionToken, Surface, SurfaceId, SurfaceRef,
};
use crate::dispatch::{EventSender, ScannerEvent};
use crate::geometry::{Rect, Size};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A call made into the mock platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    OpenCamera(CameraId),
    CreateSession(Vec<SurfaceId>),
    SetRepeating(CaptureRequest),
    StopRepeating,
    Capture(CaptureRequest, Option<CaptureTag>),
    CloseSession,
    CloseDevice,
}

#[derive(Default)]
struct MockState {
    calls: Vec<PlatformCall>,
    last_token: Option<SessionToken>,
    last_capture_tag: Option<CaptureTag>,
    responder: Option<EventSender>,
    fail_open: Option<PlatformError>,
    fail_session: Option<PlatformError>,
    fail_repeating: Option<PlatformError>,
}

/// Shared handle onto the mock platform's log and script.
#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform that answers every open, configure and tagged capture
    /// with a success event posted to `sender`.
    pub fn with_responder(sender: EventSender) -> Self {
        let platform = Self::new();
        platform.lock().responder = Some(sender);
        platform
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: PlatformCall) {
        self.lock().calls.push(call);
    }

    fn respond(&self, event: CameraEvent) {
        let responder = self.lock().responder.clone();
        match responder {
            Some(sender) => {
                sender.post(ScannerEvent::Camera(event));
            }
            None => drop(event),
        }
    }

    /// Camera manager exposing `cameras` in order.
    pub fn manager(&self, cameras: Vec<(CameraId, CameraCharacteristics)>) -> MockCameraManager {
        MockCameraManager {
            platform: self.clone(),
            cameras,
        }
    }

    /// A device as the platform would hand it to an open callback.
    pub fn device(&self, id: &str) -> Box<dyn CameraDevice> {
        Box::new(MockDevice {
            platform: self.clone(),
            id: CameraId::new(id),
            closed: false,
        })
    }

    /// A session as the platform would hand it to a configure callback.
    pub fn session(&self) -> Box<dyn CaptureSession> {
        Box::new(MockSession {
            platform: self.clone(),
            closed: false,
        })
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&PlatformCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Token passed to the most recent `open_camera`.
    pub fn last_token(&self) -> Option<SessionToken> {
        self.lock().last_token
    }

    /// Tag of the most recent tagged capture.
    pub fn last_capture_tag(&self) -> Option<CaptureTag> {
        self.lock().last_capture_tag
    }

    /// Makes the next `open_camera` fail synchronously.
    pub fn fail_next_open(&self, err: PlatformError) {
        self.lock().fail_open = Some(err);
    }

    /// Makes the next `create_capture_session` fail synchronously.
    pub fn fail_next_session(&self, err: PlatformError) {
        self.lock().fail_session = Some(err);
    }

    /// Makes the next `set_repeating_request` fail synchronously.
    pub fn fail_next_repeating(&self, err: PlatformError) {
        self.lock().fail_repeating = Some(err);
    }
}

/// Camera manager over a fixed list of cameras.
pub struct MockCameraManager {
    platform: MockPlatform,
    cameras: Vec<(CameraId, CameraCharacteristics)>,
}

impl CameraManager for MockCameraManager {
    fn camera_ids(&self) -> Result<Vec<CameraId>, PlatformError> {
        Ok(self.cameras.iter().map(|(id, _)| id.clone()).collect())
    }

    fn characteristics(&self, id: &CameraId) -> Result<CameraCharacteristics, PlatformError> {
        self.cameras
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| PlatformError::IllegalArgument(format!("unknown camera id {id}")))
    }

    fn open_camera(&mut self, id: &CameraId, token: SessionToken) -> Result<(), PlatformError> {
        {
            let mut state = self.platform.lock();
            if let Some(err) = state.fail_open.take() {
                return Err(err);
            }
            state.calls.push(PlatformCall::OpenCamera(id.clone()));
            state.last_token = Some(token);
        }
        self.platform.respond(CameraEvent {
            token,
            kind: CameraEventKind::DeviceOpened(self.platform.device(id.as_str())),
        });
        Ok(())
    }
}

struct MockDevice {
    platform: MockPlatform,
    id: CameraId,
    closed: bool,
}

impl CameraDevice for MockDevice {
    fn id(&self) -> &CameraId {
        &self.id
    }

    fn create_capture_session(
        &mut self,
        surfaces: &[SurfaceRef],
        token: SessionToken,
    ) -> Result<(), PlatformError> {
        if self.closed {
            return Err(PlatformError::IllegalState("device closed".into()));
        }
        if let Some(err) = self.platform.lock().fail_session.take() {
            return Err(err);
        }
        self.platform.record(PlatformCall::CreateSession(
            surfaces.iter().map(|s| s.id()).collect(),
        ));
        self.platform.respond(CameraEvent {
            token,
            kind: CameraEventKind::SessionConfigured(self.platform.session()),
        });
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.platform.record(PlatformCall::CloseDevice);
        }
    }
}

struct MockSession {
    platform: MockPlatform,
    closed: bool,
}

impl MockSession {
    fn check_open(&self) -> Result<(), PlatformError> {
        if self.closed {
            Err(PlatformError::IllegalState("session closed".into()))
        } else {
            Ok(())
        }
    }
}

impl CaptureSession for MockSession {
    fn set_repeating_request(&mut self, request: &CaptureRequest) -> Result<(), PlatformError> {
        self.check_open()?;
        if let Some(err) = self.platform.lock().fail_repeating.take() {
            return Err(err);
        }
        self.platform.record(PlatformCall::SetRepeating(request.clone()));
        Ok(())
    }

    fn stop_repeating(&mut self) -> Result<(), PlatformError> {
        self.check_open()?;
        self.platform.record(PlatformCall::StopRepeating);
        Ok(())
    }

    fn capture(
        &mut self,
        request: &CaptureRequest,
        tag: Option<CaptureTag>,
    ) -> Result<(), PlatformError> {
        self.check_open()?;
        {
            let mut state = self.platform.lock();
            state.calls.push(PlatformCall::Capture(request.clone(), tag));
            if tag.is_some() {
                state.last_capture_tag = tag;
            }
        }
        if let (Some(tag), Some(token)) = (tag, self.platform.last_token()) {
            self.platform.respond(CameraEvent {
                token,
                kind: CameraEventKind::CaptureCompleted(tag),
            });
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.platform.record(PlatformCall::CloseSession);
        }
    }
}

/// A surface whose validity can be revoked.
#[derive(Debug)]
pub struct MockSurface {
    id: SurfaceId,
    valid: AtomicBool,
}

impl MockSurface {
    pub fn new(id: u64) -> Self {
        Self {
            id: SurfaceId(id),
            valid: AtomicBool::new(true),
        }
    }

    /// Marks the surface as destroyed.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

impl Surface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

/// A typical rear camera: 90° sensor, continuous AF, one region per routine.
pub fn back_camera() -> CameraCharacteristics {
    CameraCharacteristics {
        lens_facing: Some(LensFacing::Back),
        sensor_orientation: 90,
        active_array_size: Some(Rect::new(0, 0, 4032, 3024)),
        output_sizes: vec![
            Size::new(640, 480),
            Size::new(1280, 720),
            Size::new(1920, 1080),
        ],
        af_modes: vec![AfMode::Off, AfMode::Auto, AfMode::ContinuousPicture],
        ae_modes: vec![AeMode::Off, AeMode::On],
        awb_modes: vec![AwbMode::Off, AwbMode::Auto],
        max_regions_af: 1,
        max_regions_ae: 1,
        max_regions_awb: 1,
    }
}

/// A typical fixed-focus front camera mounted at 270°.
pub fn front_camera() -> CameraCharacteristics {
    CameraCharacteristics {
        lens_facing: Some(LensFacing::Front),
        sensor_orientation: 270,
        active_array_size: Some(Rect::new(0, 0, 2592, 1944)),
        output_sizes: vec![Size::new(640, 480), Size::new(1280, 720)],
        af_modes: vec![AfMode::Off],
        ae_modes: vec![AeMode::Off, AeMode::On],
        awb_modes: vec![AwbMode::Off, AwbMode::Auto],
        max_regions_af: 0,
        max_regions_ae: 1,
        max_regions_awb: 0,
    }
}
