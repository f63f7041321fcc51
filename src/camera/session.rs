//! The camera session state machine.
//!
//! ```text
//! Idle -> Opening -> Configuring -> Streaming <-> FocusLocking
//!   ^________________________________|  (release / any failure)
//! ```

use super::{
    choose_output_size, AfMode, AfTrigger, CameraCharacteristics, CameraDevice, CameraError,
    CameraEvent, CameraEventKind, CameraId, CameraManager, CaptureRequest, CaptureSession,
    CaptureTag, FlashMode, LensFacing, SessionToken, SurfaceRef,
};
use crate::geometry::{MeteringRectangle, Rect, Size};
use tracing::{debug, error, info, trace, warn};

/// Externally visible state of a [`CameraSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    /// Waiting for the device to open.
    Opening,
    /// Device open, waiting for the capture session.
    Configuring,
    /// Repeating request running.
    Streaming,
    /// Focus trigger in flight; the repeating request is stopped.
    FocusLocking,
}

/// Data that lives for one start attempt.
struct Attempt {
    token: SessionToken,
    characteristics: CameraCharacteristics,
    surfaces: Vec<SurfaceRef>,
}

struct FocusLock {
    tag: CaptureTag,
    regions: Vec<MeteringRectangle>,
}

enum State {
    Idle,
    Opening(Attempt),
    Configuring {
        attempt: Attempt,
        device: Box<dyn CameraDevice>,
    },
    Streaming {
        attempt: Attempt,
        device: Box<dyn CameraDevice>,
        session: Box<dyn CaptureSession>,
        focus: Option<FocusLock>,
    },
}

/// Owns one camera device and its capture session.
///
/// All methods return immediately. Failures release every held resource,
/// are logged, and are returned to the caller exactly once.
pub struct CameraSession {
    manager: Box<dyn CameraManager>,
    requested_facing: LensFacing,
    requested_flash_mode: FlashMode,
    state: State,
    next_token: u64,
    next_tag: u64,
}

impl CameraSession {
    pub fn new(manager: Box<dyn CameraManager>) -> Self {
        Self {
            manager,
            requested_facing: LensFacing::Back,
            requested_flash_mode: FlashMode::Off,
            state: State::Idle,
            next_token: 0,
            next_tag: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        match &self.state {
            State::Idle => SessionState::Idle,
            State::Opening(_) => SessionState::Opening,
            State::Configuring { .. } => SessionState::Configuring,
            State::Streaming { focus: None, .. } => SessionState::Streaming,
            State::Streaming { focus: Some(_), .. } => SessionState::FocusLocking,
        }
    }

    /// True once a device is open, until it is released.
    pub fn is_started(&self) -> bool {
        matches!(
            self.state,
            State::Configuring { .. } | State::Streaming { .. }
        )
    }

    /// True while waiting for the device to open.
    pub fn is_opening(&self) -> bool {
        matches!(self.state, State::Opening(_))
    }

    pub fn requested_facing(&self) -> LensFacing {
        self.requested_facing
    }

    /// Facing used by the next [`start`](Self::start).
    pub fn set_requested_facing(&mut self, facing: LensFacing) {
        self.requested_facing = facing;
    }

    pub fn requested_flash_mode(&self) -> FlashMode {
        self.requested_flash_mode
    }

    /// Flash mode used by the next [`start`](Self::start).
    pub fn set_requested_flash_mode(&mut self, flash_mode: FlashMode) {
        self.requested_flash_mode = flash_mode;
    }

    /// Begins opening the selected camera for `surfaces`.
    ///
    /// Does nothing unless idle.
    pub fn start(&mut self, surfaces: Vec<SurfaceRef>) -> Result<(), CameraError> {
        if !matches!(self.state, State::Idle) {
            debug!(state = ?self.state(), "Camera start ignored, session not idle");
            return Ok(());
        }

        let camera_id = match self.select_camera() {
            Ok(Some(id)) => id,
            Ok(None) => {
                return Err(self.fail(CameraError::Generic(
                    "error opening camera: no camera id available".into(),
                )))
            }
            Err(e) => return Err(self.fail(e)),
        };

        let characteristics = match self.manager.characteristics(&camera_id) {
            Ok(c) => c,
            Err(e) => {
                return Err(self.fail(CameraError::from_platform(
                    "error reading camera characteristics",
                    e,
                )))
            }
        };

        let token = SessionToken(self.next_token);
        self.next_token += 1;

        if let Err(e) = self.manager.open_camera(&camera_id, token) {
            return Err(self.fail(CameraError::from_platform("error opening camera", e)));
        }

        info!(
            camera = %camera_id,
            surfaces = surfaces.len(),
            "Opening camera"
        );
        self.state = State::Opening(Attempt {
            token,
            characteristics,
            surfaces,
        });
        Ok(())
    }

    /// Tears down the capture session and device. Always leaves the session idle.
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {}
            State::Opening(_) => {
                debug!("Camera released while opening");
            }
            State::Configuring { mut device, .. } => {
                device.close();
                info!("Camera released");
            }
            State::Streaming {
                mut device,
                mut session,
                ..
            } => {
                session.close();
                device.close();
                info!("Camera released");
            }
        }
    }

    /// Applies a platform callback.
    ///
    /// Callbacks from earlier attempts close whatever they carry and are
    /// otherwise ignored.
    pub fn handle_event(&mut self, event: CameraEvent) -> Result<(), CameraError> {
        let CameraEvent { token, kind } = event;

        if self.current_token() != Some(token) {
            trace!(?kind, "Ignoring stale camera event");
            discard(kind);
            return Ok(());
        }

        match kind {
            CameraEventKind::DeviceOpened(device) => self.on_device_opened(device),
            CameraEventKind::DeviceDisconnected => Err(self.fail(CameraError::Access(
                "camera device disconnected".into(),
            ))),
            CameraEventKind::DeviceError(code) => Err(self.fail(code.into())),
            CameraEventKind::SessionConfigured(session) => self.on_session_configured(session),
            CameraEventKind::SessionConfigureFailed => {
                if matches!(self.state, State::Configuring { .. }) {
                    Err(self.fail(CameraError::SessionConfigFailed(
                        "error creating camera session".into(),
                    )))
                } else {
                    Ok(())
                }
            }
            CameraEventKind::CaptureCompleted(tag) => self.on_focus_finished(tag, true),
            CameraEventKind::CaptureFailed(tag, reason) => {
                warn!(%reason, "Focus capture failed");
                self.on_focus_finished(tag, false)
            }
        }
    }

    fn on_device_opened(&mut self, mut device: Box<dyn CameraDevice>) -> Result<(), CameraError> {
        let attempt = match std::mem::replace(&mut self.state, State::Idle) {
            State::Opening(attempt) => attempt,
            other => {
                // Duplicate open callback for the live attempt.
                self.state = other;
                device.close();
                return Ok(());
            }
        };

        info!(camera = %device.id(), "Camera opened");
        let token = attempt.token;
        let surfaces = attempt.surfaces.clone();
        self.state = State::Configuring { attempt, device };

        if surfaces.iter().any(|s| !s.is_valid()) {
            return Err(self.fail(CameraError::Generic("surfaces no longer valid".into())));
        }

        let result = match &mut self.state {
            State::Configuring { device, .. } => device.create_capture_session(&surfaces, token),
            _ => Ok(()),
        };
        result.map_err(|e| self.fail(CameraError::from_platform("error creating camera session", e)))
    }

    fn on_session_configured(
        &mut self,
        mut session: Box<dyn CaptureSession>,
    ) -> Result<(), CameraError> {
        let (attempt, device) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Configuring { attempt, device } => (attempt, device),
            other => {
                self.state = other;
                session.close();
                return Ok(());
            }
        };

        let request = self.repeating_request(&attempt, None);
        self.state = State::Streaming {
            attempt,
            device,
            session,
            focus: None,
        };
        self.with_session(|session| session.set_repeating_request(&request))
            .map_err(|e| self.fail(CameraError::from_platform("error creating capture request", e)))?;

        info!(flash = ?self.requested_flash_mode, "Camera streaming");
        Ok(())
    }

    fn on_focus_finished(&mut self, tag: CaptureTag, succeeded: bool) -> Result<(), CameraError> {
        let regions = match &mut self.state {
            State::Streaming { focus, .. } if focus.as_ref().map(|f| f.tag) == Some(tag) => {
                focus.take().map(|f| f.regions)
            }
            _ => {
                trace!(?tag, "Ignoring capture result for superseded focus request");
                return Ok(());
            }
        };

        let regions = if succeeded { regions } else { None };
        debug!(
            with_regions = regions.is_some(),
            "Focus trigger finished, restarting preview"
        );
        self.restart_repeating(regions.as_deref())
    }

    /// Triggers auto-focus on `regions`.
    ///
    /// Only runs while streaming on a device that supports auto mode and at
    /// least one AF region. Preview repeats with the regions once the
    /// trigger completes, or without them if it fails.
    ///
    /// Returns whether a trigger was issued.
    pub fn request_focus(&mut self, regions: &[MeteringRectangle]) -> Result<bool, CameraError> {
        let characteristics = match &self.state {
            State::Streaming { attempt, .. } => &attempt.characteristics,
            _ => {
                debug!("Focus request ignored, camera not streaming");
                return Ok(false);
            }
        };
        if !characteristics.supports_focus_regions() {
            debug!("Focus request ignored, device has no AF region support");
            return Ok(false);
        }

        let tag = CaptureTag(self.next_tag);
        self.next_tag += 1;

        let (cancel, trigger) = match &self.state {
            State::Streaming { attempt, .. } => (
                self.base_request(attempt, None)
                    .with_af_trigger(AfTrigger::Cancel),
                self.base_request(attempt, Some(regions))
                    .with_af_mode(AfMode::Auto)
                    .with_af_trigger(AfTrigger::Start),
            ),
            _ => return Ok(false),
        };

        self.with_session(|session| {
            session.stop_repeating()?;
            session.capture(&cancel, None)?;
            session.capture(&trigger, Some(tag))
        })
        .map_err(|e| self.fail(CameraError::from_platform("error requesting focus", e)))?;

        if let State::Streaming { focus, .. } = &mut self.state {
            *focus = Some(FocusLock {
                tag,
                regions: regions.to_vec(),
            });
        }
        debug!(?tag, regions = regions.len(), "Focus triggered");
        Ok(true)
    }

    /// Cancels any focus trigger and restarts the plain repeating request.
    pub fn clear_focus_regions(&mut self) -> Result<(), CameraError> {
        let cancel = match &mut self.state {
            State::Streaming { attempt, focus, .. } => {
                *focus = None;
                CaptureRequest::preview(
                    attempt.surfaces.iter().map(|s| s.id()).collect(),
                    self.requested_flash_mode,
                    None,
                    &attempt.characteristics,
                )
                .with_af_trigger(AfTrigger::Cancel)
            }
            _ => return Ok(()),
        };

        self.with_session(|session| {
            session.stop_repeating()?;
            session.capture(&cancel, None)
        })
        .map_err(|e| self.fail(CameraError::from_platform("error clearing focus", e)))?;

        debug!("Focus regions cleared");
        self.restart_repeating(None)
    }

    /// Picks the first camera facing the requested way, else the first camera.
    pub fn select_camera(&self) -> Result<Option<CameraId>, CameraError> {
        let ids = self
            .manager
            .camera_ids()
            .map_err(|e| CameraError::from_platform("error listing cameras", e))?;

        for id in &ids {
            match self.manager.characteristics(id) {
                Ok(c) if c.lens_facing == Some(self.requested_facing) => {
                    return Ok(Some(id.clone()))
                }
                Ok(_) => {}
                Err(e) => warn!(camera = %id, error = %e, "Skipping camera"),
            }
        }
        Ok(ids.into_iter().next())
    }

    /// Output size for a detector needing `min_width` pixels.
    ///
    /// Uses the open camera if there is one, otherwise the camera
    /// [`select_camera`](Self::select_camera) would open.
    pub fn output_size(&self, min_width: u32) -> Result<Option<Size>, CameraError> {
        if let Some(characteristics) = self.open_characteristics() {
            return Ok(choose_output_size(&characteristics.output_sizes, min_width));
        }
        let Some(id) = self.select_camera()? else {
            return Ok(None);
        };
        let characteristics = self
            .manager
            .characteristics(&id)
            .map_err(|e| CameraError::from_platform("error reading camera characteristics", e))?;
        Ok(choose_output_size(&characteristics.output_sizes, min_width))
    }

    /// Facing of the open camera.
    pub fn camera_facing(&self) -> Option<LensFacing> {
        self.open_characteristics().and_then(|c| c.lens_facing)
    }

    /// Sensor orientation of the open camera.
    pub fn sensor_orientation(&self) -> Option<u32> {
        self.open_characteristics().map(|c| c.sensor_orientation)
    }

    /// Active pixel array of the open camera.
    pub fn active_array_size(&self) -> Option<Rect> {
        self.open_characteristics().and_then(|c| c.active_array_size)
    }

    fn open_characteristics(&self) -> Option<&CameraCharacteristics> {
        match &self.state {
            State::Configuring { attempt, .. } | State::Streaming { attempt, .. } => {
                Some(&attempt.characteristics)
            }
            _ => None,
        }
    }

    fn current_token(&self) -> Option<SessionToken> {
        match &self.state {
            State::Idle => None,
            State::Opening(attempt)
            | State::Configuring { attempt, .. }
            | State::Streaming { attempt, .. } => Some(attempt.token),
        }
    }

    fn base_request(&self, attempt: &Attempt, regions: Option<&[MeteringRectangle]>) -> CaptureRequest {
        CaptureRequest::preview(
            attempt.surfaces.iter().map(|s| s.id()).collect(),
            self.requested_flash_mode,
            regions,
            &attempt.characteristics,
        )
    }

    fn repeating_request(
        &self,
        attempt: &Attempt,
        regions: Option<&[MeteringRectangle]>,
    ) -> CaptureRequest {
        self.base_request(attempt, regions)
            .with_best_modes(&attempt.characteristics)
    }

    fn restart_repeating(&mut self, regions: Option<&[MeteringRectangle]>) -> Result<(), CameraError> {
        let request = match &self.state {
            State::Streaming { attempt, .. } => self.repeating_request(attempt, regions),
            _ => return Ok(()),
        };
        self.with_session(|session| session.set_repeating_request(&request))
            .map_err(|e| self.fail(CameraError::from_platform("error creating capture request", e)))?;
        Ok(())
    }

    fn with_session<T>(
        &mut self,
        f: impl FnOnce(&mut dyn CaptureSession) -> Result<T, super::PlatformError>,
    ) -> Result<Option<T>, super::PlatformError> {
        match &mut self.state {
            State::Streaming { session, .. } => f(session.as_mut()).map(Some),
            _ => Ok(None),
        }
    }

    /// Releases everything and logs `err` before handing it back.
    fn fail(&mut self, err: CameraError) -> CameraError {
        self.release();
        error!(error = %err, "Camera failure");
        err
    }
}

/// Closes any resource carried by an event nobody will consume.
fn discard(kind: CameraEventKind) {
    match kind {
        CameraEventKind::DeviceOpened(mut device) => device.close(),
        CameraEventKind::SessionConfigured(mut session) => session.close(),
        _ => {}
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
