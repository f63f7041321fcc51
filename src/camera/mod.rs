//! Camera hardware abstraction and the session state machine.
//!
//! The platform is reached through the [`CameraManager`], [`CameraDevice`]
//! and [`CaptureSession`] traits. Calls into the platform return
//! immediately; their outcomes come back later as [`CameraEvent`]s tagged
//! with the [`SessionToken`] of the attempt that caused them. The
//! [`CameraSession`] uses the token to discard callbacks from attempts that
//! have since been released.

mod characteristics;
mod error;
pub mod mock;
mod output_size;
mod request;
mod session;

pub use characteristics::{
    AeMode, AfMode, AwbMode, CameraCharacteristics, CameraId, FlashMode, LensFacing,
};
pub use error::{CameraError, DeviceErrorCode, PlatformError};
pub use output_size::choose_output_size;
pub use request::{AfTrigger, CaptureRequest};
pub use session::{CameraSession, SessionState};

use std::fmt;
use std::sync::Arc;

/// Identifies one open/configure attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(pub(crate) u64);

/// Identifies one focus trigger capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureTag(pub(crate) u64);

/// Stable identity of an output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// A drawable output target the camera can stream into.
pub trait Surface: Send + Sync {
    /// Stable identity used in capture requests.
    fn id(&self) -> SurfaceId;

    /// Whether the surface can still receive frames.
    fn is_valid(&self) -> bool;
}

/// Shared handle to a surface.
pub type SurfaceRef = Arc<dyn Surface>;

/// Entry point to the platform camera service.
pub trait CameraManager: Send {
    /// Lists the available camera ids in platform order.
    fn camera_ids(&self) -> Result<Vec<CameraId>, PlatformError>;

    /// Reads the characteristics of one camera.
    fn characteristics(&self, id: &CameraId) -> Result<CameraCharacteristics, PlatformError>;

    /// Starts opening a camera.
    ///
    /// The outcome arrives later as `DeviceOpened`, `DeviceError` or
    /// `DeviceDisconnected` carrying `token`.
    fn open_camera(&mut self, id: &CameraId, token: SessionToken) -> Result<(), PlatformError>;
}

/// An open camera device.
pub trait CameraDevice: Send {
    fn id(&self) -> &CameraId;

    /// Starts configuring a capture session over `surfaces`.
    ///
    /// The outcome arrives later as `SessionConfigured` or
    /// `SessionConfigureFailed` carrying `token`.
    fn create_capture_session(
        &mut self,
        surfaces: &[SurfaceRef],
        token: SessionToken,
    ) -> Result<(), PlatformError>;

    /// Closes the device. Must be idempotent.
    fn close(&mut self);
}

/// A configured capture session.
pub trait CaptureSession: Send {
    /// Replaces the repeating request.
    fn set_repeating_request(&mut self, request: &CaptureRequest) -> Result<(), PlatformError>;

    /// Stops the repeating request.
    fn stop_repeating(&mut self) -> Result<(), PlatformError>;

    /// Submits a single capture.
    ///
    /// When `tag` is set, completion is reported as `CaptureCompleted` or
    /// `CaptureFailed` with that tag.
    fn capture(
        &mut self,
        request: &CaptureRequest,
        tag: Option<CaptureTag>,
    ) -> Result<(), PlatformError>;

    /// Closes the session. Must be idempotent.
    fn close(&mut self);
}

/// A platform callback for one session attempt.
#[derive(Debug)]
pub struct CameraEvent {
    /// Attempt the callback belongs to.
    pub token: SessionToken,
    pub kind: CameraEventKind,
}

/// What happened.
pub enum CameraEventKind {
    /// The device finished opening.
    DeviceOpened(Box<dyn CameraDevice>),
    DeviceDisconnected,
    DeviceError(DeviceErrorCode),
    /// The capture session is ready to accept requests.
    SessionConfigured(Box<dyn CaptureSession>),
    SessionConfigureFailed,
    CaptureCompleted(CaptureTag),
    /// A tagged capture failed, with the platform's reason.
    CaptureFailed(CaptureTag, String),
}

impl fmt::Debug for CameraEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraEventKind::DeviceOpened(device) => {
                f.debug_tuple("DeviceOpened").field(device.id()).finish()
            }
            CameraEventKind::DeviceDisconnected => f.write_str("DeviceDisconnected"),
            CameraEventKind::DeviceError(code) => f.debug_tuple("DeviceError").field(code).finish(),
            CameraEventKind::SessionConfigured(_) => f.write_str("SessionConfigured"),
            CameraEventKind::SessionConfigureFailed => f.write_str("SessionConfigureFailed"),
            CameraEventKind::CaptureCompleted(tag) => {
                f.debug_tuple("CaptureCompleted").field(tag).finish()
            }
            CameraEventKind::CaptureFailed(tag, reason) => f
                .debug_tuple("CaptureFailed")
                .field(tag)
                .field(reason)
                .finish(),
        }
    }
}
