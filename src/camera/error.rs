//! Camera error taxonomy.
//!
//! Platform calls fail with a [`PlatformError`]; device callbacks report a
//! [`DeviceErrorCode`]. Both are folded into [`CameraError`], which is what
//! observers of the scanner receive.

use thiserror::Error;

/// Errors reported to observers when the camera cannot be driven.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera is already in use")]
    InUse,
    #[error("maximum number of open cameras reached")]
    MaxCamerasInUse,
    #[error("camera is disabled by device policy")]
    Disabled,
    #[error("camera device encountered a fatal error")]
    DeviceFatal,
    #[error("camera service encountered a fatal error")]
    ServiceFatal,
    #[error("capture session configuration failed: {0}")]
    SessionConfigFailed(String),
    #[error("camera access error: {0}")]
    Access(String),
    #[error("camera error: {0}")]
    Generic(String),
}

impl CameraError {
    /// Maps a platform failure raised while performing `context`.
    pub fn from_platform(context: &str, err: PlatformError) -> Self {
        match err {
            PlatformError::Access(_) | PlatformError::Security(_) => {
                CameraError::Access(format!("{context}: {err}"))
            }
            PlatformError::IllegalArgument(_) | PlatformError::IllegalState(_) => {
                CameraError::Generic(format!("{context}: {err}"))
            }
        }
    }
}

/// Failures a platform camera call may raise synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("access denied: {0}")]
    Access(String),
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("illegal state: {0}")]
    IllegalState(String),
    #[error("security violation: {0}")]
    Security(String),
}

/// Error codes delivered by a device's error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceErrorCode {
    /// Device already opened by a higher-priority client.
    CameraInUse,
    /// Too many devices open system-wide.
    MaxCamerasInUse,
    /// Disabled by policy.
    CameraDisabled,
    /// Fatal device error; the device must be closed.
    CameraDevice,
    /// Fatal camera service error.
    CameraService,
    /// A code this crate does not know.
    Unknown(i32),
}

impl DeviceErrorCode {
    /// Decodes the numeric codes used by camera HALs (1 through 5).
    pub fn from_raw(code: i32) -> Self {
        match code {
            1 => DeviceErrorCode::CameraInUse,
            2 => DeviceErrorCode::MaxCamerasInUse,
            3 => DeviceErrorCode::CameraDisabled,
            4 => DeviceErrorCode::CameraDevice,
            5 => DeviceErrorCode::CameraService,
            other => DeviceErrorCode::Unknown(other),
        }
    }
}

impl From<DeviceErrorCode> for CameraError {
    fn from(code: DeviceErrorCode) -> Self {
        match code {
            DeviceErrorCode::CameraInUse => CameraError::InUse,
            DeviceErrorCode::MaxCamerasInUse => CameraError::MaxCamerasInUse,
            DeviceErrorCode::CameraDisabled => CameraError::Disabled,
            DeviceErrorCode::CameraDevice => CameraError::DeviceFatal,
            DeviceErrorCode::CameraService => CameraError::ServiceFatal,
            DeviceErrorCode::Unknown(code) => {
                CameraError::Generic(format!("error opening camera (code {code})"))
            }
        }
    }
}
