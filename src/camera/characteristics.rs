//! Static properties of a camera device and the control modes it supports.

use crate::geometry::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier of a camera device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraId(pub String);

impl CameraId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction a camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    /// Faces the user.
    Front,
    /// Faces away from the user.
    #[default]
    Back,
    /// Externally attached.
    External,
}

/// Flash behaviour requested on every capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    #[default]
    Off,
    /// Fire once per capture.
    Single,
    /// Keep the flash on continuously.
    Torch,
}

/// Auto-focus control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AfMode {
    Off,
    Auto,
    Macro,
    ContinuousVideo,
    ContinuousPicture,
}

/// Auto-exposure control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AeMode {
    Off,
    On,
    OnAutoFlash,
}

/// Auto-white-balance control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AwbMode {
    Off,
    Auto,
    Daylight,
}

/// What the platform reports about one camera.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraCharacteristics {
    /// Facing, when reported.
    pub lens_facing: Option<LensFacing>,
    /// Clockwise angle the sensor is mounted at, in degrees.
    pub sensor_orientation: u32,
    /// Region of the sensor that produces pixels.
    pub active_array_size: Option<Rect>,
    /// Output sizes supported for the processing image format.
    pub output_sizes: Vec<Size>,
    pub af_modes: Vec<AfMode>,
    pub ae_modes: Vec<AeMode>,
    pub awb_modes: Vec<AwbMode>,
    /// Maximum number of AF metering regions (0 = unsupported).
    pub max_regions_af: u32,
    /// Maximum number of AE metering regions (0 = unsupported).
    pub max_regions_ae: u32,
    /// Maximum number of AWB metering regions (0 = unsupported).
    pub max_regions_awb: u32,
}

impl CameraCharacteristics {
    /// Best continuous auto-focus mode: continuous-picture, then auto, then off.
    pub fn best_af_mode(&self) -> AfMode {
        if self.af_modes.contains(&AfMode::ContinuousPicture) {
            AfMode::ContinuousPicture
        } else if self.af_modes.contains(&AfMode::Auto) {
            AfMode::Auto
        } else {
            AfMode::Off
        }
    }

    /// Best auto-exposure mode: on, then off.
    pub fn best_ae_mode(&self) -> AeMode {
        if self.ae_modes.contains(&AeMode::On) {
            AeMode::On
        } else {
            AeMode::Off
        }
    }

    /// Best auto-white-balance mode: auto, then off.
    pub fn best_awb_mode(&self) -> AwbMode {
        if self.awb_modes.contains(&AwbMode::Auto) {
            AwbMode::Auto
        } else {
            AwbMode::Off
        }
    }

    /// Whether tap-to-focus can be honoured.
    pub fn supports_focus_regions(&self) -> bool {
        self.af_modes.contains(&AfMode::Auto) && self.max_regions_af >= 1
    }
}
