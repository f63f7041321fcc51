//! Capture request values handed to the platform session.

use super::{AeMode, AfMode, AwbMode, CameraCharacteristics, FlashMode, SurfaceId};
use crate::geometry::MeteringRectangle;

/// Auto-focus trigger carried by a single capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AfTrigger {
    #[default]
    Idle,
    /// Start a focus sweep.
    Start,
    /// Abort any sweep in progress.
    Cancel,
}

/// A fully specified capture request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaptureRequest {
    /// Surfaces the request writes into.
    pub targets: Vec<SurfaceId>,
    pub flash_mode: FlashMode,
    pub af_mode: Option<AfMode>,
    pub ae_mode: Option<AeMode>,
    pub awb_mode: Option<AwbMode>,
    pub af_trigger: AfTrigger,
    pub af_regions: Option<Vec<MeteringRectangle>>,
    pub ae_regions: Option<Vec<MeteringRectangle>>,
    pub awb_regions: Option<Vec<MeteringRectangle>>,
}

impl CaptureRequest {
    /// Preview request targeting every surface with the given flash mode.
    ///
    /// Regions are attached only to the routines whose maximum region count
    /// is non-zero on this device.
    pub fn preview(
        targets: Vec<SurfaceId>,
        flash_mode: FlashMode,
        regions: Option<&[MeteringRectangle]>,
        characteristics: &CameraCharacteristics,
    ) -> Self {
        let mut request = Self {
            targets,
            flash_mode,
            ..Default::default()
        };
        if let Some(regions) = regions {
            if characteristics.max_regions_af > 0 {
                request.af_regions = Some(regions.to_vec());
            }
            if characteristics.max_regions_ae > 0 {
                request.ae_regions = Some(regions.to_vec());
            }
            if characteristics.max_regions_awb > 0 {
                request.awb_regions = Some(regions.to_vec());
            }
        }
        request
    }

    /// Sets the best continuous 3A modes for the device.
    pub fn with_best_modes(mut self, characteristics: &CameraCharacteristics) -> Self {
        self.af_mode = Some(characteristics.best_af_mode());
        self.ae_mode = Some(characteristics.best_ae_mode());
        self.awb_mode = Some(characteristics.best_awb_mode());
        self
    }

    pub fn with_af_trigger(mut self, trigger: AfTrigger) -> Self {
        self.af_trigger = trigger;
        self
    }

    pub fn with_af_mode(mut self, mode: AfMode) -> Self {
        self.af_mode = Some(mode);
        self
    }

    /// Whether any metering regions are attached.
    pub fn has_regions(&self) -> bool {
        self.af_regions.is_some() || self.ae_regions.is_some() || self.awb_regions.is_some()
    }
}
