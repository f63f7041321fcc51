//! Scanner options and their builder.

use crate::barcode::BarcodeFormat;
use crate::camera::{FlashMode, LensFacing};
use crate::preview::PreviewScaleType;
use crate::processor::BarcodeComparator;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Invalid option values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("invalid clear focus delay {0} ms: must be -1 (never) or non-negative")]
    InvalidClearFocusDelay(i64),
}

/// How long after a focus request the focus regions are cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearFocusDelay {
    /// Focus regions stay until the next request or restart.
    Never,
    After(Duration),
}

impl ClearFocusDelay {
    /// Millisecond value meaning [`ClearFocusDelay::Never`].
    pub const NEVER_MILLIS: i64 = -1;

    pub const DEFAULT: ClearFocusDelay = ClearFocusDelay::After(Duration::from_millis(5000));

    /// Parses a millisecond delay where `-1` means never.
    pub fn from_millis(millis: i64) -> Result<Self, OptionsError> {
        match millis {
            Self::NEVER_MILLIS => Ok(ClearFocusDelay::Never),
            m if m < 0 => Err(OptionsError::InvalidClearFocusDelay(m)),
            m => Ok(ClearFocusDelay::After(Duration::from_millis(m as u64))),
        }
    }

    pub fn as_millis(self) -> i64 {
        match self {
            ClearFocusDelay::Never => Self::NEVER_MILLIS,
            ClearFocusDelay::After(delay) => i64::try_from(delay.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

impl Default for ClearFocusDelay {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// An immutable snapshot of scanner settings.
///
/// Apply with [`ScannerControl::set_options`](super::ScannerControl::set_options).
#[derive(Clone)]
pub struct Options {
    pub camera_facing: LensFacing,
    pub flash_mode: FlashMode,
    /// Never empty.
    pub barcode_formats: Vec<BarcodeFormat>,
    /// Minimum barcode width in pixels; `None` derives it from the formats.
    pub min_barcode_width: Option<u32>,
    pub barcodes_sort: Option<Arc<dyn BarcodeComparator>>,
    pub preview_scale_type: PreviewScaleType,
    pub clear_focus_delay: ClearFocusDelay,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            camera_facing: LensFacing::Back,
            flash_mode: FlashMode::Off,
            barcode_formats: vec![BarcodeFormat::AllFormats],
            min_barcode_width: None,
            barcodes_sort: None,
            preview_scale_type: PreviewScaleType::CenterInside,
            clear_focus_delay: ClearFocusDelay::DEFAULT,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("camera_facing", &self.camera_facing)
            .field("flash_mode", &self.flash_mode)
            .field("barcode_formats", &self.barcode_formats)
            .field("min_barcode_width", &self.min_barcode_width)
            .field("barcodes_sort", &self.barcodes_sort.as_ref().map(|_| "<comparator>"))
            .field("preview_scale_type", &self.preview_scale_type)
            .field("clear_focus_delay", &self.clear_focus_delay)
            .finish()
    }
}

/// Builder for [`Options`].
#[derive(Clone)]
pub struct OptionsBuilder {
    options: Options,
    clear_focus_delay_ms: i64,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self {
            options: Options::default(),
            clear_focus_delay_ms: ClearFocusDelay::DEFAULT.as_millis(),
        }
    }
}

impl OptionsBuilder {
    pub fn camera_facing(mut self, facing: LensFacing) -> Self {
        self.options.camera_facing = facing;
        self
    }

    pub fn flash_mode(mut self, flash_mode: FlashMode) -> Self {
        self.options.flash_mode = flash_mode;
        self
    }

    /// Formats to detect; an empty list means all formats.
    pub fn barcode_formats(mut self, formats: Vec<BarcodeFormat>) -> Self {
        self.options.barcode_formats = if formats.is_empty() {
            vec![BarcodeFormat::AllFormats]
        } else {
            formats
        };
        self
    }

    pub fn min_barcode_width(mut self, width: u32) -> Self {
        self.options.min_barcode_width = Some(width);
        self
    }

    pub fn barcodes_sort(mut self, sort: Option<Arc<dyn BarcodeComparator>>) -> Self {
        self.options.barcodes_sort = sort;
        self
    }

    pub fn preview_scale_type(mut self, scale_type: PreviewScaleType) -> Self {
        self.options.preview_scale_type = scale_type;
        self
    }

    /// Delay in milliseconds, `-1` for never. Validated by [`build`](Self::build).
    pub fn clear_focus_delay_ms(mut self, millis: i64) -> Self {
        self.clear_focus_delay_ms = millis;
        self
    }

    pub fn build(self) -> Result<Options, OptionsError> {
        let clear_focus_delay = ClearFocusDelay::from_millis(self.clear_focus_delay_ms)?;
        Ok(Options {
            clear_focus_delay,
            ..self.options
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::CentralBarcodeComparator;

    #[test]
    fn test_defaults() {
        let options = Options::builder().build().unwrap();
        assert_eq!(options.camera_facing, LensFacing::Back);
        assert_eq!(options.flash_mode, FlashMode::Off);
        assert_eq!(options.barcode_formats, vec![BarcodeFormat::AllFormats]);
        assert_eq!(options.min_barcode_width, None);
        assert!(options.barcodes_sort.is_none());
        assert_eq!(options.preview_scale_type, PreviewScaleType::CenterInside);
        assert_eq!(
            options.clear_focus_delay,
            ClearFocusDelay::After(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_builder_sets_every_field() {
        let sort: Arc<dyn BarcodeComparator> = Arc::new(CentralBarcodeComparator);
        let options = Options::builder()
            .camera_facing(LensFacing::Front)
            .flash_mode(FlashMode::Torch)
            .barcode_formats(vec![BarcodeFormat::Ean13, BarcodeFormat::QrCode])
            .min_barcode_width(300)
            .barcodes_sort(Some(sort.clone()))
            .preview_scale_type(PreviewScaleType::CenterCrop)
            .clear_focus_delay_ms(-1)
            .build()
            .unwrap();

        assert_eq!(options.camera_facing, LensFacing::Front);
        assert_eq!(options.flash_mode, FlashMode::Torch);
        assert_eq!(
            options.barcode_formats,
            vec![BarcodeFormat::Ean13, BarcodeFormat::QrCode]
        );
        assert_eq!(options.min_barcode_width, Some(300));
        assert!(Arc::ptr_eq(options.barcodes_sort.as_ref().unwrap(), &sort));
        assert_eq!(options.preview_scale_type, PreviewScaleType::CenterCrop);
        assert_eq!(options.clear_focus_delay, ClearFocusDelay::Never);
    }

    #[test]
    fn test_empty_formats_become_all() {
        let options = Options::builder().barcode_formats(vec![]).build().unwrap();
        assert_eq!(options.barcode_formats, vec![BarcodeFormat::AllFormats]);
    }

    #[test]
    fn test_clear_focus_delay_parsing() {
        assert_eq!(ClearFocusDelay::from_millis(-1), Ok(ClearFocusDelay::Never));
        assert_eq!(
            ClearFocusDelay::from_millis(0),
            Ok(ClearFocusDelay::After(Duration::ZERO))
        );
        assert_eq!(
            ClearFocusDelay::from_millis(-2),
            Err(OptionsError::InvalidClearFocusDelay(-2))
        );
        assert_eq!(ClearFocusDelay::Never.as_millis(), -1);
        assert_eq!(ClearFocusDelay::DEFAULT.as_millis(), 5000);
    }

    #[test]
    fn test_negative_delay_fails_build() {
        let result = Options::builder().clear_focus_delay_ms(-100).build();
        assert!(matches!(
            result,
            Err(OptionsError::InvalidClearFocusDelay(-100))
        ));
    }
}
