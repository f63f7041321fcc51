//! TOML file configuration.
//!
//! ```toml
//! [scanner]
//! camera_facing = "back"
//! flash_mode = "off"
//! formats = ["qr-code", "ean-13"]
//! sort = "central"
//! preview_scale_type = "center-crop"
//! clear_focus_delay_ms = -1
//!
//! [logging]
//! debug = true
//! filter = "scanlens=trace"
//!
//! [metrics]
//! port = 9090
//! ```

use crate::barcode::BarcodeFormat;
use crate::camera::{FlashMode, LensFacing};
use crate::logging::LogConfig;
use crate::preview::PreviewScaleType;
use crate::processor::{BarcodeComparator, CentralBarcodeComparator};
use crate::scanner::{ClearFocusDelay, Options, OptionsError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("invalid scanner options: {0}")]
    Invalid(#[from] OptionsError),
}

/// Named barcode ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortStrategy {
    /// Detector order.
    #[default]
    None,
    /// Closest to the frame center first.
    Central,
}

impl SortStrategy {
    pub fn comparator(self) -> Option<Arc<dyn BarcodeComparator>> {
        match self {
            SortStrategy::None => None,
            SortStrategy::Central => Some(Arc::new(CentralBarcodeComparator)),
        }
    }
}

/// The `[scanner]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub camera_facing: LensFacing,
    pub flash_mode: FlashMode,
    pub formats: Vec<BarcodeFormat>,
    pub min_barcode_width: Option<u32>,
    pub sort: SortStrategy,
    pub preview_scale_type: PreviewScaleType,
    /// Milliseconds; `-1` disables the automatic focus clear.
    pub clear_focus_delay_ms: i64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            camera_facing: LensFacing::Back,
            flash_mode: FlashMode::Off,
            formats: vec![BarcodeFormat::AllFormats],
            min_barcode_width: None,
            sort: SortStrategy::None,
            preview_scale_type: PreviewScaleType::CenterInside,
            clear_focus_delay_ms: ClearFocusDelay::DEFAULT.as_millis(),
        }
    }
}

impl ScannerConfig {
    /// Validates and converts into scanner [`Options`].
    pub fn to_options(&self) -> Result<Options, OptionsError> {
        let mut builder = Options::builder()
            .camera_facing(self.camera_facing)
            .flash_mode(self.flash_mode)
            .barcode_formats(self.formats.clone())
            .barcodes_sort(self.sort.comparator())
            .preview_scale_type(self.preview_scale_type)
            .clear_focus_delay_ms(self.clear_focus_delay_ms);
        if let Some(width) = self.min_barcode_width {
            builder = builder.min_barcode_width(width);
        }
        builder.build()
    }
}

/// The `[metrics]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Exporter port; 0 disables the exporter.
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.scanner.to_options()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.metrics.port, 9090);
        assert!(!config.logging.debug);
    }

    #[test]
    fn test_full_file() {
        let config = FileConfig::from_toml_str(
            r#"
            [scanner]
            camera_facing = "front"
            flash_mode = "torch"
            formats = ["qr-code", "ean-13"]
            min_barcode_width = 250
            sort = "central"
            preview_scale_type = "center-crop"
            clear_focus_delay_ms = -1

            [logging]
            debug = true
            filter = "scanlens=trace"

            [metrics]
            port = 0
            "#,
        )
        .unwrap();

        let options = config.scanner.to_options().unwrap();
        assert_eq!(options.camera_facing, LensFacing::Front);
        assert_eq!(options.flash_mode, FlashMode::Torch);
        assert_eq!(
            options.barcode_formats,
            vec![BarcodeFormat::QrCode, BarcodeFormat::Ean13]
        );
        assert_eq!(options.min_barcode_width, Some(250));
        assert!(options.barcodes_sort.is_some());
        assert_eq!(options.preview_scale_type, PreviewScaleType::CenterCrop);
        assert_eq!(options.clear_focus_delay, ClearFocusDelay::Never);
        assert!(config.logging.debug);
        assert_eq!(config.logging.filter.as_deref(), Some("scanlens=trace"));
        assert_eq!(config.metrics.port, 0);
    }

    #[test]
    fn test_default_delay_round_trips() {
        let options = ScannerConfig::default().to_options().unwrap();
        assert_eq!(
            options.clear_focus_delay,
            ClearFocusDelay::After(Duration::from_millis(5000))
        );
    }

    #[test]
    fn test_invalid_delay_rejected() {
        let result = FileConfig::from_toml_str("[scanner]\nclear_focus_delay_ms = -7\n");
        assert_eq!(
            result,
            Err(ConfigError::Invalid(OptionsError::InvalidClearFocusDelay(-7)))
        );
    }

    #[test]
    fn test_unknown_format_is_parse_error() {
        let result = FileConfig::from_toml_str("[scanner]\nformats = [\"morse\"]\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = FileConfig::from_file("/nonexistent/scanlens.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
