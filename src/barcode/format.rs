//! Barcode symbologies and their minimum decode widths.

use serde::{Deserialize, Serialize};

/// Characters assumed for linear formats when estimating width.
const NUM_CHARS: u32 = 20;

/// Cells assumed for matrix formats when estimating width.
const NUM_CELLS: u32 = 200;

/// Minimum width used when any format may appear.
pub const ALL_FORMATS_MIN_WIDTH: u32 = 2 * 17 * 34;

/// A barcode symbology the detector can be asked to recognise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BarcodeFormat {
    #[default]
    Unknown,
    /// Every supported format.
    AllFormats,
    Code128,
    Code39,
    Code93,
    Codabar,
    DataMatrix,
    #[serde(rename = "ean-13")]
    Ean13,
    #[serde(rename = "ean-8")]
    Ean8,
    Itf,
    QrCode,
    UpcA,
    UpcE,
    Pdf417,
    Aztec,
}

impl BarcodeFormat {
    /// Smallest image width, in pixels, at which a barcode filling the
    /// frame decodes reliably.
    ///
    /// Linear formats use a pixels-per-module figure over a nominal
    /// character count, matrix formats one pixel per cell.
    pub const fn min_width(self) -> u32 {
        match self {
            BarcodeFormat::Unknown | BarcodeFormat::AllFormats => ALL_FORMATS_MIN_WIDTH,
            BarcodeFormat::Code128 => 11 * NUM_CHARS,
            BarcodeFormat::Code39 => 16 * NUM_CHARS,
            BarcodeFormat::Code93 => 9 * NUM_CHARS,
            BarcodeFormat::Codabar => 11 * NUM_CHARS,
            BarcodeFormat::DataMatrix => NUM_CELLS,
            BarcodeFormat::Ean13 => 2 * 95,
            BarcodeFormat::Ean8 => 2 * 67,
            BarcodeFormat::Itf => 7 * NUM_CHARS,
            BarcodeFormat::QrCode => NUM_CELLS,
            BarcodeFormat::UpcA => 2 * 95,
            BarcodeFormat::UpcE => 2 * 51,
            BarcodeFormat::Pdf417 => 2 * 17 * 34,
            BarcodeFormat::Aztec => NUM_CELLS,
        }
    }

    /// Whether a detector configured with `formats` should report `self`.
    pub fn is_enabled_by(self, formats: &[BarcodeFormat]) -> bool {
        formats
            .iter()
            .any(|&f| f == self || f == BarcodeFormat::AllFormats)
    }
}

/// Kind of payload a barcode carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarcodeValueType {
    #[default]
    Unknown,
    ContactInfo,
    Email,
    Isbn,
    Phone,
    Product,
    Sms,
    Text,
    Url,
    Wifi,
    Geo,
    CalendarEvent,
    DriverLicense,
}
