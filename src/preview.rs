//! Preview surface layout.

use crate::geometry::{Rect, Size};
use serde::{Deserialize, Serialize};

/// Output size assumed when the camera has not reported one.
pub const DEFAULT_PREVIEW_SIZE: Size = Size::new(320, 240);

/// How the camera preview is scaled into its layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreviewScaleType {
    /// Whole preview visible, letterboxed.
    #[default]
    CenterInside,
    /// Layout filled, preview cropped.
    CenterCrop,
}

/// Rectangle, relative to the layout, that the preview surface should
/// occupy.
///
/// In portrait the output size is rotated 90°, so its width and height are
/// swapped before fitting. The child is fitted to the layout width first;
/// center-inside shrinks to the layout height if that overflows, center-crop
/// grows to the layout height if that underfills. The result is centred and
/// may extend past the layout for center-crop.
pub fn calculate_preview_rect(
    scale_type: PreviewScaleType,
    output_size: Option<Size>,
    layout: Size,
    portrait: bool,
) -> Rect {
    let size = output_size.unwrap_or(DEFAULT_PREVIEW_SIZE);
    let (width, height) = if portrait {
        (size.height, size.width)
    } else {
        (size.width, size.height)
    };

    let layout_width = layout.width as i32;
    let layout_height = layout.height as i32;

    let mut child_width = layout_width;
    let mut child_height = (layout_width as f32 / width as f32 * height as f32) as i32;

    let fit_height = match scale_type {
        PreviewScaleType::CenterInside => child_height > layout_height,
        PreviewScaleType::CenterCrop => child_height < layout_height,
    };
    if fit_height {
        child_height = layout_height;
        child_width = (layout_height as f32 / height as f32 * width as f32) as i32;
    }

    let horizontal_margin = (layout_width - child_width) / 2;
    let vertical_margin = (layout_height - child_height) / 2;
    Rect::new(
        horizontal_margin,
        vertical_margin,
        layout_width - horizontal_margin,
        layout_height - vertical_margin,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: Option<Size> = Some(Size::new(1280, 720));

    #[test]
    fn test_center_inside_letterboxes() {
        let rect = calculate_preview_rect(
            PreviewScaleType::CenterInside,
            HD,
            Size::new(1000, 1000),
            false,
        );
        assert_eq!(rect, Rect::new(0, 219, 1000, 781));
    }

    #[test]
    fn test_center_inside_fits_height_when_too_tall() {
        let rect = calculate_preview_rect(
            PreviewScaleType::CenterInside,
            HD,
            Size::new(1000, 400),
            true,
        );
        // Portrait: 720x1280 fitted to 400 high is 225 wide.
        assert_eq!(rect, Rect::new(387, 0, 613, 400));
    }

    #[test]
    fn test_center_crop_overflows_width() {
        let rect =
            calculate_preview_rect(PreviewScaleType::CenterCrop, HD, Size::new(1000, 1000), false);
        assert_eq!(rect, Rect::new(-388, 0, 1388, 1000));
    }

    #[test]
    fn test_portrait_swaps_output_size() {
        let rect = calculate_preview_rect(
            PreviewScaleType::CenterInside,
            HD,
            Size::new(1000, 2000),
            true,
        );
        assert_eq!(rect, Rect::new(0, 111, 1000, 1889));
    }

    #[test]
    fn test_unknown_output_size_assumes_default() {
        let rect = calculate_preview_rect(
            PreviewScaleType::CenterInside,
            None,
            Size::new(640, 640),
            false,
        );
        assert_eq!(rect, Rect::new(0, 80, 640, 560));
    }
}
