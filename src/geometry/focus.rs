//! Tap-to-focus region mapping.
//!
//! Touch coordinates arrive in view space. The camera wants metering
//! rectangles in the coordinate space of the sensor's active pixel array,
//! which is rotated (and, for front cameras, mirrored) relative to the view.

use super::Rect;
use serde::{Deserialize, Serialize};

/// Highest weight a metering rectangle may carry.
pub const METERING_WEIGHT_MAX: u32 = 1000;

/// Size of a focus region as a fraction of the active array.
pub const TOUCH_AREA_MULTIPLIER: f64 = 0.05;

/// A weighted region in sensor coordinates used for AF/AE/AWB metering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeteringRectangle {
    /// Horizontal position of the touched point, relative to the active array.
    pub x: i32,
    /// Vertical position of the touched point, relative to the active array.
    pub y: i32,
    /// Region width.
    pub width: i32,
    /// Region height.
    pub height: i32,
    /// Metering weight, `0..=METERING_WEIGHT_MAX`.
    pub weight: u32,
}

/// Maps a touch on the preview into focus regions for the sensor.
///
/// `compensation` is the value returned by
/// [`rotation_compensation`](super::rotation_compensation). Returns `None`
/// when the active array size is unknown or the view is empty.
pub fn calculate_focus_regions(
    view_width: u32,
    view_height: u32,
    touch_x: f32,
    touch_y: f32,
    compensation: u32,
    front_facing: bool,
    active_array: Option<Rect>,
) -> Option<Vec<MeteringRectangle>> {
    let active = active_array?;
    if view_width == 0 || view_height == 0 {
        return None;
    }

    let (mut out_x, mut out_y, out_w, out_h) = if compensation == 90 || compensation == 270 {
        (
            f64::from(touch_y),
            f64::from(touch_x),
            f64::from(view_height),
            f64::from(view_width),
        )
    } else {
        (
            f64::from(touch_x),
            f64::from(touch_y),
            f64::from(view_width),
            f64::from(view_height),
        )
    };

    match compensation {
        90 => out_y = out_h - out_y,
        180 => {
            out_x = out_w - out_x;
            out_y = out_h - out_y;
        }
        270 => out_x = out_w - out_x,
        _ => {}
    }

    if front_facing {
        out_x = out_w - out_x;
    }

    let active_w = f64::from(active.width());
    let active_h = f64::from(active.height());

    // Scale before dividing so exact inputs stay exact.
    let region = MeteringRectangle {
        x: (out_x * active_w / out_w) as i32,
        y: (out_y * active_h / out_h) as i32,
        width: (active_w * TOUCH_AREA_MULTIPLIER) as i32,
        height: (active_h * TOUCH_AREA_MULTIPLIER) as i32,
        weight: METERING_WEIGHT_MAX,
    };

    Some(vec![region])
}
