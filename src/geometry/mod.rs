//! Pure geometry for orientation and focus.
//!
//! Everything here is stateless: rotation compensation between the
//! display and the camera sensor, mapping of touch points into sensor
//! space for tap-to-focus, and the small value types both rely on.

mod focus;
mod orientation;
mod point;

pub use focus::{calculate_focus_regions, MeteringRectangle, METERING_WEIGHT_MAX, TOUCH_AREA_MULTIPLIER};
pub use orientation::{rotation_compensation, DisplayRotation};
pub use point::{Point, Rect, Size};
