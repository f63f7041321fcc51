//! Integer points, rectangles and sizes.

use serde::{Deserialize, Serialize};

/// A point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned rectangle given by its edges.
///
/// `right` and `bottom` are exclusive, matching how camera stacks report
/// sensor arrays and detector bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// Creates a rectangle from its four edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Returns the rectangle width.
    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Returns the rectangle height.
    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Horizontal center, rounded towards negative infinity.
    #[inline]
    pub fn center_x(&self) -> i32 {
        (self.left + self.right) >> 1
    }

    /// Vertical center, rounded towards negative infinity.
    #[inline]
    pub fn center_y(&self) -> i32 {
        (self.top + self.bottom) >> 1
    }

    /// Returns the center point.
    pub fn center(&self) -> Point {
        Point::new(self.center_x(), self.center_y())
    }
}

/// Dimensions of an image or camera output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
