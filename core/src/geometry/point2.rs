//! 2-D Points

use crate::pbrt::*;

/// A 2-D sample coordinate or surface UV.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point2f {
    /// X-coordinate.
    pub x: Float,

    /// Y-coordinate.
    pub y: Float,
}

impl Point2f {
    /// Creates a new 2-D point.
    ///
    /// * `x` - X-coordinate.
    /// * `y` - Y-coordinate.
    pub const fn new(x: Float, y: Float) -> Self {
        Self { x, y }
    }

    /// Creates a new 2-D zero point.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<Point2f> for [Float; 2] {
    fn from(p: Point2f) -> Self {
        [p.x, p.y]
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
