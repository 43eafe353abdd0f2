//! Page-space bounding boxes.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in page points, origin at the top-left corner.
///
/// `x0 <= x1` and `y0 <= y1` always hold; `y` grows downwards so that
/// sorting by `y0` yields top-to-bottom reading order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Region {
    /// Create a region from two corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Convert a PDF user-space rectangle (bottom-left origin) to page space.
    pub fn from_pdf_rect(left: f32, bottom: f32, right: f32, top: f32, page_height: f32) -> Self {
        Self::new(left, page_height - top, right, page_height - bottom)
    }

    /// Map a pixel rectangle of an image into the page region the image covers.
    pub fn from_pixels(
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        image_size: (u32, u32),
        target: &Region,
    ) -> Self {
        let sx = target.width() / image_size.0.max(1) as f32;
        let sy = target.height() / image_size.1.max(1) as f32;
        Self::new(
            target.x0 + left * sx,
            target.y0 + top * sy,
            target.x0 + (left + width) * sx,
            target.y0 + (top + height) * sy,
        )
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Area shared with another region (0 when disjoint).
    pub fn intersection_area(&self, other: &Region) -> f32 {
        let w = self.x1.min(other.x1) - self.x0.max(other.x0);
        let h = self.y1.min(other.y1) - self.y0.max(other.y0);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Shared area relative to the smaller of the two regions.
    ///
    /// Degenerate (zero-area) regions overlap fully when they touch the other box.
    pub fn overlap_ratio(&self, other: &Region) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= f32::EPSILON {
            let touches = self.x0 <= other.x1
                && other.x0 <= self.x1
                && self.y0 <= other.y1
                && other.y0 <= self.y1;
            return if touches { 1.0 } else { 0.0 };
        }
        self.intersection_area(other) / smaller
    }

    /// Smallest region covering both.
    pub fn union(&self, other: &Region) -> Region {
        Region {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}
