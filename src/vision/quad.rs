//! Card quadrilateral geometry
//!
//! Corners are stored in normalized image coordinates (0..1) with the origin
//! at the top-left corner and y growing downwards.

use serde::{Deserialize, Serialize};

/// A point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four corners bounding a detected card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_left: Point2,
    pub bottom_right: Point2,
}

impl Quadrilateral {
    pub fn new(top_left: Point2, top_right: Point2, bottom_left: Point2, bottom_right: Point2) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    /// Build from pixel-space corners in TL, TR, BR, BL order
    pub fn from_pixels(corners: [(f32, f32); 4], width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let norm = |(x, y): (f32, f32)| Point2::new(x / w, y / h);
        Self {
            top_left: norm(corners[0]),
            top_right: norm(corners[1]),
            bottom_right: norm(corners[2]),
            bottom_left: norm(corners[3]),
        }
    }

    /// Corners scaled to pixel coordinates, in TL, TR, BR, BL order
    pub fn to_pixels(&self, width: u32, height: u32) -> [(f32, f32); 4] {
        let (w, h) = (width as f32, height as f32);
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left].map(|p| (p.x * w, p.y * h))
    }

    /// Mean lengths of the (top, bottom) and (left, right) edge pairs in pixels
    pub fn mean_side_lengths(&self, width: u32, height: u32) -> (f32, f32) {
        let [tl, tr, br, bl] = self.to_pixels(width, height);
        let horizontal = (edge_length(tl, tr) + edge_length(bl, br)) / 2.0;
        let vertical = (edge_length(tl, bl) + edge_length(tr, br)) / 2.0;
        (horizontal, vertical)
    }

    /// Short side over long side, measured in pixel space
    pub fn aspect_ratio(&self, width: u32, height: u32) -> f32 {
        let (horizontal, vertical) = self.mean_side_lengths(width, height);
        let long = horizontal.max(vertical);
        if long <= f32::EPSILON {
            return 0.0;
        }
        horizontal.min(vertical) / long
    }

    /// Enclosed area in pixels (shoelace formula)
    pub fn area(&self, width: u32, height: u32) -> f32 {
        polygon_area(&self.to_pixels(width, height))
    }

    /// Whether the corners, walked TL, TR, BR, BL, turn consistently in one direction
    pub fn is_convex(&self) -> bool {
        let pts = [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
            .map(|p| (p.x, p.y));
        is_convex_polygon(&pts)
    }
}

pub(crate) fn edge_length(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

pub(crate) fn polygon_area(points: &[(f32, f32)]) -> f32 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % n];
        sum += x1 * y2 - x2 * y1;
    }
    (sum / 2.0).abs()
}

pub(crate) fn is_convex_polygon(points: &[(f32, f32)]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0.0f32;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let cross = (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0);
        if cross.abs() <= f32::EPSILON {
            // Collinear corners make a degenerate quad
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
