//! Rectangle detection primitive
//!
//! The detector treats this as a black box returning candidate
//! quadrilaterals with a confidence score. [`ContourRectangleDetector`] is the
//! built-in backend: edge detection followed by contour polygon approximation.

use async_trait::async_trait;
use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::dilate;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::quad::{is_convex_polygon, polygon_area, Quadrilateral};
use super::VisionError;

/// Bounds a rectangle observation must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleRequest {
    /// Minimum short/long side ratio
    pub min_aspect_ratio: f32,
    /// Maximum short/long side ratio
    pub max_aspect_ratio: f32,
    /// Minimum observation confidence (0.0 - 1.0)
    pub min_confidence: f32,
}

impl Default for RectangleRequest {
    fn default() -> Self {
        // Trading cards are 63x88mm, a ratio of ~0.716
        Self {
            min_aspect_ratio: 0.5,
            max_aspect_ratio: 0.8,
            min_confidence: 0.6,
        }
    }
}

impl RectangleRequest {
    /// Whether an observation on a `width` x `height` frame satisfies the bounds
    pub fn accepts(&self, observation: &RectangleObservation, width: u32, height: u32) -> bool {
        let aspect = observation.quad.aspect_ratio(width, height);
        observation.confidence >= self.min_confidence
            && aspect >= self.min_aspect_ratio
            && aspect <= self.max_aspect_ratio
    }
}

/// A rectangle found by a detection backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleObservation {
    pub quad: Quadrilateral,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
}

/// Rectangle detection backend
#[async_trait]
pub trait RectangleDetector: Send + Sync {
    /// Find rectangles satisfying `request`, ideally ranked by confidence
    async fn detect_rectangles(
        &self,
        image: &DynamicImage,
        request: &RectangleRequest,
    ) -> Result<Vec<RectangleObservation>, VisionError>;
}

/// Contour-based rectangle detector built on imageproc
#[derive(Debug, Clone)]
pub struct ContourRectangleDetector {
    /// Smallest accepted quad, as a fraction of the frame area
    pub min_area_fraction: f32,
    /// Gaussian blur sigma applied before edge detection
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds (low, high)
    pub canny_thresholds: (f32, f32),
}

impl Default for ContourRectangleDetector {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.05,
            blur_sigma: 1.5,
            canny_thresholds: (20.0, 60.0),
        }
    }
}

impl ContourRectangleDetector {
    pub fn new(min_area_fraction: f32) -> Self {
        Self {
            min_area_fraction,
            ..Self::default()
        }
    }

    /// Synchronous detection on a grayscale frame
    pub fn find_rectangles(&self, gray: &GrayImage, request: &RectangleRequest) -> Vec<RectangleObservation> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return vec![];
        }

        let blurred = gaussian_blur_f32(gray, self.blur_sigma);
        let edges = canny(&blurred, self.canny_thresholds.0, self.canny_thresholds.1);
        // Close small gaps so card borders form a single contour
        let closed = dilate(&edges, Norm::LInf, 1);

        let contours = find_contours::<i32>(&closed);
        let min_area = self.min_area_fraction * width as f32 * height as f32;

        let mut observations: Vec<RectangleObservation> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 4)
            .filter_map(|c| quad_from_contour(&c.points, min_area, width, height))
            .filter(|obs| request.accepts(obs, width, height))
            .collect();

        observations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        debug!(
            contours = contours.len(),
            rectangles = observations.len(),
            "Contour rectangle detection complete"
        );

        observations
    }
}

#[async_trait]
impl RectangleDetector for ContourRectangleDetector {
    async fn detect_rectangles(
        &self,
        image: &DynamicImage,
        request: &RectangleRequest,
    ) -> Result<Vec<RectangleObservation>, VisionError> {
        let gray = image.to_luma8();
        let detector = self.clone();
        let request = *request;

        tokio::task::spawn_blocking(move || detector.find_rectangles(&gray, &request))
            .await
            .map_err(|e| VisionError::Task(e.to_string()))
    }
}

/// Approximate a contour by a polygon and keep it if it is a large convex 4-gon
fn quad_from_contour(
    points: &[Point<i32>],
    min_area: f32,
    width: u32,
    height: u32,
) -> Option<RectangleObservation> {
    let perimeter = arc_length(points, true);
    let mut approx = approximate_polygon_dp(points, perimeter * 0.02, true);
    approx.dedup();
    if approx.len() > 1 && approx.first() == approx.last() {
        approx.pop();
    }
    if approx.len() != 4 {
        return None;
    }

    let pts: Vec<(f32, f32)> = approx.iter().map(|p| (p.x as f32, p.y as f32)).collect();
    if !is_convex_polygon(&pts) {
        return None;
    }

    let area = polygon_area(&pts);
    if area < min_area {
        return None;
    }

    let quad = Quadrilateral::from_pixels(order_corners(&pts), width, height);
    let (horizontal, vertical) = quad.mean_side_lengths(width, height);
    let confidence = if horizontal * vertical > 0.0 {
        (area / (horizontal * vertical)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(RectangleObservation { quad, confidence })
}

/// Order four points as TL, TR, BR, BL
fn order_corners(pts: &[(f32, f32)]) -> [(f32, f32); 4] {
    let top_left = extreme(pts, |p| p.0 + p.1, false);
    let bottom_right = extreme(pts, |p| p.0 + p.1, true);
    let top_right = extreme(pts, |p| p.1 - p.0, false);
    let bottom_left = extreme(pts, |p| p.1 - p.0, true);

    [top_left, top_right, bottom_right, bottom_left]
}

fn extreme(pts: &[(f32, f32)], key: impl Fn(&(f32, f32)) -> f32, max: bool) -> (f32, f32) {
    let cmp = |a: &(f32, f32), b: &(f32, f32)| key(a).total_cmp(&key(b));
    let found = if max {
        pts.iter().copied().max_by(cmp)
    } else {
        pts.iter().copied().min_by(cmp)
    };
    found.unwrap_or_default()
}
