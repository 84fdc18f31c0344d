//! Perspective rectification
//!
//! Flattens a detected card quadrilateral into a fronto-parallel rectangle.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::quad::{edge_length, Quadrilateral};

/// Rectification settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    /// Longest side of the rectified output in pixels
    pub max_output_dimension: u32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            max_output_dimension: 1024,
        }
    }
}

/// Perspective warp primitive.
///
/// `corners` are pixel coordinates in TL, TR, BR, BL order.
pub trait PerspectiveWarp: Send + Sync {
    fn warp(&self, image: &DynamicImage, corners: [(f32, f32); 4]) -> Option<DynamicImage>;
}

/// Homography warp backed by imageproc
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectiveWarp {
    pub config: RectifyConfig,
}

impl ProjectiveWarp {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    /// Output size from the longest horizontal and vertical edges, capped
    fn output_size(&self, corners: &[(f32, f32); 4]) -> (u32, u32) {
        let [tl, tr, br, bl] = *corners;
        let width = edge_length(tl, tr).max(edge_length(bl, br));
        let height = edge_length(tl, bl).max(edge_length(tr, br));

        let longest = width.max(height);
        let cap = self.config.max_output_dimension as f32;
        let scale = if longest > cap { cap / longest } else { 1.0 };

        ((width * scale).round() as u32, (height * scale).round() as u32)
    }
}

impl PerspectiveWarp for ProjectiveWarp {
    fn warp(&self, image: &DynamicImage, corners: [(f32, f32); 4]) -> Option<DynamicImage> {
        let (out_w, out_h) = self.output_size(&corners);
        if out_w == 0 || out_h == 0 {
            return None;
        }

        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];

        // Maps the card corners onto the output rectangle
        let projection = Projection::from_control_points(corners, dest)?;

        let rgba = image.to_rgba8();
        let mut output = RgbaImage::new(out_w, out_h);
        warp_into(&rgba, &projection, Interpolation::Bilinear, Rgba([0, 0, 0, 0]), &mut output);

        Some(DynamicImage::ImageRgba8(output))
    }
}

/// Rectifies card quadrilaterals
pub struct ImageRectifier {
    warp: Box<dyn PerspectiveWarp>,
}

impl Default for ImageRectifier {
    fn default() -> Self {
        Self::new(Box::new(ProjectiveWarp::default()))
    }
}

impl ImageRectifier {
    pub fn new(warp: Box<dyn PerspectiveWarp>) -> Self {
        Self { warp }
    }

    pub fn with_config(config: RectifyConfig) -> Self {
        Self::new(Box::new(ProjectiveWarp::new(config)))
    }

    /// Flatten the region bounded by `quad`.
    ///
    /// `None` when the image is empty, the quad is degenerate, or the warp
    /// produces no pixels.
    pub fn rectify(&self, image: &DynamicImage, quad: &Quadrilateral) -> Option<DynamicImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            debug!("Cannot rectify an empty image");
            return None;
        }

        if !quad.is_convex() {
            warn!("Refusing to rectify a non-convex quadrilateral");
            return None;
        }

        let corners = quad.to_pixels(width, height);
        let rectified = self.warp.warp(image, corners)?;

        if rectified.width() == 0 || rectified.height() == 0 {
            debug!("Perspective warp produced an empty image");
            return None;
        }

        debug!(
            width = rectified.width(),
            height = rectified.height(),
            "Card rectified"
        );
        Some(rectified)
    }

    /// Decode an encoded image and rectify it
    pub fn rectify_encoded(&self, bytes: &[u8], quad: &Quadrilateral) -> Option<DynamicImage> {
        let image = image::load_from_memory(bytes).ok()?;
        self.rectify(&image, quad)
    }
}
