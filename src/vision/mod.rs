//! Vision Layer
//!
//! Locates a card in a camera frame and flattens it for text recognition:
//! - Rectangle detection backends (contour based, or any external primitive)
//! - Card quadrilateral selection
//! - Perspective rectification

pub mod detection;
pub mod quad;
pub mod rectangle;
pub mod rectify;

use thiserror::Error;

pub use detection::CardQuadrilateralDetector;
pub use quad::{Point2, Quadrilateral};
pub use rectangle::{
    ContourRectangleDetector, RectangleDetector, RectangleObservation, RectangleRequest,
};
pub use rectify::{ImageRectifier, PerspectiveWarp, ProjectiveWarp, RectifyConfig};

/// Errors raised by vision backends
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Detection task failed: {0}")]
    Task(String),

    #[error("Detection backend error: {0}")]
    Backend(String),
}
