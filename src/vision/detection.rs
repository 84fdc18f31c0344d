//! Card quadrilateral detection
//!
//! Wraps a [`RectangleDetector`] backend and reduces its observations to the
//! single best card-shaped quadrilateral in a still frame.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, warn};

use super::quad::Quadrilateral;
use super::rectangle::{RectangleDetector, RectangleObservation, RectangleRequest};

/// Finds at most one card quadrilateral per frame
pub struct CardQuadrilateralDetector {
    backend: Arc<dyn RectangleDetector>,
    request: RectangleRequest,
}

impl CardQuadrilateralDetector {
    /// Create a detector with the default card bounds
    pub fn new(backend: Arc<dyn RectangleDetector>) -> Self {
        Self::with_request(backend, RectangleRequest::default())
    }

    /// Create a detector with custom bounds
    pub fn with_request(backend: Arc<dyn RectangleDetector>, request: RectangleRequest) -> Self {
        Self { backend, request }
    }

    /// Current detection bounds
    pub fn request(&self) -> &RectangleRequest {
        &self.request
    }

    /// Detect the highest-confidence card quadrilateral.
    ///
    /// One attempt per frame, no retries. Backend failures and empty frames
    /// yield `None`.
    pub async fn detect(&self, image: &DynamicImage) -> Option<Quadrilateral> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            debug!("Skipping detection on empty frame");
            return None;
        }

        let start = Instant::now();
        let observations = match self.backend.detect_rectangles(image, &self.request).await {
            Ok(observations) => observations,
            Err(e) => {
                warn!("Rectangle detection failed: {}", e);
                return None;
            }
        };

        let best = select_best(observations, &self.request, width, height);

        debug!(
            found = best.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Card detection complete"
        );

        best.map(|obs| obs.quad)
    }

    /// Decode an encoded image and detect a card in it
    pub async fn detect_encoded(&self, bytes: &[u8]) -> Option<Quadrilateral> {
        match image::load_from_memory(bytes) {
            Ok(image) => self.detect(&image).await,
            Err(e) => {
                debug!("Undecodable frame: {}", e);
                None
            }
        }
    }
}

/// Re-check the bounds and take the highest-confidence observation.
///
/// Backends are expected to rank by confidence already; the explicit stable
/// sort keeps the first of equally confident observations.
fn select_best(
    mut observations: Vec<RectangleObservation>,
    request: &RectangleRequest,
    width: u32,
    height: u32,
) -> Option<RectangleObservation> {
    observations.retain(|obs| request.accepts(obs, width, height));
    observations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    observations.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::quad::Point2;
    use crate::vision::VisionError;
    use async_trait::async_trait;
    use image::{GrayImage, Luma, RgbaImage};
    use parking_lot::Mutex;

    /// Backend returning canned observations and recording the request it saw
    struct StubBackend {
        observations: Vec<RectangleObservation>,
        fail: bool,
        seen: Mutex<Vec<RectangleRequest>>,
    }

    impl StubBackend {
        fn returning(observations: Vec<RectangleObservation>) -> Self {
            Self {
                observations,
                fail: false,
                seen: Mutex::new(vec![]),
            }
        }

        fn failing() -> Self {
            Self {
                observations: vec![],
                fail: true,
                seen: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl RectangleDetector for StubBackend {
        async fn detect_rectangles(
            &self,
            _image: &DynamicImage,
            request: &RectangleRequest,
        ) -> Result<Vec<RectangleObservation>, VisionError> {
            self.seen.lock().push(*request);
            if self.fail {
                return Err(VisionError::Backend("stub failure".to_string()));
            }
            Ok(self.observations.clone())
        }
    }

    /// Axis-aligned quad spanning x0..x1, y0..y1 (normalized)
    fn quad(x0: f32, y0: f32, x1: f32, y1: f32) -> Quadrilateral {
        Quadrilateral::new(
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x0, y1),
            Point2::new(x1, y1),
        )
    }

    fn frame() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 100, Luma([0u8])))
    }

    #[tokio::test]
    async fn test_detect_returns_first_valid_observation() {
        // 0.4 x 0.6 of a square frame: aspect 0.667
        let card = quad(0.3, 0.2, 0.7, 0.8);
        let backend = Arc::new(StubBackend::returning(vec![RectangleObservation {
            quad: card,
            confidence: 0.95,
        }]));
        let detector = CardQuadrilateralDetector::new(backend.clone());

        assert_eq!(detector.detect(&frame()).await, Some(card));

        let seen = backend.seen.lock();
        assert_eq!(seen.len(), 1, "a single attempt per frame");
        assert_eq!(seen[0], RectangleRequest::default());
    }

    #[tokio::test]
    async fn test_detect_prefers_highest_confidence() {
        let low = quad(0.1, 0.1, 0.5, 0.7);
        let high = quad(0.3, 0.2, 0.7, 0.8);
        // Deliberately unsorted backend output
        let backend = Arc::new(StubBackend::returning(vec![
            RectangleObservation { quad: low, confidence: 0.7 },
            RectangleObservation { quad: high, confidence: 0.9 },
        ]));
        let detector = CardQuadrilateralDetector::new(backend);

        assert_eq!(detector.detect(&frame()).await, Some(high));
    }

    #[tokio::test]
    async fn test_detect_ties_keep_backend_order() {
        let first = quad(0.1, 0.1, 0.5, 0.7);
        let second = quad(0.3, 0.2, 0.7, 0.8);
        let backend = Arc::new(StubBackend::returning(vec![
            RectangleObservation { quad: first, confidence: 0.8 },
            RectangleObservation { quad: second, confidence: 0.8 },
        ]));
        let detector = CardQuadrilateralDetector::new(backend);

        assert_eq!(detector.detect(&frame()).await, Some(first));
    }

    #[tokio::test]
    async fn test_detect_rejects_out_of_bounds_aspect() {
        // Square: aspect 1.0
        let square = quad(0.2, 0.2, 0.8, 0.8);
        // Very elongated: 0.2 x 0.8, aspect 0.25
        let sliver = quad(0.4, 0.1, 0.6, 0.9);
        let backend = Arc::new(StubBackend::returning(vec![
            RectangleObservation { quad: square, confidence: 0.99 },
            RectangleObservation { quad: sliver, confidence: 0.99 },
        ]));
        let detector = CardQuadrilateralDetector::new(backend);

        assert_eq!(detector.detect(&frame()).await, None);
    }

    #[tokio::test]
    async fn test_detect_rejects_low_confidence() {
        let backend = Arc::new(StubBackend::returning(vec![RectangleObservation {
            quad: quad(0.3, 0.2, 0.7, 0.8),
            confidence: 0.55,
        }]));
        let detector = CardQuadrilateralDetector::new(backend);

        assert_eq!(detector.detect(&frame()).await, None);
    }

    #[tokio::test]
    async fn test_detect_no_observations() {
        let detector = CardQuadrilateralDetector::new(Arc::new(StubBackend::returning(vec![])));
        assert_eq!(detector.detect(&frame()).await, None);
    }

    #[tokio::test]
    async fn test_detect_backend_failure_is_none() {
        let detector = CardQuadrilateralDetector::new(Arc::new(StubBackend::failing()));
        assert_eq!(detector.detect(&frame()).await, None);
    }

    #[tokio::test]
    async fn test_detect_empty_frame_skips_backend() {
        let backend = Arc::new(StubBackend::returning(vec![]));
        let detector = CardQuadrilateralDetector::new(backend.clone());
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));

        assert_eq!(detector.detect(&empty).await, None);
        assert!(backend.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_detect_encoded_garbage() {
        let detector = CardQuadrilateralDetector::new(Arc::new(StubBackend::returning(vec![])));
        assert_eq!(detector.detect_encoded(b"not an image").await, None);
    }

    #[tokio::test]
    async fn test_detect_with_custom_request() {
        let request = RectangleRequest {
            min_aspect_ratio: 0.9,
            max_aspect_ratio: 1.0,
            min_confidence: 0.5,
        };
        let square = quad(0.2, 0.2, 0.8, 0.8);
        let backend = Arc::new(StubBackend::returning(vec![RectangleObservation {
            quad: square,
            confidence: 0.7,
        }]));
        let detector = CardQuadrilateralDetector::with_request(backend, request);

        assert_eq!(detector.detect(&frame()).await, Some(square));
    }
}
