//! Scan Session
//!
//! Runs one frame through the whole pipeline: detect the card, flatten it,
//! read its text, correct the name against known card names, resolve it.

use async_trait::async_trait;
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::matching::{best_match, find_matches, is_probably_same_card, MatchingConfig};
use crate::resolver::{CardResolution, CardResolver, ResolveInput};
use crate::storage::CatalogError;
use crate::vision::{CardQuadrilateralDetector, ImageRectifier, Quadrilateral};

/// Text recognition over a rectified card image
#[async_trait]
pub trait CardTextReader: Send + Sync {
    /// Read the card's fields, or `None` if nothing legible was found
    async fn read(&self, image: &DynamicImage) -> Option<ResolveInput>;
}

/// Reader that returns fields typed in by the user
#[derive(Debug, Clone, Default)]
pub struct ManualTextReader {
    input: ResolveInput,
}

impl ManualTextReader {
    pub fn new(input: ResolveInput) -> Self {
        Self { input }
    }
}

#[async_trait]
impl CardTextReader for ManualTextReader {
    async fn read(&self, _image: &DynamicImage) -> Option<ResolveInput> {
        Some(self.input.clone())
    }
}

/// Result of scanning one frame
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// No card-shaped quadrilateral in the frame
    NoCard,
    /// A card was found but could not be flattened
    RectificationFailed { quad: Quadrilateral },
    /// The flattened card had no legible text
    Unreadable { quad: Quadrilateral },
    /// The card went through resolution
    Resolved {
        quad: Quadrilateral,
        input: ResolveInput,
        /// Known names close to the OCR name, best first
        name_candidates: Vec<String>,
        /// Whether the resolved card's name agrees with the OCR name.
        /// `None` without a single resolved card or a name hint.
        name_confirmed: Option<bool>,
        resolution: CardResolution,
    },
}

/// Wires the pipeline stages together for a scanning session
pub struct ScanSession {
    detector: CardQuadrilateralDetector,
    rectifier: ImageRectifier,
    reader: Arc<dyn CardTextReader>,
    resolver: CardResolver,
    vocabulary: Vec<String>,
    matching: MatchingConfig,
}

impl ScanSession {
    pub fn new(
        detector: CardQuadrilateralDetector,
        rectifier: ImageRectifier,
        reader: Arc<dyn CardTextReader>,
        resolver: CardResolver,
    ) -> Self {
        Self {
            detector,
            rectifier,
            reader,
            resolver,
            vocabulary: Vec::new(),
            matching: MatchingConfig::default(),
        }
    }

    /// Known card names used to correct OCR name hints, and the thresholds
    /// applied when comparing against them
    pub fn with_vocabulary(mut self, names: Vec<String>, matching: MatchingConfig) -> Self {
        self.vocabulary = names;
        self.matching = matching;
        self
    }

    /// Scan a single frame.
    ///
    /// Errors only come from the catalog search; every other failure is a
    /// [`ScanOutcome`] variant.
    pub async fn scan(&self, frame: &DynamicImage) -> Result<ScanOutcome, CatalogError> {
        let (outcome, _) = self.scan_frame(frame).await?;
        Ok(outcome)
    }

    /// Like [`ScanSession::scan`], also handing back the rectified card
    /// image when one was produced
    pub async fn scan_frame(
        &self,
        frame: &DynamicImage,
    ) -> Result<(ScanOutcome, Option<DynamicImage>), CatalogError> {
        let Some(quad) = self.detector.detect(frame).await else {
            debug!("No card in frame");
            return Ok((ScanOutcome::NoCard, None));
        };

        let Some(rectified) = self.rectifier.rectify(frame, &quad) else {
            return Ok((ScanOutcome::RectificationFailed { quad }, None));
        };

        let Some(input) = self.reader.read(&rectified).await else {
            debug!("No legible text on rectified card");
            return Ok((ScanOutcome::Unreadable { quad }, Some(rectified)));
        };

        let name_candidates = self.name_candidates(&input);
        let input = self.correct_name(input);
        let resolution = self.resolver.resolve(&input).await?;
        let name_confirmed = match (input.name_hint(), resolution.card()) {
            (Some(hint), Some(card)) => Some(is_probably_same_card(
                hint,
                &card.name,
                self.matching.strictness,
            )),
            _ => None,
        };

        info!(
            resolved = resolution.card().is_some(),
            ?name_confirmed,
            reason = resolution.reason().unwrap_or(""),
            "Scan complete"
        );

        let outcome = ScanOutcome::Resolved {
            quad,
            input,
            name_candidates,
            name_confirmed,
            resolution,
        };
        Ok((outcome, Some(rectified)))
    }

    /// Known names resembling the raw OCR name hint, best first
    pub fn name_candidates(&self, input: &ResolveInput) -> Vec<String> {
        let Some(hint) = input.name_hint() else {
            return Vec::new();
        };

        find_matches(
            hint,
            &self.vocabulary,
            self.matching.find_threshold,
            self.matching.max_results,
        )
        .into_iter()
        .map(|(name, _)| name.clone())
        .collect()
    }

    /// Replace the name hint with the closest known name, if one is close enough
    pub fn correct_name(&self, mut input: ResolveInput) -> ResolveInput {
        let Some(hint) = input.name_hint() else {
            return input;
        };

        if let Some(known) = best_match(hint, &self.vocabulary, self.matching.best_match_threshold) {
            if known != hint {
                debug!(from = hint, to = %known, "Corrected OCR name");
            }
            input.name_hint = Some(known.clone());
        }
        input
    }
}
