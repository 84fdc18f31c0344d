//! CardLens - trading card recognition
//!
//! Finds a card in a camera frame, flattens it, and resolves OCR text read
//! off it to an exact catalog entry (set, number, variant).

pub mod config;
pub mod matching;
pub mod resolver;
pub mod scan;
pub mod storage;
pub mod vision;

pub use resolver::{CardResolution, CardResolver, ResolveInput};
pub use scan::{CardTextReader, ManualTextReader, ScanOutcome, ScanSession};
pub use storage::{CardCatalog, CatalogError, CatalogMatch, SqliteCatalog};
pub use vision::{CardQuadrilateralDetector, ImageRectifier, Quadrilateral};
