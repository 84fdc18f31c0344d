//! Card list import and export (JSON)

use std::path::Path;
use tracing::debug;

use super::catalog::{CatalogError, CatalogMatch};

/// Load a JSON array of cards from file
pub fn load_cards(path: &Path) -> Result<Vec<CatalogMatch>, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    let cards: Vec<CatalogMatch> = serde_json::from_str(&content)?;
    debug!("Loaded {} cards from {:?}", cards.len(), path);
    Ok(cards)
}

/// Save cards to a JSON file
pub fn save_cards(cards: &[CatalogMatch], path: &Path) -> Result<(), CatalogError> {
    let content = serde_json::to_string_pretty(cards)?;
    std::fs::write(path, content)?;
    Ok(())
}
