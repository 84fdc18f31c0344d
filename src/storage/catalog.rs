//! Card catalog contract
//!
//! The resolver only ever talks to the catalog through [`CardCatalog`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A catalog entry returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMatch {
    /// Catalog identifier (e.g. "base1-4")
    pub id: String,
    /// Printed card name
    pub name: String,
    /// Set identifier (e.g. "base1")
    pub set_id: String,
    /// Collector number within the set
    pub number: String,
    /// Print variant (holo, reverse holo, first edition...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl CatalogMatch {
    pub fn new(id: &str, name: &str, set_id: &str, number: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            set_id: set_id.to_string(),
            number: number.to_string(),
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }
}

/// Errors raised by catalog backends
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Searchable card catalog
#[async_trait]
pub trait CardCatalog: Send + Sync {
    /// Whether the catalog can serve queries
    async fn is_ready(&self) -> bool;

    /// Search by name and/or collector number, returning at most `limit` matches
    async fn search(
        &self,
        name: Option<&str>,
        number: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CatalogMatch>, CatalogError>;
}

/// Collector numbers compare equal when they differ only by leading zeros
pub fn same_number(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.trim().trim_start_matches('0').to_lowercase();
    strip(a) == strip(b)
}
