//! Card Resolution
//!
//! Turns a structured OCR query into zero, one or several catalog
//! candidates. Branches are evaluated in a fixed order and the first one that
//! produces an answer wins:
//!
//! 1. catalog readiness gate
//! 2. exact number + set lookup (only short-circuits on a unique hit)
//! 3. name lookup (optionally narrowed by number)
//! 4. number-only lookup
//! 5. insufficient input

pub mod input;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::matching::{normalize_name, similarity};
use crate::storage::catalog::{same_number, CardCatalog, CatalogError, CatalogMatch};

pub use input::ResolveInput;

pub const REASON_NOT_READY: &str = "Local database not ready";
pub const REASON_INSUFFICIENT_INPUT: &str = "Insufficient input for card resolution";

/// Outcome of a resolution attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardResolution {
    /// Exactly one confident candidate
    Single(CatalogMatch),
    /// Several plausible candidates spanning more than one set
    Ambiguous {
        matches: Vec<CatalogMatch>,
        reason: String,
        /// Distinct candidate set IDs, sorted
        suggested_sets: Vec<String>,
    },
    /// No usable candidate
    None { reason: String },
}

impl CardResolution {
    fn none(reason: impl Into<String>) -> Self {
        CardResolution::None {
            reason: reason.into(),
        }
    }

    fn ambiguous(matches: Vec<CatalogMatch>, reason: String) -> Self {
        let suggested_sets = distinct_sets(&matches);
        CardResolution::Ambiguous {
            matches,
            reason,
            suggested_sets,
        }
    }

    /// The resolved card, if exactly one was found
    pub fn card(&self) -> Option<&CatalogMatch> {
        match self {
            CardResolution::Single(card) => Some(card),
            _ => None,
        }
    }

    /// Human-readable reason for ambiguous and empty outcomes
    pub fn reason(&self) -> Option<&str> {
        match self {
            CardResolution::Single(_) => None,
            CardResolution::Ambiguous { reason, .. } | CardResolution::None { reason } => Some(reason),
        }
    }
}

/// Catalog result caps per branch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Cap for the exact number + set lookup
    pub exact_limit: usize,
    /// Cap for name lookups
    pub name_limit: usize,
    /// Cap for number-only lookups
    pub number_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            exact_limit: 10,
            name_limit: 50,
            number_limit: 50,
        }
    }
}

/// Resolves structured card queries against a catalog
pub struct CardResolver {
    catalog: Arc<dyn CardCatalog>,
    config: ResolverConfig,
}

impl CardResolver {
    pub fn new(catalog: Arc<dyn CardCatalog>) -> Self {
        Self::with_config(catalog, ResolverConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn CardCatalog>, config: ResolverConfig) -> Self {
        Self { catalog, config }
    }

    /// Resolve `input` to a catalog entry.
    ///
    /// Only catalog search failures are returned as errors; readiness and
    /// empty results are reported as [`CardResolution::None`].
    pub async fn resolve(&self, input: &ResolveInput) -> Result<CardResolution, CatalogError> {
        if !self.catalog.is_ready().await {
            info!("Catalog not ready, skipping resolution");
            return Ok(CardResolution::none(REASON_NOT_READY));
        }

        let number = input.number();
        let set_code = input.set_code();
        let name = input.name_hint();

        debug!(
            ?name,
            ?number,
            ?set_code,
            language = ?input.language(),
            confidence = ?input.ocr_confidence,
            "Resolving card"
        );

        if let (Some(number), Some(set_code)) = (number, set_code) {
            if let Some(card) = self.exact_lookup(number, set_code).await? {
                return Ok(CardResolution::Single(card));
            }
        }

        if let Some(name) = name {
            let matches = self.catalog.search(Some(name), number, self.config.name_limit).await?;
            return Ok(resolve_by_name(name, number, matches));
        }

        if let Some(number) = number {
            let matches = self.catalog.search(None, Some(number), self.config.number_limit).await?;
            return Ok(resolve_by_number(number, matches));
        }

        debug!("No usable fields in resolve input");
        Ok(CardResolution::none(REASON_INSUFFICIENT_INPUT))
    }

    /// The single card with `number` in `set_code`, if unique
    async fn exact_lookup(&self, number: &str, set_code: &str) -> Result<Option<CatalogMatch>, CatalogError> {
        let set_code = set_code.to_lowercase();
        let mut in_set: Vec<CatalogMatch> = self
            .catalog
            .search(None, Some(number), self.config.exact_limit)
            .await?
            .into_iter()
            .filter(|m| m.set_id.to_lowercase() == set_code)
            .collect();

        if in_set.len() == 1 {
            debug!(set = %set_code, number, "Exact number + set hit");
            return Ok(in_set.pop());
        }

        debug!(
            set = %set_code,
            number,
            candidates = in_set.len(),
            "Exact lookup inconclusive, falling through"
        );
        Ok(None)
    }
}

fn resolve_by_name(name: &str, number: Option<&str>, mut matches: Vec<CatalogMatch>) -> CardResolution {
    match matches.len() {
        0 => CardResolution::none(format!("No matches found for '{}'", name)),
        1 => CardResolution::Single(matches.remove(0)),
        count => {
            let sets = distinct_sets(&matches);
            if sets.len() > 1 {
                debug!(count, sets = sets.len(), "Name lookup spans several sets");
                CardResolution::Ambiguous {
                    matches,
                    reason: format!("Card found in {} sets", sets.len()),
                    suggested_sets: sets,
                }
            } else {
                debug!(count, "Name lookup confined to one set, picking a variant");
                CardResolution::Single(pick_within_set(matches, name, number))
            }
        }
    }
}

fn resolve_by_number(number: &str, mut matches: Vec<CatalogMatch>) -> CardResolution {
    match matches.len() {
        0 => CardResolution::none(format!("No matches found for card #{}", number)),
        1 => CardResolution::Single(matches.remove(0)),
        _ => CardResolution::ambiguous(matches, format!("Multiple cards with #{}", number)),
    }
}

/// Pick one of several same-set matches.
///
/// Prefers an exact collector number match, then the closest name; ties keep
/// catalog order. Plain catalog order alone would hand back whichever
/// variant was imported first even when the hint names another one exactly
/// (e.g. "Dark Pikachu" listed before "Pikachu ex" for a "Pikachu" hint).
fn pick_within_set(mut matches: Vec<CatalogMatch>, name: &str, number: Option<&str>) -> CatalogMatch {
    if let Some(number) = number {
        if let Some(pos) = matches.iter().position(|m| same_number(&m.number, number)) {
            return matches.swap_remove(pos);
        }
    }

    let target = normalize_name(name);
    let mut best = 0;
    let mut best_score = f64::MIN;
    for (i, candidate) in matches.iter().enumerate() {
        let score = similarity(&normalize_name(&candidate.name), &target);
        if score > best_score {
            best = i;
            best_score = score;
        }
    }

    matches.swap_remove(best)
}

fn distinct_sets(matches: &[CatalogMatch]) -> Vec<String> {
    matches
        .iter()
        .map(|m| m.set_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
