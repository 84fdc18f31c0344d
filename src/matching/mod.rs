//! Fuzzy Text Matching
//!
//! Edit-distance and similarity primitives used to compare noisy OCR text
//! against known card names.

pub mod normalize;

use serde::{Deserialize, Serialize};

pub use normalize::{normalize_name, VARIANT_SUFFIXES};

/// Default minimum similarity for [`best_match`]
pub const DEFAULT_BEST_MATCH_THRESHOLD: f64 = 0.65;
/// Default minimum similarity for [`find_matches`]
pub const DEFAULT_FIND_THRESHOLD: f64 = 0.6;
/// Default result cap for [`find_matches`]
pub const DEFAULT_MAX_RESULTS: usize = 5;
/// Default strictness for [`is_probably_same_card`]
pub const DEFAULT_STRICTNESS: f64 = 0.8;

/// Tunable matching thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum similarity for picking a single best candidate
    pub best_match_threshold: f64,
    /// Minimum similarity for listing candidates
    pub find_threshold: f64,
    /// Maximum number of listed candidates
    pub max_results: usize,
    /// Minimum similarity for two names to denote the same card
    pub strictness: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            best_match_threshold: DEFAULT_BEST_MATCH_THRESHOLD,
            find_threshold: DEFAULT_FIND_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
            strictness: DEFAULT_STRICTNESS,
        }
    }
}

/// Levenshtein edit distance between two strings, counted in chars.
///
/// Fills the full `(len(a) + 1) x (len(b) + 1)` matrix.
pub fn distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let len_a = a_chars.len();
    let len_b = b_chars.len();

    let mut matrix = vec![vec![0usize; len_b + 1]; len_a + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=len_b {
        matrix[0][j] = j;
    }

    for i in 1..=len_a {
        for j in 1..=len_b {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[len_a][len_b]
}

/// Similarity in `[0, 1]`: `1 - distance / max(len(a), len(b))`.
///
/// Two empty strings are identical (`1.0`).
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    1.0 - distance(a, b) as f64 / max_len as f64
}

/// Score every candidate against the lowercased query
fn score_candidates<'a, S: AsRef<str>>(query: &str, candidates: &'a [S]) -> Vec<(&'a S, f64)> {
    let query = query.to_lowercase();
    candidates
        .iter()
        .map(|candidate| {
            let score = similarity(&query, &candidate.as_ref().to_lowercase());
            (candidate, score)
        })
        .collect()
}

/// Highest-scoring candidate with `similarity >= threshold`.
///
/// Ties go to the candidate that appears first.
pub fn best_match<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    threshold: f64,
) -> Option<&'a S> {
    let mut best: Option<(&'a S, f64)> = None;

    for (candidate, score) in score_candidates(query, candidates) {
        if score < threshold {
            continue;
        }
        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((candidate, score)),
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// All candidates with `similarity >= threshold`, best first, capped at `max_results`
pub fn find_matches<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    threshold: f64,
    max_results: usize,
) -> Vec<(&'a S, f64)> {
    let mut scored: Vec<(&'a S, f64)> = score_candidates(query, candidates)
        .into_iter()
        .filter(|(_, score)| *score >= threshold)
        .collect();

    // Vec::sort_by is stable: equal scores keep caller order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(max_results);
    scored
}

/// Whether two card names most likely denote the same card
pub fn is_probably_same_card(a: &str, b: &str, strictness: f64) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);

    if a == b {
        return true;
    }

    similarity(&a, &b) >= strictness
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_basics() {
        assert_eq!(distance("", ""), 0);
        assert_eq!(distance("abc", ""), 3);
        assert_eq!(distance("", "abc"), 3);
        assert_eq!(distance("kitten", "sitting"), 3);
        assert_eq!(distance("flaw", "lawn"), 2);
    }

    #[test]
    fn test_distance_identity_and_symmetry() {
        let words = ["", "a", "Charizard", "charzard", "Mewtwo EX", "Flabébé", "ポケモン"];
        for a in words {
            assert_eq!(distance(a, a), 0);
            assert!((similarity(a, a) - 1.0).abs() < f64::EPSILON);
            for b in words {
                assert_eq!(distance(a, b), distance(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_distance_matches_strsim() {
        let pairs = [
            ("charzard", "charizard"),
            ("blastoise", "blastiose"),
            ("pikachu v", "pikachu vmax"),
            ("Flabébé", "Flabebe"),
            ("", "gengar"),
        ];
        for (a, b) in pairs {
            assert_eq!(distance(a, b), strsim::levenshtein(a, b), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_distance_counts_chars_not_bytes() {
        assert_eq!(distance("é", "e"), 1);
        assert!((similarity("é", "e") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_range() {
        let words = ["", "x", "xyz", "Charizard", "Blastoise", "Mr. Mime"];
        for a in words {
            for b in words {
                let s = similarity(a, b);
                assert!((0.0..=1.0).contains(&s), "{a:?} vs {b:?} = {s}");
            }
        }
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("hello", "hallo") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_best_match_corrects_ocr_typo() {
        let candidates = ["Charizard", "Blastoise"];
        let result = best_match("charzard", &candidates, DEFAULT_BEST_MATCH_THRESHOLD);
        assert_eq!(result, Some(&"Charizard"));
    }

    #[test]
    fn test_best_match_below_threshold() {
        let candidates = ["Charizard"];
        assert!(best_match("xyz", &candidates, DEFAULT_BEST_MATCH_THRESHOLD).is_none());
    }

    #[test]
    fn test_best_match_tie_keeps_first() {
        let candidates = vec!["Mewtwo".to_string(), "Mewx".to_string(), "Mewy".to_string()];
        // "mewz" is one edit away from both "mewx" and "mewy"
        let result = best_match("mewz", &candidates, 0.6);
        assert_eq!(result.map(String::as_str), Some("Mewx"));
    }

    #[test]
    fn test_best_match_empty_candidates() {
        let candidates: [&str; 0] = [];
        assert!(best_match("pikachu", &candidates, 0.0).is_none());
    }

    #[test]
    fn test_find_matches_sorted_and_truncated() {
        let candidates = [
            "Pikachu",
            "Pikachu V",
            "Raichu",
            "Pichu",
            "Pikachu VMAX",
            "Pikachu EX",
            "Pikachu GX",
        ];
        let results = find_matches("pikachu", &candidates, DEFAULT_FIND_THRESHOLD, 3);

        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].0, "Pikachu");
        assert!((results[0].1 - 1.0).abs() < f64::EPSILON);
        assert_eq!(*results[1].0, "Pikachu V");
        assert_eq!(*results[2].0, "Pichu");
        assert!(results.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_find_matches_equal_scores_keep_order() {
        let candidates = ["Pikachu GX", "Pikachu EX"];
        let results = find_matches("pikachu", &candidates, DEFAULT_FIND_THRESHOLD, DEFAULT_MAX_RESULTS);
        let names: Vec<&str> = results.iter().map(|(name, _)| **name).collect();
        assert_eq!(names, vec!["Pikachu GX", "Pikachu EX"]);
    }

    #[test]
    fn test_find_matches_filters_by_threshold() {
        let candidates = ["Gengar", "Haunter", "Gastly"];
        let results = find_matches("gengar", &candidates, DEFAULT_FIND_THRESHOLD, DEFAULT_MAX_RESULTS);
        assert_eq!(results.len(), 1);
        assert_eq!(*results[0].0, "Gengar");
    }

    #[test]
    fn test_is_probably_same_card() {
        assert!(is_probably_same_card("Charizard EX", "charizard", DEFAULT_STRICTNESS));
        assert!(is_probably_same_card("Flabébé", "flabebe", DEFAULT_STRICTNESS));
        assert!(is_probably_same_card("Charizard", "Charizrd", DEFAULT_STRICTNESS));
        assert!(!is_probably_same_card("Charizard", "Blastoise", DEFAULT_STRICTNESS));
    }

    #[test]
    fn test_default_matching_config() {
        let config = MatchingConfig::default();
        assert!((config.best_match_threshold - 0.65).abs() < f64::EPSILON);
        assert!((config.find_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.max_results, 5);
        assert!((config.strictness - 0.8).abs() < f64::EPSILON);
    }
}
