//! Card name normalization

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Variant suffixes printed after a card's base name.
///
/// Checked in order; only the first suffix that matches is removed.
pub const VARIANT_SUFFIXES: &[&str] = &[
    " ex", " gx", " v", " vmax", " vstar", " vunion", " lv.x", " prime", " legend", " star",
    " tera",
];

/// Lowercase, strip diacritics and surrounding whitespace, then drop one variant suffix
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let trimmed = folded.trim();

    for suffix in VARIANT_SUFFIXES {
        if let Some(base) = trimmed.strip_suffix(suffix) {
            return base.trim().to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_and_whitespace() {
        assert_eq!(normalize_name("  Charizard  "), "charizard");
        assert_eq!(normalize_name("MEWTWO"), "mewtwo");
    }

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize_name("Flabébé"), "flabebe");
        assert_eq!(normalize_name("Pokémon Center"), "pokemon center");
    }

    #[test]
    fn test_normalize_strips_variant_suffix() {
        assert_eq!(normalize_name("Charizard EX"), normalize_name("charizard"));
        assert_eq!(normalize_name("Pikachu VMAX"), "pikachu");
        assert_eq!(normalize_name("Arceus VSTAR"), "arceus");
        assert_eq!(normalize_name("Mew & Mewtwo GX"), "mew & mewtwo");
        assert_eq!(normalize_name("Rayquaza LV.X"), "rayquaza");
        assert_eq!(normalize_name("Typhlosion Prime"), "typhlosion");
        assert_eq!(normalize_name("Gengar Star"), "gengar");
        assert_eq!(normalize_name("Zacian V"), "zacian");
    }

    #[test]
    fn test_normalize_strips_at_most_one_suffix() {
        assert_eq!(normalize_name("Pikachu V EX"), "pikachu v");
    }

    #[test]
    fn test_normalize_keeps_suffix_inside_word() {
        // "Vex" ends in "ex" but not in " ex"
        assert_eq!(normalize_name("Vex"), "vex");
        assert_eq!(normalize_name("Eevee"), "eevee");
    }
}
