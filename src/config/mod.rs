//! Application Configuration
//!
//! Matching thresholds, detection bounds and catalog settings stored in TOML
//! format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::matching::MatchingConfig;
use crate::resolver::ResolverConfig;
use crate::vision::{RectangleRequest, RectifyConfig};

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fuzzy name matching
    pub matching: MatchingConfig,
    /// Card quadrilateral detection
    pub detection: DetectionConfig,
    /// Perspective rectification
    pub rectify: RectifyConfig,
    /// Catalog resolution
    pub resolver: ResolverConfig,
    /// Catalog storage
    pub catalog: CatalogConfig,
}

/// Detection-related settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Bounds passed to the rectangle detector
    #[serde(flatten)]
    pub request: RectangleRequest,
    /// Smallest card, as a fraction of the frame area
    pub min_area_fraction: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            request: RectangleRequest::default(),
            min_area_fraction: 0.05,
        }
    }
}

/// Catalog storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Database path; defaults to the application data directory
    pub database_path: Option<PathBuf>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        // Matching defaults
        assert!((config.matching.best_match_threshold - 0.65).abs() < f64::EPSILON);
        assert!((config.matching.find_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.matching.max_results, 5);
        assert!((config.matching.strictness - 0.8).abs() < f64::EPSILON);

        // Detection defaults
        assert!((config.detection.request.min_aspect_ratio - 0.5).abs() < f32::EPSILON);
        assert!((config.detection.request.max_aspect_ratio - 0.8).abs() < f32::EPSILON);
        assert!((config.detection.request.min_confidence - 0.6).abs() < f32::EPSILON);

        // Resolver defaults
        assert_eq!(config.resolver.exact_limit, 10);
        assert_eq!(config.resolver.name_limit, 50);
        assert_eq!(config.resolver.number_limit, 50);

        assert_eq!(config.rectify.max_output_dimension, 1024);
        assert!(config.catalog.database_path.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.matching.strictness = 0.9;
        config.detection.request.min_confidence = 0.75;
        config.catalog.database_path = Some(PathBuf::from("/tmp/cards.db"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [matching]
            best_match_threshold = 0.7

            [detection]
            min_confidence = 0.8
            "#,
        )
        .unwrap();

        assert!((parsed.matching.best_match_threshold - 0.7).abs() < f64::EPSILON);
        assert!((parsed.matching.find_threshold - 0.6).abs() < f64::EPSILON);
        assert!((parsed.detection.request.min_confidence - 0.8).abs() < f32::EPSILON);
        assert!((parsed.detection.request.max_aspect_ratio - 0.8).abs() < f32::EPSILON);
        assert_eq!(parsed.resolver, ResolverConfig::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
