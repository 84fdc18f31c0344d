//! Structured resolution query

use serde::{Deserialize, Serialize};

/// Fields read off a card, all optional.
///
/// Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveInput {
    /// Language tag (e.g. "en", "ja")
    pub language: Option<String>,
    /// Set code printed on the card
    pub set_code: Option<String>,
    /// Collector number
    pub number: Option<String>,
    /// Card name as recognized by OCR
    pub name_hint: Option<String>,
    /// OCR confidence (0.0 - 1.0)
    pub ocr_confidence: Option<f32>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ResolveInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_set_code(mut self, set_code: &str) -> Self {
        self.set_code = Some(set_code.to_string());
        self
    }

    pub fn with_number(mut self, number: &str) -> Self {
        self.number = Some(number.to_string());
        self
    }

    pub fn with_name_hint(mut self, name_hint: &str) -> Self {
        self.name_hint = Some(name_hint.to_string());
        self
    }

    pub fn with_ocr_confidence(mut self, confidence: f32) -> Self {
        self.ocr_confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn language(&self) -> Option<&str> {
        present(&self.language)
    }

    pub fn set_code(&self) -> Option<&str> {
        present(&self.set_code)
    }

    pub fn number(&self) -> Option<&str> {
        present(&self.number)
    }

    pub fn name_hint(&self) -> Option<&str> {
        present(&self.name_hint)
    }
}
