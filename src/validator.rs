//! Completeness checks on what a translation provider sent back.
//!
//! Nothing here blocks a write: unknown keys are rejected later by the
//! write-back conversion anyway, and a missing key just leaves that element
//! untranslated. The report exists so the logs say what happened.

use crate::model::TextMap;
use crate::translation_key;
use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Problems that will make the write-back fail
    pub errors: Vec<String>,

    /// Suspicious but writable results
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for translated text maps.
pub struct TranslationValidator;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Compare a translated map against the map that was sent.
    ///
    /// - keys the provider invented are errors
    /// - keys it dropped or answered with an empty string are warnings
    /// - rich text whose markup tag count changed is a warning
    pub fn validate(source: &TextMap, translated: &TextMap) -> ValidationReport {
        let mut report = ValidationReport::new();

        for key in translated.keys().filter(|k| !source.contains_key(*k)) {
            report
                .errors
                .push(format!("Unexpected key in translation: '{}'", key));
        }

        for (key, original) in source {
            let Some(text) = translated.get(key) else {
                report.warnings.push(format!("Missing translation for '{}'", key));
                continue;
            };

            if text.trim().is_empty() {
                report.warnings.push(format!("Empty translation for '{}'", key));
                continue;
            }

            if is_rich_text_key(key) {
                let orig_tags = Self::count_tags(original);
                let trans_tags = Self::count_tags(text);
                if orig_tags != trans_tags {
                    report.warnings.push(format!(
                        "Markup tag count mismatch for '{}': original has {}, translation has {}",
                        key, orig_tags, trans_tags
                    ));
                }
            }
        }

        report
    }

    /// Count opening, closing and self-closing markup tags.
    fn count_tags(text: &str) -> usize {
        let regex = TAG_REGEX.get_or_init(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9-]*[^<>]*>").unwrap());
        regex.find_iter(text).count()
    }
}

fn is_rich_text_key(key: &str) -> bool {
    translation_key::decode(key)
        .map(|k| k.element_type == crate::model::ElementType::RichText)
        .unwrap_or(false)
}
