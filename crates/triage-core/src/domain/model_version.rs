use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::crawled_item::Language;

/// Per-language scam thresholds consumed by C5's routing table.
///
/// Defaults per `spec.md` §4.5: `en = 0.92`, `hi = ta = kn = 0.90`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageThresholds {
    pub hi: f64,
    pub ta: f64,
    pub kn: f64,
    pub en: f64,
}

impl Default for LanguageThresholds {
    fn default() -> Self {
        Self {
            hi: 0.90,
            ta: 0.90,
            kn: 0.90,
            en: 0.92,
        }
    }
}

impl LanguageThresholds {
    pub fn for_language(&self, language: Language) -> f64 {
        match language {
            Language::Hi => self.hi,
            Language::Ta => self.ta,
            Language::Kn => self.kn,
            Language::En => self.en,
        }
    }
}

/// Active configuration for the classifier/LLM/embedding bundle
/// (`spec.md` §3).
///
/// Invariant: at most one row with `is_active = true`; updates form an
/// activation history and never edit a row in place — see
/// [`crate::persistence::ModelVersionRepository::activate`].
#[derive(Debug, Clone)]
pub struct ModelVersion {
    pub id: Uuid,
    pub classifier_version: String,
    pub embedding_model: String,
    pub llm_version: String,
    pub thresholds: LanguageThresholds,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ModelVersion {
    pub fn new(classifier_version: String, embedding_model: String, llm_version: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            classifier_version,
            embedding_model,
            llm_version,
            thresholds: LanguageThresholds::default(),
            is_active: false,
            created_at: Utc::now(),
        }
    }
}
