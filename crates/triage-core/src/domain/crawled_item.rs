use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One of the four languages the pipeline is calibrated for.
///
/// `auto` (used only on the `/api/check` request path, never persisted) is
/// modeled separately in `triage-verify` since `CrawledItem` always carries
/// a resolved language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hi,
    Ta,
    Kn,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Hi => "hi",
            Language::Ta => "ta",
            Language::Kn => "kn",
            Language::En => "en",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "hi" => Some(Language::Hi),
            "ta" => Some(Language::Ta),
            "kn" => Some(Language::Kn),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing outcome of the classification stage (C5) or a reviewer action (C7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Pending,
    Benign,
    Scam,
    NeedsReview,
}

/// The canonical unit of ingested content (`spec.md` §3).
///
/// Invariant: once `label` is `Benign` or `Scam`, `classifier_score` is
/// `Some`; `label == Scam` implies a [`VectorRecord`](super::VectorRecord)
/// row exists referencing `id`. Both invariants are enforced by the
/// transactions in `triage-verify`, not by this type itself — a plain data
/// struct cannot see across tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledItem {
    pub id: Uuid,
    pub url: String,
    pub domain: String,
    pub raw_html_path: Option<String>,
    pub screenshot_path: Option<String>,
    pub clean_text: String,
    pub language: Language,
    pub lang_confidence: f64,
    pub translit: bool,
    pub heuristic_score: f64,
    pub classifier_score: Option<f64>,
    pub label: Label,
    pub image_hashes: Vec<String>,
    pub whois_data: Value,
    pub metadata: Value,
    pub ingested_at: DateTime<Utc>,
}

/// How much of `clean_text` to carry into a vector's retrieval metadata
/// (`CrawledItem::evidence_metadata`). Long enough for the LLM to ground a
/// verdict on, short enough to keep the index's metadata blob small.
const EVIDENCE_SNIPPET_CHARS: usize = 320;

impl CrawledItem {
    /// Build a freshly enriched item (C4's step 9 persist), not yet scored
    /// by the classifier.
    pub fn new_enriched(
        url: String,
        domain: String,
        raw_html_path: Option<String>,
        screenshot_path: Option<String>,
        clean_text: String,
        language: Language,
        lang_confidence: f64,
        translit: bool,
        heuristic_score: f64,
        image_hashes: Vec<String>,
        whois_data: Value,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            domain,
            raw_html_path,
            screenshot_path,
            clean_text,
            language,
            lang_confidence,
            translit,
            heuristic_score,
            classifier_score: None,
            label: Label::Pending,
            image_hashes,
            whois_data,
            metadata,
            ingested_at: Utc::now(),
        }
    }

    /// Metadata attached to this item's `VectorRecord` when it's indexed
    /// (C5's auto-label path, or C7's approve feedback loop). Carries the
    /// fields the check pipeline (C6) reads back off each retrieved
    /// neighbor to ground an LLM call — `url`/`title`/`snippet`/`language` —
    /// the same way the original `store_vector` attached `text`, `language`,
    /// `label`, and `url` to every stored vector.
    pub fn evidence_metadata(&self) -> Value {
        let snippet: String = self.clean_text.chars().take(EVIDENCE_SNIPPET_CHARS).collect();
        serde_json::json!({
            "url": self.url,
            "title": self.url,
            "snippet": snippet,
            "language": self.language.as_str(),
            "label": self.label,
        })
    }
}
