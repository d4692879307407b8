//! C6, the synchronous `/api/check` pipeline (`spec.md` §4.6): nine ordered
//! steps from request to response, every fallback path terminating in a
//! valid [`Verdict`] rather than an error returned to the caller. Grounded
//! on the original `check_claim` handler's step order, with the provider
//! choice routed through [`FailoverSelector`] instead of a bidirectional
//! switch.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use triage_core::domain::Language;
use triage_core::TriageRuntime;
use triage_index::VectorIndex;
use uuid::Uuid;

use crate::embedder::Embedder;
use crate::error::{Result, VerifyError};
use crate::failover::FailoverSelector;
use crate::verdict::{EvidenceItem, MiniLesson, Verdict};

const TOP_K: usize = 6;

/// `language` accepts `"auto"` in addition to the four resolved codes —
/// the one place in the workspace a language field isn't already settled,
/// since `CrawledItem` always carries a resolved [`Language`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageOrAuto {
    Auto,
    Lang(Language),
}

impl LanguageOrAuto {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("auto") {
            return Some(LanguageOrAuto::Auto);
        }
        Language::parse(raw).map(LanguageOrAuto::Lang)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub claim_text: String,
    pub language: String,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub include_translation: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub request_id: Uuid,
    pub verdict: String,
    pub trust_score: u8,
    pub confidence: u8,
    pub reasons: Vec<String>,
    pub evidence_list: Vec<String>,
    pub classifier_score: Option<f64>,
    pub retrieved_ids: Vec<String>,
    pub latency_ms: u64,
    pub language_detected: String,
    pub mini_lesson: Option<MiniLesson>,
}

/// Bundles everything step 1-9 needs. One instance per process; `check`
/// takes `&self` and is safe to call concurrently.
pub struct CheckPipeline {
    runtime: Arc<TriageRuntime>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<FailoverSelector>,
}

impl CheckPipeline {
    pub fn new(
        runtime: Arc<TriageRuntime>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<FailoverSelector>,
    ) -> Self {
        Self {
            runtime,
            index,
            embedder,
            llm,
        }
    }

    /// `spec.md` §4.6's nine steps. `claim_text` must be 1-5000 characters
    /// (checked here rather than at the HTTP boundary, so any caller gets
    /// the same validation); every other failure mode downgrades to a
    /// fallback [`Verdict::Unverified`] instead of propagating.
    pub async fn check(&self, request: CheckRequest) -> Result<CheckResponse> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let claim_len = request.claim_text.chars().count();
        if claim_len == 0 || claim_len > 5000 {
            return Err(VerifyError::InvalidInput {
                message: format!("claim_text must be 1-5000 characters, got {claim_len}"),
            });
        }

        let language_or_auto = LanguageOrAuto::parse(&request.language).ok_or_else(|| VerifyError::InvalidInput {
            message: format!("unsupported language code: {}", request.language),
        })?;

        // Step 2: resolve `auto` via the same heuristic C4 uses to label
        // crawled items, so "language" means the same thing everywhere.
        let language = match language_or_auto {
            LanguageOrAuto::Lang(language) => language,
            LanguageOrAuto::Auto => triage_enrich::detect_language(&request.claim_text).0,
        };

        // Step 3.
        let embedding = self.embedder.embed(&request.claim_text).await.unwrap_or_default();

        // Step 4: attach evidence metadata from each hit so the LLM call
        // and the response's `retrieved_ids` see the exact same ordering.
        let hits = if embedding.is_empty() {
            Vec::new()
        } else {
            self.index.search(&embedding, TOP_K).await.unwrap_or_default()
        };
        let evidence: Vec<EvidenceItem> = hits
            .iter()
            .map(|hit| {
                let title = hit
                    .metadata
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Untitled")
                    .to_string();
                let snippet = hit
                    .metadata
                    .get("snippet")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let url = hit
                    .metadata
                    .get("url")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                EvidenceItem {
                    id: hit.external_id.clone(),
                    url,
                    title,
                    snippet,
                    language: hit
                        .metadata
                        .get("language")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                }
            })
            .collect();
        let retrieved_ids: Vec<String> = evidence.iter().map(|e| e.id.clone()).collect();

        // Step 5/6: ask the active provider for a verdict, falling over
        // permanently to the secondary on first failure.
        let provider = self.llm.active();
        let structured = match provider.verdict(&request.claim_text, language, &evidence).await {
            Ok(structured) => structured,
            Err(err) => {
                tracing::warn!(error = %err, provider = self.llm.active_handle().as_str(), "llm verdict call failed");
                if self.llm.mark_primary_failed() {
                    self.runtime
                        .audit
                        .append_best_effort(
                            "provider:switch",
                            json!({ "request_id": request_id, "reason": err.to_string() }),
                        )
                        .await;
                    match self.llm.active().verdict(&request.claim_text, language, &evidence).await {
                        Ok(structured) => structured,
                        Err(_) => crate::verdict::StructuredVerdict::fallback(),
                    }
                } else {
                    crate::verdict::StructuredVerdict::fallback()
                }
            }
        };

        // Step 7: mini-lesson only for FALSE/MISLEADING, deterministic
        // fallback on any failure.
        let mini_lesson = if structured.verdict.warrants_mini_lesson() {
            let provider = self.llm.active();
            match provider
                .lesson(&request.claim_text, structured.verdict, language, &evidence)
                .await
            {
                Ok(lesson) => Some(lesson),
                Err(_) => Some(MiniLesson::fallback()),
            }
        } else {
            None
        };

        let latency_ms = started.elapsed().as_millis() as u64;

        // Step 8.
        self.runtime
            .audit
            .append_best_effort(
                "check",
                json!({
                    "request_id": request_id,
                    "language": language.as_str(),
                    "verdict": structured.verdict.as_wire(),
                    "trust_score": structured.trust_score,
                    "latency_ms": latency_ms,
                    "user_id": request.user_id,
                }),
            )
            .await;

        Ok(CheckResponse {
            request_id,
            verdict: structured.verdict.as_wire().to_string(),
            trust_score: structured.trust_score,
            confidence: structured.confidence,
            reasons: structured.reasons,
            evidence_list: structured.evidence_list,
            classifier_score: None,
            retrieved_ids,
            latency_ms,
            language_detected: language.as_str().to_string(),
            mini_lesson,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_parses_to_the_auto_variant() {
        assert_eq!(LanguageOrAuto::parse("auto"), Some(LanguageOrAuto::Auto));
        assert_eq!(LanguageOrAuto::parse("AUTO"), Some(LanguageOrAuto::Auto));
    }

    #[test]
    fn resolved_language_codes_parse_through() {
        assert_eq!(LanguageOrAuto::parse("hi"), Some(LanguageOrAuto::Lang(Language::Hi)));
        assert_eq!(LanguageOrAuto::parse("en"), Some(LanguageOrAuto::Lang(Language::En)));
    }

    #[test]
    fn unsupported_code_is_rejected() {
        assert_eq!(LanguageOrAuto::parse("fr"), None);
    }
}
