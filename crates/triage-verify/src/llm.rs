//! `spec.md` §9 item 3 (duck-typed LLM clients → one capability): a single
//! `LlmProvider` trait over the verdict-synthesis and mini-lesson calls,
//! with two concrete `rig-core` adapters. Grounded directly on
//! `weavegraph`'s own LLM demo (`rig::providers::ollama` +
//! `CompletionClient`/`CompletionModel`) for the primary/local path; the
//! secondary/cloud adapter has no in-pack precedent and is modeled by
//! analogy to the same `rig::client::CompletionClient` shape — see
//! `DESIGN.md`.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::providers::{ollama, openai};
use tracing::warn;
use triage_core::domain::Language;

use crate::error::{Result, VerifyError};
use crate::prompts::{lesson_prompt, verdict_prompt};
use crate::tolerant_json;
use crate::verdict::{EvidenceItem, MiniLesson, Quiz, StructuredVerdict, Verdict};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn verdict(&self, claim: &str, language: Language, evidence: &[EvidenceItem]) -> Result<StructuredVerdict>;

    async fn lesson(
        &self,
        claim: &str,
        verdict: Verdict,
        language: Language,
        evidence: &[EvidenceItem],
    ) -> Result<MiniLesson>;

    async fn available(&self) -> bool;
}

fn response_text(choice: impl IntoIterator<Item = impl std::fmt::Debug>) -> String {
    choice.into_iter().map(|c| format!("{c:?}")).collect::<Vec<_>>().join(" ")
}

fn parse_structured_verdict(raw: &str) -> StructuredVerdict {
    let Some(value) = tolerant_json::extract_object(raw) else {
        return StructuredVerdict::fallback();
    };
    let verdict = value
        .get("verdict")
        .and_then(|v| v.as_str())
        .and_then(Verdict::parse)
        .unwrap_or(Verdict::Unverified);
    StructuredVerdict {
        verdict,
        trust_score: value.get("trust_score").and_then(|v| v.as_u64()).unwrap_or(0) as u8,
        confidence: value.get("confidence").and_then(|v| v.as_u64()).unwrap_or(0) as u8,
        reasons: value
            .get("reasons")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|s| s.as_str().map(String::from)).collect())
            .unwrap_or_default(),
        evidence_list: value
            .get("evidence_list")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|s| s.as_str().map(String::from)).collect())
            .unwrap_or_default(),
        one_line_tip: value
            .get("one_line_tip")
            .and_then(|v| v.as_str())
            .unwrap_or("Please verify this information from reliable sources")
            .to_string(),
    }
}

fn parse_mini_lesson(raw: &str) -> MiniLesson {
    let Some(value) = tolerant_json::extract_object(raw) else {
        return MiniLesson::fallback();
    };
    let Some(mini_lesson) = value.get("mini_lesson").and_then(|v| v.as_str()) else {
        return MiniLesson::fallback();
    };
    let tips = value
        .get("tips")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|s| s.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let quiz = value.get("quiz").and_then(|q| {
        Some(Quiz {
            question: q.get("question")?.as_str()?.to_string(),
            options: q
                .get("options")?
                .as_array()?
                .iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect(),
            answer: q.get("answer")?.as_str()?.to_string(),
        })
    });
    match quiz {
        Some(quiz) => MiniLesson {
            mini_lesson: mini_lesson.to_string(),
            tips,
            quiz,
        },
        None => MiniLesson::fallback(),
    }
}

/// Local/primary adapter over `rig::providers::ollama`.
pub struct OllamaLlmProvider {
    client: ollama::Client,
    model: String,
}

impl OllamaLlmProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: ollama::Client::new(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlmProvider {
    async fn verdict(&self, claim: &str, language: Language, evidence: &[EvidenceItem]) -> Result<StructuredVerdict> {
        let completion_model = self.client.completion_model(&self.model);
        let request = completion_model
            .completion_request(rig::completion::Message::user(verdict_prompt(language, claim, evidence)))
            .temperature(0.1)
            .build();
        let response = completion_model
            .completion(request)
            .await
            .map_err(|e| VerifyError::DependencyUnavailable {
                message: format!("ollama verdict call failed: {e}"),
            })?;
        Ok(parse_structured_verdict(&response_text(response.choice)))
    }

    async fn lesson(
        &self,
        claim: &str,
        verdict: Verdict,
        language: Language,
        evidence: &[EvidenceItem],
    ) -> Result<MiniLesson> {
        let completion_model = self.client.completion_model(&self.model);
        let request = completion_model
            .completion_request(rig::completion::Message::user(lesson_prompt(
                language,
                claim,
                verdict.as_wire(),
                evidence,
            )))
            .temperature(0.2)
            .build();
        let response = completion_model
            .completion(request)
            .await
            .map_err(|e| VerifyError::DependencyUnavailable {
                message: format!("ollama lesson call failed: {e}"),
            })?;
        Ok(parse_mini_lesson(&response_text(response.choice)))
    }

    async fn available(&self) -> bool {
        let completion_model = self.client.completion_model(&self.model);
        let request = completion_model
            .completion_request(rig::completion::Message::user("ping"))
            .temperature(0.0)
            .build();
        completion_model.completion(request).await.is_ok()
    }
}

/// Secondary/cloud adapter. No in-pack `rig::providers::openai` precedent
/// exists — this mirrors [`OllamaLlmProvider`]'s shape by analogy, per
/// `rig-core`'s shared `CompletionClient`/`CompletionModel` traits.
pub struct CloudLlmProvider {
    client: openai::Client,
    model: String,
}

impl CloudLlmProvider {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: openai::Client::new(api_key),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for CloudLlmProvider {
    async fn verdict(&self, claim: &str, language: Language, evidence: &[EvidenceItem]) -> Result<StructuredVerdict> {
        let completion_model = self.client.completion_model(&self.model);
        let request = completion_model
            .completion_request(rig::completion::Message::user(verdict_prompt(language, claim, evidence)))
            .temperature(0.1)
            .build();
        let response = completion_model
            .completion(request)
            .await
            .map_err(|e| VerifyError::DependencyUnavailable {
                message: format!("cloud verdict call failed: {e}"),
            })?;
        Ok(parse_structured_verdict(&response_text(response.choice)))
    }

    async fn lesson(
        &self,
        claim: &str,
        verdict: Verdict,
        language: Language,
        evidence: &[EvidenceItem],
    ) -> Result<MiniLesson> {
        let completion_model = self.client.completion_model(&self.model);
        let request = completion_model
            .completion_request(rig::completion::Message::user(lesson_prompt(
                language,
                claim,
                verdict.as_wire(),
                evidence,
            )))
            .temperature(0.2)
            .build();
        let response = completion_model
            .completion(request)
            .await
            .map_err(|e| VerifyError::DependencyUnavailable {
                message: format!("cloud lesson call failed: {e}"),
            })?;
        Ok(parse_mini_lesson(&response_text(response.choice)))
    }

    async fn available(&self) -> bool {
        let completion_model = self.client.completion_model(&self.model);
        let request = completion_model
            .completion_request(rig::completion::Message::user("ping"))
            .temperature(0.0)
            .build();
        match completion_model.completion(request).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "cloud llm provider availability probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_verdict_json() {
        let raw = r#"{"verdict": "MISLEADING", "trust_score": 20, "confidence": 80, "reasons": ["a"], "evidence_list": ["b"], "one_line_tip": "check sources"}"#;
        let parsed = parse_structured_verdict(raw);
        assert_eq!(parsed.verdict, Verdict::Misleading);
        assert_eq!(parsed.trust_score, 20);
        assert_eq!(parsed.confidence, 80);
    }

    #[test]
    fn unparseable_verdict_falls_back() {
        let parsed = parse_structured_verdict("not json");
        assert_eq!(parsed.verdict, Verdict::Unverified);
        assert_eq!(parsed.trust_score, 0);
    }

    #[test]
    fn parses_well_formed_lesson_json() {
        let raw = r#"{"mini_lesson": "lesson text", "tips": ["tip1"], "quiz": {"question": "q", "options": ["A", "B"], "answer": "A"}}"#;
        let parsed = parse_mini_lesson(raw);
        assert_eq!(parsed.mini_lesson, "lesson text");
        assert_eq!(parsed.quiz.answer, "A");
    }

    #[test]
    fn missing_quiz_falls_back_entirely() {
        let raw = r#"{"mini_lesson": "lesson text", "tips": []}"#;
        let parsed = parse_mini_lesson(raw);
        assert_eq!(parsed.mini_lesson, MiniLesson::fallback().mini_lesson);
    }
}
