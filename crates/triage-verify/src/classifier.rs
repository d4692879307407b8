//! C5's numeric scoring capability (`spec.md` §4.5): "LLM-backed numeric
//! scorer in the reference, any real classifier in production." Kept
//! separate from [`crate::llm::LlmProvider`] since it answers a bare
//! number, not the structured verdict/lesson JSON the check pipeline asks
//! for — a different prompt shape, a different failure mode.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::providers::ollama;
use triage_core::domain::Language;

use crate::error::{Result, VerifyError};
use crate::prompts::classifier_prompt;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns a score in `[0, 1]`. Callers treat an `Err` as "yields 0.5"
    /// per `spec.md` §4.5 rather than this trait baking in the fallback
    /// itself, so routing code can log the failure before defaulting.
    async fn classify(&self, text: &str, language: Language) -> Result<f64>;
}

/// Calls the local Ollama model with a bare-number scoring prompt and
/// parses the first whitespace-delimited token as a float, clamped to
/// `[0, 1]`. Grounded on the original ingest worker's `classify_text`.
pub struct OllamaClassifier {
    client: ollama::Client,
    model: String,
}

impl OllamaClassifier {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: ollama::Client::new(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Classifier for OllamaClassifier {
    async fn classify(&self, text: &str, language: Language) -> Result<f64> {
        let completion_model = self.client.completion_model(&self.model);
        let request = completion_model
            .completion_request(rig::completion::Message::user(classifier_prompt(text, language)))
            .temperature(0.1)
            .build();

        let response = completion_model
            .completion(request)
            .await
            .map_err(|e| VerifyError::DependencyUnavailable {
                message: format!("classifier call failed: {e}"),
            })?;

        let raw = response
            .choice
            .into_iter()
            .next()
            .map(|choice| format!("{choice:?}"))
            .unwrap_or_default();

        let score = first_float(&raw).ok_or_else(|| VerifyError::IntegrityError {
            message: format!("classifier response had no parseable score: {raw}"),
        })?;

        Ok(score.clamp(0.0, 1.0))
    }
}

/// Scans for the first contiguous run of digits/`.` in `s` that parses as
/// a float. Robust to the surrounding `Debug` formatting of whatever
/// completion-content type the provider returns, which is not guaranteed
/// to be bare text.
fn first_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if let Ok(value) = s[start..i].parse::<f64>() {
                return Some(value);
            }
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod first_float_tests {
    use super::first_float;

    #[test]
    fn finds_score_inside_debug_wrapper() {
        assert_eq!(first_float(r#"Text(Text { text: "0.8" })"#), Some(0.8));
    }

    #[test]
    fn finds_bare_score() {
        assert_eq!(first_float("0.0"), Some(0.0));
    }

    #[test]
    fn none_when_no_digits() {
        assert_eq!(first_float("no numbers here"), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClassifier(f64);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _text: &str, _language: Language) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn fixed_classifier_returns_configured_score() {
        let c = FixedClassifier(0.87);
        assert_eq!(c.classify("anything", Language::En).await.unwrap(), 0.87);
    }
}
