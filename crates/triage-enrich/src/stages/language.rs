use async_trait::async_trait;
use triage_core::domain::Language;

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;
use crate::signals::ENGLISH_WORDLIST;

/// Step 2: deterministic script-range heuristic, precedence Tamil >
/// Devanagari (Hindi) > Kannada > English. No trained-model path is wired
/// up — `spec.md` §4.4 allows "try a trained model if configured", but no
/// such model ships with this workspace, so the heuristic is always used.
pub struct LanguageDetectStage;

impl LanguageDetectStage {
    pub fn new() -> Self {
        Self
    }
}

pub fn detect(text: &str) -> (Language, f64) {
    if text.chars().any(|c| ('\u{0B80}'..='\u{0BFF}').contains(&c)) {
        return (Language::Ta, 0.9);
    }
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        return (Language::Hi, 0.9);
    }
    if text.chars().any(|c| ('\u{0C80}'..='\u{0CFF}').contains(&c)) {
        return (Language::Kn, 0.9);
    }

    let text_lower = text.to_lowercase();
    let hits = ENGLISH_WORDLIST
        .iter()
        .filter(|word| text_lower.contains(*word))
        .count();
    let score = hits as f64 / ENGLISH_WORDLIST.len() as f64;
    if score > 0.3 {
        (Language::En, score)
    } else {
        (Language::En, 0.5)
    }
}

#[async_trait]
impl Stage for LanguageDetectStage {
    fn id(&self) -> &str {
        "language_detect"
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        let (language, confidence) = detect(&ctx.clean_text);
        ctx.language = language;
        ctx.lang_confidence = confidence;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tamil_script_wins_over_everything() {
        let (lang, conf) = detect("இது ஒரு சோதனை");
        assert_eq!(lang, Language::Ta);
        assert_eq!(conf, 0.9);
    }

    #[test]
    fn devanagari_detected_as_hindi() {
        let (lang, _) = detect("यह एक परीक्षण है");
        assert_eq!(lang, Language::Hi);
    }

    #[test]
    fn plain_english_falls_back_to_wordlist_score() {
        let (lang, conf) = detect("the quick brown fox and a dog in the park");
        assert_eq!(lang, Language::En);
        assert!(conf > 0.3);
    }

    #[test]
    fn unrecognizable_text_gets_default_english_confidence() {
        let (lang, conf) = detect("xyzzy plugh");
        assert_eq!(lang, Language::En);
        assert_eq!(conf, 0.5);
    }
}
