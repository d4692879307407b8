use async_trait::async_trait;
use triage_core::domain::Language;

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;
use crate::signals::HINDI_ROMANIZATION_MARKERS;

/// Step 3: flags romanized Hindi riding under a detected-English label, so
/// OCR (step 4) knows to additionally try an English-language pass.
pub struct TransliterationDetectStage;

impl TransliterationDetectStage {
    pub fn new() -> Self {
        Self
    }
}

pub fn looks_transliterated(text: &str, language: Language) -> bool {
    if language != Language::En {
        return false;
    }
    let text_lower = text.to_lowercase();
    let hits = HINDI_ROMANIZATION_MARKERS
        .iter()
        .filter(|word| text_lower.contains(*word))
        .count();
    hits >= 3
}

#[async_trait]
impl Stage for TransliterationDetectStage {
    fn id(&self) -> &str {
        "transliteration_detect"
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        ctx.translit = looks_transliterated(&ctx.clean_text, ctx.language);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_markers_trip_the_flag() {
        assert!(looks_transliterated("yeh hai ka ki", Language::En));
    }

    #[test]
    fn two_markers_do_not() {
        assert!(!looks_transliterated("hai ka", Language::En));
    }

    #[test]
    fn non_english_is_never_flagged() {
        assert!(!looks_transliterated("hai ka ki ko", Language::Hi));
    }
}
