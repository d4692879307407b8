use async_trait::async_trait;
use triage_core::domain::Language;

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;

/// OCR backend capability. The wire-up (`pytesseract` in `original_source/`)
/// is not part of this workspace's dependency stack, so this is modeled as
/// a pluggable trait the same way `original_source/`'s `whois`/`imagehash`
/// calls are modeled as pluggable capabilities here — see
/// [`crate::stages::whois::WhoisClient`] and
/// [`crate::stages::image_hash::ImageHasher`].
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, screenshot_path: &str, language: Language) -> crate::error::Result<String>;
}

/// Always returns empty text. Installed by default so a deployment without
/// an OCR backend degrades gracefully rather than failing the stage.
pub struct NullOcrEngine;

#[async_trait]
impl OcrEngine for NullOcrEngine {
    async fn extract_text(&self, _screenshot_path: &str, _language: Language) -> crate::error::Result<String> {
        Ok(String::new())
    }
}

/// Step 4: OCR the screenshot with the detected language; if
/// transliteration was flagged, also OCR with English and keep whichever
/// result is longer. Concatenates OCR text onto `clean_text`.
pub struct OcrStage {
    engine: std::sync::Arc<dyn OcrEngine>,
}

impl OcrStage {
    pub fn new(engine: std::sync::Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }

    pub fn with_null_engine() -> Self {
        Self::new(std::sync::Arc::new(NullOcrEngine))
    }
}

#[async_trait]
impl Stage for OcrStage {
    fn id(&self) -> &str {
        "ocr"
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        let Some(screenshot_path) = ctx.screenshot_path.clone() else {
            return Ok(());
        };
        if tokio::fs::metadata(&screenshot_path).await.is_err() {
            return Ok(());
        }

        let mut ocr_text = self.engine.extract_text(&screenshot_path, ctx.language).await?;
        if ctx.translit && ctx.language == Language::En {
            let english_pass = self.engine.extract_text(&screenshot_path, Language::En).await?;
            if english_pass.len() > ocr_text.len() {
                ocr_text = english_pass;
            }
        }

        ctx.clean_text = format!("{} {}", ctx.clean_text, ocr_text).trim().to_string();
        ctx.ocr_text = Some(ocr_text);
        Ok(())
    }
}
