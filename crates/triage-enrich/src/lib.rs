//! Enrichment stage (C4, `spec.md` §4.4): normalizes HTML/image content,
//! detects language, extracts fraud-signal patterns, and produces a
//! heuristic score. [`pipeline`] builds steps 1-8 as a [`PipelineExecutor`];
//! [`consumer::EnrichmentConsumer`] drives the `crawl.items` queue and owns
//! steps 9-11 (persist, forward, ack).

pub mod consumer;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod signals;
pub mod stages;

pub use consumer::EnrichmentConsumer;
pub use context::{EnrichmentContext, ScamSignal};
pub use error::{EnrichError, Result};
pub use pipeline::{PipelineExecutor, PipelineReport, Stage};

use std::sync::Arc;

use stages::{
    HeuristicScoreStage, HtmlCleanStage, ImageHashStage, ImageHasher, LanguageDetectStage,
    NullImageHasher, NullOcrEngine, OcrEngine, OcrStage, PatternExtractionStage, TcpWhoisClient,
    TransliterationDetectStage, WhoisClient, WhoisStage,
};

pub use stages::detect_language;

/// Assembles the eleven-step algorithm's steps 1-8 in the fixed order
/// `spec.md` §4.4 specifies. Callers needing a custom OCR/WHOIS/image-hash
/// backend should build a [`PipelineExecutor`] from the individual stages
/// directly instead of going through this constructor.
pub fn default_pipeline() -> PipelineExecutor {
    build_pipeline(
        Arc::new(NullOcrEngine),
        Arc::new(TcpWhoisClient::new()),
        Arc::new(NullImageHasher),
    )
}

pub fn build_pipeline(
    ocr: Arc<dyn OcrEngine>,
    whois: Arc<dyn WhoisClient>,
    image_hasher: Arc<dyn ImageHasher>,
) -> PipelineExecutor {
    PipelineExecutor::new(vec![
        Box::new(HtmlCleanStage::new()),
        Box::new(LanguageDetectStage::new()),
        Box::new(TransliterationDetectStage::new()),
        Box::new(OcrStage::new(ocr)),
        Box::new(PatternExtractionStage::new()),
        Box::new(WhoisStage::new(whois)),
        Box::new(ImageHashStage::new(image_hasher)),
        Box::new(HeuristicScoreStage::new()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::domain::Language;

    #[tokio::test]
    async fn hindi_scam_text_produces_high_score_and_correct_language() {
        let mut ctx = EnrichmentContext::new(
            "http://scam.example".into(),
            "scam.example".into(),
            None,
            None,
            Some("तत्काल ₹1000 UPI abc@upi पर भेजें और ₹50,000 का लॉटरी पुरस्कार जीतें!".into()),
        );
        let pipeline = default_pipeline();
        let report = pipeline.run(&mut ctx).await.unwrap();
        assert!(report.degraded_stages.is_empty());
        assert_eq!(ctx.language, Language::Hi);
        assert!(!ctx.upi_handles.is_empty());
        assert!(ctx.heuristic_score > 0.0);
    }

    #[tokio::test]
    async fn benign_english_text_scores_low() {
        let mut ctx = EnrichmentContext::new(
            "http://news.example".into(),
            "news.example".into(),
            None,
            None,
            Some("the weather today is sunny and mild across the region".into()),
        );
        let pipeline = default_pipeline();
        pipeline.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.language, Language::En);
        assert_eq!(ctx.heuristic_score, 0.0);
    }

    #[tokio::test]
    async fn missing_html_path_falls_back_to_provided_text() {
        let mut ctx = EnrichmentContext::new(
            "http://x.example".into(),
            "x.example".into(),
            Some("/nonexistent/path.html".into()),
            None,
            Some("fallback text here".into()),
        );
        let pipeline = default_pipeline();
        pipeline.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.clean_text, "fallback text here");
    }
}
