use serde_json::Value;
use triage_core::domain::Language;

/// `crawl.items` payload, the input each stage reads from and writes onto
/// (`spec.md` §4.4). One instance flows through the whole pipeline; stages
/// mutate it in place rather than threading a chain of return values, since
/// later steps (scoring) need the accumulated output of nearly every
/// earlier one.
#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    pub url: String,
    pub domain: String,
    pub html_path: Option<String>,
    pub screenshot_path: Option<String>,
    pub text: Option<String>,

    pub clean_text: String,
    pub language: Language,
    pub lang_confidence: f64,
    pub translit: bool,
    pub ocr_text: Option<String>,
    pub upi_handles: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub currency_amounts: Vec<String>,
    pub whois_data: Value,
    pub image_hashes: Vec<String>,
    pub heuristic_score: f64,
}

impl EnrichmentContext {
    pub fn new(
        url: String,
        domain: String,
        html_path: Option<String>,
        screenshot_path: Option<String>,
        text: Option<String>,
    ) -> Self {
        Self {
            url,
            domain,
            html_path,
            screenshot_path,
            text,
            clean_text: String::new(),
            language: Language::En,
            lang_confidence: 0.5,
            translit: false,
            ocr_text: None,
            upi_handles: Vec::new(),
            phone_numbers: Vec::new(),
            currency_amounts: Vec::new(),
            whois_data: Value::Object(Default::default()),
            image_hashes: Vec::new(),
            heuristic_score: 0.0,
        }
    }

    /// Patterns metadata attached to the persisted `CrawledItem` (step 9).
    pub fn pattern_metadata(&self) -> Value {
        serde_json::json!({
            "upi_handles": self.upi_handles,
            "phone_numbers": self.phone_numbers,
            "currency_amounts": self.currency_amounts,
        })
    }
}

/// One fraud-signal keyword or urgency marker, scored per `spec.md` §4.4
/// step 8. Mirrors `wg_bastion::input::patterns`'s `InjectionPattern`
/// idiom (id/category/weight) rather than a bare `&str` list, since the
/// scorer needs the weight alongside the match.
#[derive(Debug, Clone, Copy)]
pub struct ScamSignal {
    pub keyword: &'static str,
    pub language: Language,
    pub weight: f64,
}
