use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;
use crate::signals::{keywords_for, URGENCY_WEIGHT, URGENCY_WORDS};

const UPI_WEIGHT: f64 = 3.0;
const PHONE_WEIGHT: f64 = 2.0;
const CURRENCY_WEIGHT: f64 = 1.0;
const DOMAIN_AGE_UNDER_30_DAYS_WEIGHT: f64 = 5.0;
const DOMAIN_AGE_UNDER_90_DAYS_WEIGHT: f64 = 2.0;

/// Step 8: weighted sum of fraud signals, scaled by 10 and clamped to
/// `[0, 100]`. Every weight and the final clamp come straight from
/// `original_source/`'s `compute_heuristic_score`.
pub struct HeuristicScoreStage;

impl HeuristicScoreStage {
    pub fn new() -> Self {
        Self
    }
}

fn domain_age_weight(whois_data: &serde_json::Value) -> f64 {
    let Some(creation_date) = whois_data.get("creation_date").and_then(|v| v.as_str()) else {
        return 0.0;
    };
    let Ok(created) = DateTime::parse_from_rfc3339(creation_date) else {
        return 0.0;
    };
    let days_old = (Utc::now() - created.with_timezone(&Utc)).num_days();
    if days_old < 30 {
        DOMAIN_AGE_UNDER_30_DAYS_WEIGHT
    } else if days_old < 90 {
        DOMAIN_AGE_UNDER_90_DAYS_WEIGHT
    } else {
        0.0
    }
}

pub fn score(ctx: &EnrichmentContext) -> f64 {
    let text_lower = ctx.clean_text.to_lowercase();
    let mut sum = 0.0;

    for keyword in keywords_for(ctx.language) {
        if text_lower.contains(&keyword.keyword.to_lowercase()) {
            sum += keyword.weight;
        }
    }

    for word in URGENCY_WORDS {
        if text_lower.contains(word) {
            sum += URGENCY_WEIGHT;
        }
    }

    if !ctx.upi_handles.is_empty() {
        sum += UPI_WEIGHT;
    }
    if !ctx.phone_numbers.is_empty() {
        sum += PHONE_WEIGHT;
    }
    if !ctx.currency_amounts.is_empty() {
        sum += CURRENCY_WEIGHT;
    }

    sum += domain_age_weight(&ctx.whois_data);

    (sum * 10.0).min(100.0)
}

#[async_trait]
impl Stage for HeuristicScoreStage {
    fn id(&self) -> &str {
        "heuristic_score"
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        ctx.heuristic_score = score(ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use triage_core::domain::Language;

    fn ctx_with_text(text: &str) -> EnrichmentContext {
        let mut ctx = EnrichmentContext::new("http://x".into(), "x.com".into(), None, None, None);
        ctx.clean_text = text.to_string();
        ctx
    }

    #[test]
    fn urgent_upi_and_phone_push_score_high() {
        let mut ctx = ctx_with_text("urgent! act now and win lottery, send to abc@upi, call 9876543210, pay ₹500");
        ctx.language = Language::En;
        ctx.upi_handles = vec!["abc@upi".into()];
        ctx.phone_numbers = vec!["9876543210".into()];
        ctx.currency_amounts = vec!["₹500".into()];
        let s = score(&ctx);
        assert!(s > 50.0, "expected a high score, got {s}");
    }

    #[test]
    fn benign_text_scores_zero() {
        let ctx = ctx_with_text("this is a normal news article about weather");
        assert_eq!(score(&ctx), 0.0);
    }

    #[test]
    fn fresh_domain_adds_weight() {
        let mut ctx = ctx_with_text("nothing suspicious here");
        ctx.whois_data = json!({ "creation_date": Utc::now().to_rfc3339() });
        assert_eq!(score(&ctx), DOMAIN_AGE_UNDER_30_DAYS_WEIGHT * 10.0);
    }

    #[test]
    fn score_is_clamped_to_one_hundred() {
        let mut ctx = ctx_with_text(
            "urgent limited time act now guaranteed free money lottery winner immediate hurry expires",
        );
        ctx.language = Language::En;
        ctx.upi_handles = vec!["a@b".into()];
        ctx.phone_numbers = vec!["9876543210".into()];
        ctx.currency_amounts = vec!["₹1".into()];
        ctx.whois_data = json!({ "creation_date": Utc::now().to_rfc3339() });
        assert_eq!(score(&ctx), 100.0);
    }
}
