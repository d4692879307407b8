use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;

static UPI_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+@\w+\b").unwrap());
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\+91|91)?[6-9]\d{9}").unwrap());
static RUPEE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[₹]\s*\d+").unwrap());

/// Step 5: regex scan for payment-handle tokens, phone numbers, and
/// currency amounts. Patterns are ported verbatim from the crawler's
/// original worker (`spec.md` §4.4 step 5).
pub struct PatternExtractionStage;

impl PatternExtractionStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for PatternExtractionStage {
    fn id(&self) -> &str {
        "pattern_extraction"
    }

    fn degradable(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        ctx.upi_handles = UPI_PATTERN
            .find_iter(&ctx.clean_text)
            .map(|m| m.as_str().to_string())
            .collect();
        ctx.phone_numbers = PHONE_PATTERN
            .find_iter(&ctx.clean_text)
            .map(|m| m.as_str().to_string())
            .collect();
        ctx.currency_amounts = RUPEE_PATTERN
            .find_iter(&ctx.clean_text)
            .map(|m| m.as_str().to_string())
            .collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_upi_phone_and_rupee_tokens() {
        let mut ctx = EnrichmentContext::new(
            "http://x".into(),
            "x".into(),
            None,
            None,
            Some("send to abc@upi or call 9876543210 for ₹5000 now".into()),
        );
        ctx.clean_text = ctx.text.clone().unwrap();
        PatternExtractionStage::new().run(&mut ctx).await.unwrap();
        assert_eq!(ctx.upi_handles, vec!["abc@upi"]);
        assert_eq!(ctx.phone_numbers, vec!["9876543210"]);
        assert_eq!(ctx.currency_amounts, vec!["₹5000"]);
    }
}
