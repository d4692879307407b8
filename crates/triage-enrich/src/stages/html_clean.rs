use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;

/// Step 1: strip `<script>`/`<style>` and collapse whitespace, falling
/// back to the crawler-provided `text` when no readable `html_path` is
/// set. File I/O failures are non-fatal (`spec.md` §4.4 "File-missing for
/// HTML/screenshot is non-fatal: skip that source").
pub struct HtmlCleanStage;

impl HtmlCleanStage {
    pub fn new() -> Self {
        Self
    }
}

fn clean_html(html_content: &str) -> String {
    let mut document = Html::parse_document(html_content);
    let skip = Selector::parse("script, style").expect("static selector");
    let skipped_ids: Vec<_> = document.select(&skip).map(|el| el.id()).collect();
    for id in skipped_ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let text: String = document.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl Stage for HtmlCleanStage {
    fn id(&self) -> &str {
        "html_clean"
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        let extracted = match &ctx.html_path {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(html) => clean_html(&html),
                Err(_) => ctx.text.clone().unwrap_or_default(),
            },
            None => ctx.text.clone().unwrap_or_default(),
        };
        ctx.clean_text = extracted;
        Ok(())
    }
}
