use async_trait::async_trait;

use crate::context::EnrichmentContext;
use crate::error::EnrichError;
use crate::pipeline::Stage;

/// Perceptual-hash capability, pluggable the same way [`super::whois::WhoisClient`]
/// and [`super::ocr::OcrEngine`] are: no image-decoding crate is part of
/// this workspace's stack, so a production deployment supplies its own
/// implementation (e.g. wrapping the `image`/`img_hash` crates) behind this
/// trait.
#[async_trait]
pub trait ImageHasher: Send + Sync {
    /// Returns the four hashes `spec.md` §4.4 step 7 names, in order:
    /// average, perceptual, difference, wavelet.
    async fn hash_all(&self, screenshot_path: &str) -> crate::error::Result<[String; 4]>;
}

/// No image-hashing backend wired up; returns no hashes. Swap in a real
/// `ImageHasher` to enable duplicate-screenshot detection.
pub struct NullImageHasher;

#[async_trait]
impl ImageHasher for NullImageHasher {
    async fn hash_all(&self, _screenshot_path: &str) -> crate::error::Result<[String; 4]> {
        Ok([String::new(), String::new(), String::new(), String::new()])
    }
}

/// Step 7: four perceptual hashes for dedup, skipped entirely when there
/// is no screenshot.
pub struct ImageHashStage {
    hasher: std::sync::Arc<dyn ImageHasher>,
}

impl ImageHashStage {
    pub fn new(hasher: std::sync::Arc<dyn ImageHasher>) -> Self {
        Self { hasher }
    }

    pub fn with_null_hasher() -> Self {
        Self::new(std::sync::Arc::new(NullImageHasher))
    }
}

#[async_trait]
impl Stage for ImageHashStage {
    fn id(&self) -> &str {
        "image_hash"
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError> {
        let Some(screenshot_path) = ctx.screenshot_path.clone() else {
            return Ok(());
        };
        if tokio::fs::metadata(&screenshot_path).await.is_err() {
            return Ok(());
        }
        let hashes = self.hasher.hash_all(&screenshot_path).await?;
        ctx.image_hashes = hashes
            .into_iter()
            .filter(|h| !h.is_empty())
            .collect();
        Ok(())
    }
}
