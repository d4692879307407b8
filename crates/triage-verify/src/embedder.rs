//! Fixed-dimension embedding capability shared by C5 (embed before
//! indexing a scam item) and C6 step 3 (embed the claim before retrieval).
//!
//! Not modeled directly over `rig::embeddings::EmbeddingModel` — that trait
//! is generic rather than object-safe the way the rest of this workspace's
//! capability traits are (`Classifier`, `LlmProvider`), and every call site
//! here only needs "text in, fixed-length `Vec<f32>` out." `OllamaEmbedder`
//! wraps a concrete `rig` embedding model behind that narrower interface.

use async_trait::async_trait;
use rig::client::EmbeddingsClient;
use rig::embeddings::EmbeddingModel as RigEmbeddingModel;
use rig::providers::ollama;

use crate::error::{Result, VerifyError};

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// Wraps `rig::providers::ollama`'s embedding model, matching the
/// `paraphrase-multilingual-mpnet-base-v2`-sized (384-dim) vectors the
/// original sentence-transformers pipeline produced.
pub struct OllamaEmbedder {
    model: ollama::EmbeddingModel,
    dimension: usize,
}

impl OllamaEmbedder {
    pub fn new(model_name: impl AsRef<str>, dimension: usize) -> Self {
        let client = ollama::Client::new();
        Self {
            model: client.embedding_model(model_name.as_ref()),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self
            .model
            .embed_text(text)
            .await
            .map_err(|e| VerifyError::DependencyUnavailable {
                message: format!("embedding call failed: {e}"),
            })?;
        Ok(embedding.vec.into_iter().map(|v| v as f32).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
