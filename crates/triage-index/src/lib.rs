//! Vector index (C3): `insert`/`search`/`delete`/`flush` over embeddings
//! tied to an active `ModelVersion`'s dimension, backed by an exact L2 scan
//! rather than an ANN structure.
//!
//! Grounded on `wg-ragsmith::stores::sqlite::SqliteChunkStore`'s role (a
//! `sqlx`/`rusqlite`-backed embedding store sitting behind a small trait)
//! but intentionally simplified: no `sqlite-vec` native extension, no
//! `rig_sqlite::SqliteVectorIndex`. Exact search over a small corpus is an
//! explicit design choice, not an oversight — see `DESIGN.md`.

pub mod error;
mod sqlite;

pub use error::{IndexError, Result};
pub use sqlite::SqliteVectorIndex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: Uuid,
    pub external_id: String,
    pub metadata: Value,
    pub distance: f32,
}

/// Vector store capability (`spec.md` §4.3). Implementations fix the
/// embedding dimension to whatever the first insert establishes and reject
/// mismatched vectors thereafter — the dimension changes only when a new
/// `ModelVersion` is activated, at which point a fresh index should be
/// built rather than mixed in place.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Idempotent by `doc_id`: re-inserting the same id overwrites the
    /// stored vector and metadata rather than erroring or duplicating.
    async fn insert(
        &self,
        doc_id: Uuid,
        external_id: &str,
        embedding: &[f32],
        metadata: Value,
    ) -> Result<()>;

    /// Exact nearest neighbours by L2 distance, closest first, length
    /// `min(top_k, corpus size)`.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>>;

    async fn delete(&self, doc_id: Uuid) -> Result<()>;

    /// No-op for the sqlx-backed implementation — every write already
    /// commits synchronously. Kept in the trait so a future batched/ANN
    /// backend has somewhere to flush a write buffer without changing the
    /// trait's shape.
    async fn flush(&self) -> Result<()>;
}
