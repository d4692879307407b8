use serde_json::Value;
use uuid::Uuid;

/// Maps a document id to its vector-store identifier (`spec.md` §3).
///
/// Invariant: at most one `VectorRecord` per `doc_id` in the active index —
/// enforced by [`crate::persistence::VectorRepository::upsert_vector`],
/// which performs `INSERT ... ON CONFLICT(doc_id) DO UPDATE`.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: Uuid,
    pub doc_id: Uuid,
    pub embedding_id: String,
    pub external_id: String,
    pub metadata: Value,
}
