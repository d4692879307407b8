//! Exact L2 scan over little-endian `f32` BLOBs.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{IndexError, Result};
use crate::{SearchHit, VectorIndex};

fn encode(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for value in vec {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // See `triage_core::persistence::sqlite::SqlitePersistence::connect`:
        // `:memory:` URLs are private per physical connection, so pin the
        // pool to one to keep every caller on the same embeddings table.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1).connect(database_url).await
        } else {
            SqlitePool::connect(database_url).await
        }
        .map_err(|e| IndexError::DependencyUnavailable {
            message: format!("vector index connect: {e}"),
        })?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                doc_id TEXT PRIMARY KEY NOT NULL,
                external_id TEXT NOT NULL,
                dim INTEGER NOT NULL,
                vector BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(IndexError::from)?;
        Ok(Self { pool })
    }

    async fn fixed_dimension(&self) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT dim FROM embeddings LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(IndexError::from)?;
        Ok(row.map(|row| row.get("dim")))
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    #[instrument(skip(self, embedding, metadata))]
    async fn insert(
        &self,
        doc_id: Uuid,
        external_id: &str,
        embedding: &[f32],
        metadata: Value,
    ) -> Result<()> {
        if embedding.is_empty() {
            return Err(IndexError::InvalidInput {
                message: "embedding must be non-empty".to_string(),
            });
        }
        if let Some(fixed) = self.fixed_dimension().await? {
            if fixed != embedding.len() as i64 {
                return Err(IndexError::InvalidInput {
                    message: format!(
                        "embedding dimension {} does not match index dimension {fixed}",
                        embedding.len()
                    ),
                });
            }
        }
        sqlx::query(
            r#"
            INSERT INTO embeddings (doc_id, external_id, dim, vector, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(doc_id) DO UPDATE SET
                external_id = excluded.external_id,
                dim = excluded.dim,
                vector = excluded.vector,
                metadata = excluded.metadata
            "#,
        )
        .bind(doc_id)
        .bind(external_id)
        .bind(embedding.len() as i64)
        .bind(encode(embedding))
        .bind(serde_json::to_string(&metadata).unwrap_or_default())
        .execute(&self.pool)
        .await
        .map_err(IndexError::from)?;
        Ok(())
    }

    #[instrument(skip(self, query))]
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query("SELECT doc_id, external_id, vector, metadata FROM embeddings")
            .fetch_all(&self.pool)
            .await
            .map_err(IndexError::from)?;

        let mut scored: Vec<SearchHit> = rows
            .iter()
            .map(|row| {
                let vector_raw: Vec<u8> = row.get("vector");
                let vector = decode(&vector_raw);
                let metadata_raw: String = row.get("metadata");
                SearchHit {
                    doc_id: row.get("doc_id"),
                    external_id: row.get("external_id"),
                    metadata: serde_json::from_str(&metadata_raw).unwrap_or(Value::Null),
                    distance: squared_l2(query, &vector),
                }
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, doc_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM embeddings WHERE doc_id = ?1")
            .bind(doc_id)
            .execute(&self.pool)
            .await
            .map_err(IndexError::from)?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn index() -> SqliteVectorIndex {
        SqliteVectorIndex::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn search_returns_closest_first() {
        let index = index().await;
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();
        index.insert(near, "near", &[1.0, 0.0, 0.0], json!({})).await.unwrap();
        index.insert(far, "far", &[10.0, 10.0, 10.0], json!({})).await.unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, near);
        assert_eq!(hits[1].doc_id, far);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn insert_is_idempotent_by_doc_id() {
        let index = index().await;
        let doc_id = Uuid::new_v4();
        index.insert(doc_id, "v1", &[1.0, 0.0], json!({"v": 1})).await.unwrap();
        index.insert(doc_id, "v2", &[2.0, 0.0], json!({"v": 2})).await.unwrap();

        let hits = index.search(&[2.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].external_id, "v2");
    }

    #[tokio::test]
    async fn mismatched_dimension_is_rejected() {
        let index = index().await;
        index.insert(Uuid::new_v4(), "a", &[1.0, 0.0], json!({})).await.unwrap();
        let result = index.insert(Uuid::new_v4(), "b", &[1.0, 0.0, 0.0], json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn delete_removes_from_future_searches() {
        let index = index().await;
        let doc_id = Uuid::new_v4();
        index.insert(doc_id, "a", &[1.0, 0.0], json!({})).await.unwrap();
        index.delete(doc_id).await.unwrap();
        let hits = index.search(&[1.0, 0.0], 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
