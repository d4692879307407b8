//! SQLite-backed [`Broker`]. Durable, transactional, good enough to stand
//! the pipeline up without an external broker process — the same
//! "runnable default" role `SQLiteCheckpointer` plays for checkpointing in
//! the upstream workflow engine this crate is descended from.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::error::{CoreError, Result};

use super::{Broker, Delivery, Queue};

/// `visible_at` makes in-flight (received-but-unacked) rows invisible to
/// other `receive` calls until the consumer acks/nacks or the visibility
/// window elapses, giving crash recovery for free without a separate
/// "in-flight" table.
const VISIBILITY_TIMEOUT_SECS: i64 = 30;

pub struct SqliteBroker {
    pool: SqlitePool,
}

impl SqliteBroker {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // See `SqlitePersistence::connect`: `:memory:` URLs are private per
        // physical connection, so pin the pool to one to keep every caller
        // on the same queue rows instead of each other's empty database.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1).connect(database_url).await
        } else {
            SqlitePool::connect(database_url).await
        }
        .map_err(|e| CoreError::DependencyUnavailable {
            message: format!("broker connect: {e}"),
        })?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                queue TEXT NOT NULL,
                body BLOB NOT NULL,
                status TEXT NOT NULL DEFAULT 'ready',
                attempts INTEGER NOT NULL DEFAULT 0,
                visible_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(CoreError::from)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dead_letters (id INTEGER PRIMARY KEY AUTOINCREMENT, queue TEXT NOT NULL, body BLOB NOT NULL, created_at TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .map_err(CoreError::from)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Broker for SqliteBroker {
    #[instrument(skip(self, payload))]
    async fn publish(&self, queue: Queue, payload: &[u8]) -> Result<()> {
        sqlx::query(
            "INSERT INTO queue_messages (queue, body, status, visible_at, created_at) VALUES (?1, ?2, 'ready', ?3, ?3)",
        )
        .bind(queue.name())
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn receive(&self, queue: Queue, timeout: Duration) -> Result<Option<Delivery>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let now = Utc::now();
            let visible_until = (now + chrono::Duration::seconds(VISIBILITY_TIMEOUT_SECS)).to_rfc3339();
            let mut tx = self.pool.begin().await.map_err(CoreError::from)?;
            let row = sqlx::query(
                r#"
                SELECT id, body FROM queue_messages
                WHERE queue = ?1 AND status = 'ready' AND visible_at <= ?2
                ORDER BY id ASC LIMIT 1
                "#,
            )
            .bind(queue.name())
            .bind(now.to_rfc3339())
            .fetch_optional(&mut *tx)
            .await
            .map_err(CoreError::from)?;

            if let Some(row) = row {
                let id: i64 = row.get("id");
                let body: Vec<u8> = row.get("body");
                sqlx::query(
                    "UPDATE queue_messages SET status = 'in_flight', visible_at = ?2, attempts = attempts + 1 WHERE id = ?1",
                )
                .bind(id)
                .bind(&visible_until)
                .execute(&mut *tx)
                .await
                .map_err(CoreError::from)?;
                tx.commit().await.map_err(CoreError::from)?;
                return Ok(Some(Delivery { id, body }));
            }
            tx.rollback().await.ok();

            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    #[instrument(skip(self))]
    async fn ack(&self, queue: Queue, delivery_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM queue_messages WHERE id = ?1 AND queue = ?2")
            .bind(delivery_id)
            .bind(queue.name())
            .execute(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn nack(&self, queue: Queue, delivery_id: i64, requeue: bool) -> Result<()> {
        if requeue {
            sqlx::query(
                "UPDATE queue_messages SET status = 'ready', visible_at = ?2 WHERE id = ?1 AND queue = ?3",
            )
            .bind(delivery_id)
            .bind(Utc::now().to_rfc3339())
            .bind(queue.name())
            .execute(&self.pool)
            .await
            .map_err(CoreError::from)?;
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;
        let row = sqlx::query("SELECT body FROM queue_messages WHERE id = ?1 AND queue = ?2")
            .bind(delivery_id)
            .bind(queue.name())
            .fetch_optional(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        if let Some(row) = row {
            let body: Vec<u8> = row.get("body");
            sqlx::query(
                "INSERT INTO dead_letters (queue, body, created_at) VALUES (?1, ?2, ?3)",
            )
            .bind(queue.name())
            .bind(&body)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        }
        sqlx::query("DELETE FROM queue_messages WHERE id = ?1 AND queue = ?2")
            .bind(delivery_id)
            .bind(queue.name())
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        tx.commit().await.map_err(CoreError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn broker() -> SqliteBroker {
        SqliteBroker::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn publish_then_receive_then_ack() {
        let broker = broker().await;
        broker
            .publish(Queue::CrawlItems, br#"{"url":"https://example.com"}"#)
            .await
            .unwrap();
        let delivery = broker
            .receive(Queue::CrawlItems, Duration::from_millis(500))
            .await
            .unwrap()
            .expect("message should be available");
        broker.ack(Queue::CrawlItems, delivery.id).await.unwrap();
        let empty = broker
            .receive(Queue::CrawlItems, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(empty.is_none());
    }

    #[tokio::test]
    async fn nack_without_requeue_dead_letters() {
        let broker = broker().await;
        broker.publish(Queue::IngestQueue, b"{}").await.unwrap();
        let delivery = broker
            .receive(Queue::IngestQueue, Duration::from_millis(500))
            .await
            .unwrap()
            .unwrap();
        broker
            .nack(Queue::IngestQueue, delivery.id, false)
            .await
            .unwrap();
        let row = sqlx::query("SELECT COUNT(*) as c FROM dead_letters")
            .fetch_one(broker.pool())
            .await
            .unwrap();
        let count: i64 = row.get("c");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn nack_with_requeue_becomes_visible_again() {
        let broker = broker().await;
        broker.publish(Queue::IngestQueue, b"{}").await.unwrap();
        let delivery = broker
            .receive(Queue::IngestQueue, Duration::from_millis(500))
            .await
            .unwrap()
            .unwrap();
        broker
            .nack(Queue::IngestQueue, delivery.id, true)
            .await
            .unwrap();
        let redelivered = broker
            .receive(Queue::IngestQueue, Duration::from_millis(500))
            .await
            .unwrap();
        assert!(redelivered.is_some());
    }
}
