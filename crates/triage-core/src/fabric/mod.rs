//! Work-dispatch fabric (C1, `spec.md` §4.1).
//!
//! Two durable queues, `crawl.items` and `ingest.queue`, at-least-once
//! delivery, manual ack, prefetch = 1 (the caller never asks for more than
//! one in-flight message per consumer — see [`Broker::receive`]). The wire
//! protocol is UTF-8 JSON and tolerant of unknown fields by construction:
//! consumers deserialize into `#[derive(Deserialize)]` structs, which
//! `serde` already ignores unrecognised keys for.

mod sqlite_broker;

pub use sqlite_broker::SqliteBroker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named durable queue. `spec.md` §6 fixes the two queue names; this
/// enum keeps call sites from typo-ing a topic string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    CrawlItems,
    IngestQueue,
}

impl Queue {
    pub fn name(self) -> &'static str {
        match self {
            Queue::CrawlItems => "crawl.items",
            Queue::IngestQueue => "ingest.queue",
        }
    }
}

/// A delivered message, handed to the consumer along with a token it must
/// use to `ack`/`nack` exactly once.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: i64,
    pub body: Vec<u8>,
}

/// Producer/consumer capability over a durable queue. The wire broker
/// (RabbitMQ, SQS, a managed Redis stream, ...) is pluggable in production;
/// [`SqliteBroker`] is the runnable default, grounded the same way the
/// teacher ships `SQLiteCheckpointer` alongside a `Checkpointer` trait.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Persistent delivery: the message survives a broker restart before
    /// being acked.
    async fn publish(&self, queue: Queue, payload: &[u8]) -> Result<()>;

    /// Receive at most one message (prefetch = 1). Returns `None` if the
    /// queue is empty within `timeout`. A received message stays invisible
    /// to other consumers until it is acked, nacked, or the visibility
    /// timeout elapses (crash recovery).
    async fn receive(&self, queue: Queue, timeout: std::time::Duration) -> Result<Option<Delivery>>;

    /// Commit: the message will never be redelivered.
    async fn ack(&self, queue: Queue, delivery_id: i64) -> Result<()>;

    /// Negative-ack. `requeue = false` diverts the message to the
    /// dead-letter slot per `spec.md` §4.1 ("poison messages divert to a
    /// dead-letter slot"); `requeue = true` makes it immediately visible
    /// again for at-least-once redelivery.
    async fn nack(&self, queue: Queue, delivery_id: i64, requeue: bool) -> Result<()>;
}

/// `crawl.items` payload (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlItemMessage {
    pub url: String,
    pub domain: String,
    #[serde(default)]
    pub html_path: Option<String>,
    #[serde(default)]
    pub screenshot_path: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub crawl_timestamp: Option<f64>,
}

/// `ingest.queue` payload (`spec.md` §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestMessage {
    pub url: String,
    pub language: String,
    pub heuristic_score: f64,
    pub timestamp: f64,
}
