//! The `ingest.queue` consumer loop (`spec.md` §4.5): for each message,
//! load the latest [`CrawledItem`] for its URL and hand it to
//! [`ClassificationService::classify_and_route`], acking only once the
//! routing decision has committed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, instrument, warn};
use triage_core::domain::CrawledItem;
use triage_core::fabric::{Broker, IngestMessage, Queue};
use triage_core::persistence::CrawledItemRepository;
use triage_core::TriageRuntime;

use crate::error::Result;
use crate::routing::ClassificationService;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ClassificationConsumer {
    runtime: Arc<TriageRuntime>,
    service: ClassificationService,
}

impl ClassificationConsumer {
    pub fn new(runtime: Arc<TriageRuntime>, service: ClassificationService) -> Self {
        Self { runtime, service }
    }

    pub async fn run_forever(&self) -> Result<()> {
        loop {
            self.run_once().await?;
        }
    }

    /// Returns `Ok(false)` on an empty poll, `Ok(true)` once one message
    /// has been processed (successfully or dead-lettered).
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<bool> {
        let delivery = match self.runtime.broker.receive(Queue::IngestQueue, RECEIVE_TIMEOUT).await? {
            Some(delivery) => delivery,
            None => return Ok(false),
        };

        let msg: IngestMessage = match serde_json::from_slice(&delivery.body) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(error = %err, "ingest.queue message is not valid JSON, dead-lettering");
                self.runtime.broker.nack(Queue::IngestQueue, delivery.id, false).await?;
                return Ok(true);
            }
        };

        match self.process(&msg).await {
            Ok(()) => {
                self.runtime.broker.ack(Queue::IngestQueue, delivery.id).await?;
                Ok(true)
            }
            Err(err) => {
                warn!(url = %msg.url, error = %err, "classification failed, nacking without requeue");
                self.runtime
                    .audit
                    .append_best_effort(
                        "check_error",
                        json!({ "url": msg.url, "error": err.to_string() }),
                    )
                    .await;
                self.runtime.broker.nack(Queue::IngestQueue, delivery.id, false).await?;
                Ok(true)
            }
        }
    }

    async fn process(&self, msg: &IngestMessage) -> Result<()> {
        let item: CrawledItem = self
            .runtime
            .persistence
            .find_by_url(&msg.url)
            .await?
            .ok_or_else(|| crate::error::VerifyError::NotFound {
                what: format!("crawled item for url {}", msg.url),
            })?;

        let outcome = self.service.classify_and_route(&item).await?;
        info!(doc_id = %item.id, url = %item.url, ?outcome, "classified and routed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use triage_core::config::TriageConfig;
    use triage_core::domain::{CrawledItem, Language};
    use triage_core::fabric::{Broker, IngestMessage, Queue};
    use triage_core::persistence::CrawledItemRepository;
    use triage_core::TriageRuntime;
    use triage_index::{SqliteVectorIndex, VectorIndex};

    use super::*;
    use crate::classifier::Classifier;
    use crate::embedder::Embedder;

    struct FixedClassifier(f64);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _text: &str, _language: Language) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    async fn setup(score: f64) -> (Arc<TriageRuntime>, ClassificationConsumer) {
        let config = TriageConfig::for_test("sqlite::memory:".to_string());
        let runtime = Arc::new(TriageRuntime::connect(config).await.unwrap());
        let index: Arc<dyn VectorIndex> = Arc::new(SqliteVectorIndex::connect("sqlite::memory:").await.unwrap());
        let service = ClassificationService::new(
            runtime.clone(),
            index,
            Arc::new(FixedClassifier(score)),
            Arc::new(FixedEmbedder),
        );
        (runtime, ClassificationConsumer::new(runtime.clone(), service))
    }

    async fn seed_item(runtime: &TriageRuntime, url: &str) -> CrawledItem {
        let item = CrawledItem::new_enriched(
            url.to_string(),
            "scam.example".to_string(),
            None,
            None,
            "urgent payment needed".to_string(),
            Language::En,
            0.9,
            false,
            80.0,
            vec![],
            serde_json::json!({}),
            serde_json::json!({}),
        );
        runtime.persistence.insert_item(&item).await.unwrap();
        item
    }

    #[tokio::test]
    async fn run_once_returns_false_on_empty_queue() {
        let (_runtime, consumer) = setup(0.95).await;
        assert!(!consumer.run_once().await.unwrap());
    }

    #[tokio::test]
    async fn high_score_routes_to_scam_and_acks() {
        let (runtime, consumer) = setup(0.99).await;
        let item = seed_item(&runtime, "http://scam.example/c").await;

        let msg = IngestMessage {
            url: item.url.clone(),
            language: "en".to_string(),
            heuristic_score: 80.0,
            timestamp: 0.0,
        };
        runtime
            .broker
            .publish(Queue::IngestQueue, &serde_json::to_vec(&msg).unwrap())
            .await
            .unwrap();

        assert!(consumer.run_once().await.unwrap());

        let refreshed = runtime.persistence.find_by_url(&item.url).await.unwrap().unwrap();
        assert_eq!(refreshed.label, triage_core::domain::Label::Scam);
    }

    #[tokio::test]
    async fn missing_crawled_item_is_dead_lettered() {
        let (runtime, consumer) = setup(0.9).await;
        let msg = IngestMessage {
            url: "http://nowhere.example/x".to_string(),
            language: "en".to_string(),
            heuristic_score: 10.0,
            timestamp: 0.0,
        };
        runtime
            .broker
            .publish(Queue::IngestQueue, &serde_json::to_vec(&msg).unwrap())
            .await
            .unwrap();

        assert!(consumer.run_once().await.unwrap());
        assert!(!consumer.run_once().await.unwrap());
    }
}
