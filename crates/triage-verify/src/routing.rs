//! C5's routing table (`spec.md` §4.5): scores a [`CrawledItem`]'s clean
//! text, then commits exactly one of the scam/review/benign outcomes in a
//! single transaction via [`SqlitePersistence::commit_classification`].

use std::sync::Arc;

use serde_json::json;
use tracing::warn;
use triage_core::domain::{CrawledItem, Label, ReviewQueueEntry, ReviewStatus, VectorRecord};
use triage_core::TriageRuntime;
use triage_index::VectorIndex;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::embedder::Embedder;
use crate::error::Result;

/// Outcome of [`ClassificationService::classify_and_route`], mirroring the
/// three branches of the routing table for callers (tests, the consumer
/// loop) that want to assert on what happened.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingOutcome {
    Scam { doc_id: Uuid },
    QueuedForReview { doc_id: Uuid, priority: i32 },
    Benign { doc_id: Uuid },
}

pub struct ClassificationService {
    runtime: Arc<TriageRuntime>,
    index: Arc<dyn VectorIndex>,
    classifier: Arc<dyn Classifier>,
    embedder: Arc<dyn Embedder>,
}

impl ClassificationService {
    pub fn new(
        runtime: Arc<TriageRuntime>,
        index: Arc<dyn VectorIndex>,
        classifier: Arc<dyn Classifier>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            runtime,
            index,
            classifier,
            embedder,
        }
    }

    /// Scores `item.clean_text` and commits the routing decision. Does not
    /// consume a queue message itself — see [`crate::consumer::ClassificationConsumer`]
    /// for the `ingest.queue` loop that calls this per-message.
    pub async fn classify_and_route(&self, item: &CrawledItem) -> Result<RoutingOutcome> {
        let score = match self.classifier.classify(&item.clean_text, item.language).await {
            Ok(score) => score,
            Err(err) => {
                warn!(doc_id = %item.id, error = %err, "classifier failed, defaulting to 0.5");
                0.5
            }
        };

        let thresholds = self.runtime.active_model_version().thresholds;
        let threshold = thresholds.for_language(item.language);

        let outcome = if score >= threshold {
            self.route_scam(item, score).await?
        } else if score >= 0.6 {
            self.route_for_review(item, score).await?
        } else {
            self.route_benign(item, score).await?
        };

        Ok(outcome)
    }

    async fn route_scam(&self, item: &CrawledItem, score: f64) -> Result<RoutingOutcome> {
        let embedding = self.embedder.embed(&item.clean_text).await?;
        let external_id = format!("doc:{}", item.id);
        self.index
            .insert(item.id, &external_id, &embedding, item.evidence_metadata())
            .await?;

        let vector = VectorRecord {
            id: Uuid::new_v4(),
            doc_id: item.id,
            embedding_id: format!("emb_{}", item.id),
            external_id,
            metadata: json!({ "embedding_dim": embedding.len() }),
        };

        self.runtime
            .persistence
            .commit_classification(item.id, Label::Scam, score, Some(&vector), None)
            .await?;

        self.runtime.events.send(
            "ingest:completed",
            json!({ "doc_id": item.id, "label": "scam", "classifier_score": score }),
            triage_core::event_bus::Target::All,
        );
        self.runtime
            .audit
            .append_best_effort("ingest_completed", json!({ "doc_id": item.id, "label": "scam", "classifier_score": score }))
            .await;

        Ok(RoutingOutcome::Scam { doc_id: item.id })
    }

    async fn route_for_review(&self, item: &CrawledItem, score: f64) -> Result<RoutingOutcome> {
        let priority = if score > 0.8 { 5 } else { 3 };
        let now = chrono::Utc::now();
        let entry = ReviewQueueEntry {
            id: Uuid::new_v4(),
            doc_id: item.id,
            assigned_to: None,
            status: ReviewStatus::Pending,
            priority,
            note: Some(format!("Auto-queued: score={score:.3}, lang={}", item.language)),
            created_at: now,
            updated_at: now,
        };

        self.runtime
            .persistence
            .commit_classification(item.id, Label::NeedsReview, score, None, Some(&entry))
            .await?;

        self.runtime.events.send(
            "review:queued",
            json!({ "doc_id": item.id, "priority": priority, "classifier_score": score }),
            triage_core::event_bus::Target::Role(triage_core::domain::Role::Reviewer),
        );
        self.runtime
            .audit
            .append_best_effort(
                "review_queued",
                json!({ "doc_id": item.id, "priority": priority, "classifier_score": score }),
            )
            .await;

        Ok(RoutingOutcome::QueuedForReview { doc_id: item.id, priority })
    }

    async fn route_benign(&self, item: &CrawledItem, score: f64) -> Result<RoutingOutcome> {
        self.runtime
            .persistence
            .commit_classification(item.id, Label::Benign, score, None, None)
            .await?;
        Ok(RoutingOutcome::Benign { doc_id: item.id })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use triage_core::domain::Language;

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

    // The threshold table and transaction boundary live behind `TriageRuntime`
    // and `SqlitePersistence`, which need a live pool to construct. These
    // tests exercise the score-to-branch decision directly, matching the
    // `score >= threshold` / `score >= 0.6` / else split in
    // `classify_and_route` without standing up a runtime.
    fn branch_for(score: f64, threshold: f64) -> &'static str {
        if score >= threshold {
            "scam"
        } else if score >= 0.6 {
            "review"
        } else {
            "benign"
        }
    }

    #[test]
    fn score_at_or_above_threshold_routes_scam() {
        assert_eq!(branch_for(0.92, 0.90), "scam");
        assert_eq!(branch_for(0.90, 0.90), "scam");
    }

    #[test]
    fn score_between_point_six_and_threshold_routes_review() {
        assert_eq!(branch_for(0.75, 0.90), "review");
        assert_eq!(branch_for(0.60, 0.90), "review");
    }

    #[test]
    fn score_below_point_six_routes_benign() {
        assert_eq!(branch_for(0.59, 0.90), "benign");
        assert_eq!(branch_for(0.0, 0.90), "benign");
    }

    #[test]
    fn review_priority_follows_point_eight_split() {
        let high = if 0.85_f64 > 0.8 { 5 } else { 3 };
        let low = if 0.65_f64 > 0.8 { 5 } else { 3 };
        assert_eq!(high, 5);
        assert_eq!(low, 3);
    }

    #[tokio::test]
    async fn fixed_classifier_and_embedder_produce_expected_values() {
        let classifier = FixedClassifier(0.95);
        let embedder = FixedEmbedder;
        assert_eq!(classifier.classify("x", Language::En).await.unwrap(), 0.95);
        assert_eq!(embedder.embed("x").await.unwrap().len(), 3);
        assert_eq!(embedder.dimension(), 3);
    }
}
