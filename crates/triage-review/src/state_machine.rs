//! C7's state machine (`spec.md` §4.7): `assign` claims a pending entry for
//! one reviewer; `act` applies approve/reject/escalate, each in one commit
//! alongside the `CrawledItem` label change and, on approve, the feedback
//! vector upsert that teaches the index from human judgment.
//!
//! Grounded on [`triage_core::persistence::SqlitePersistence::commit_review_action`]'s
//! CAS-guarded transaction and on `triage-verify::routing::ClassificationService`'s
//! shape (a thin service holding `TriageRuntime` + `VectorIndex` + `Embedder`,
//! one public method per spec operation).

use std::sync::Arc;

use serde_json::json;
use triage_core::domain::{Label, ReviewQueueEntry, ReviewStatus, Role, VectorRecord};
use triage_core::event_bus::Target;
use triage_core::persistence::{CrawledItemRepository, ReviewRepository};
use triage_core::TriageRuntime;
use triage_index::VectorIndex;
use triage_verify::Embedder;
use uuid::Uuid;

use crate::error::{Result, ReviewError};

/// `spec.md` §4.7's three terminal actions. `assign` is a separate
/// operation, not a variant here, since it doesn't carry the
/// approve/reject/escalate side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
    Escalate,
}

impl ReviewAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::Escalate => "escalate",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "approve" => Some(ReviewAction::Approve),
            "reject" => Some(ReviewAction::Reject),
            "escalate" => Some(ReviewAction::Escalate),
            _ => None,
        }
    }
}

/// Per-status counts plus "assigned to me and active" (`spec.md` §4.7
/// `stats()`).
#[derive(Debug, Clone, Default)]
pub struct ReviewStats {
    pub pending: i64,
    pub in_review: i64,
    pub approved: i64,
    pub rejected: i64,
    pub escalated: i64,
    pub assigned_to_me_active: i64,
}

pub struct ReviewStateMachine {
    runtime: Arc<TriageRuntime>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl ReviewStateMachine {
    pub fn new(runtime: Arc<TriageRuntime>, index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            runtime,
            index,
            embedder,
        }
    }

    /// `pending -> in_review`. Fails with `Conflict` if the entry has
    /// already left `pending` — whether claimed by `reviewer` themselves via
    /// a prior call or by someone else, since re-assignment is not part of
    /// the declared state diagram.
    pub async fn assign(&self, review_id: Uuid, reviewer: Uuid) -> Result<ReviewQueueEntry> {
        let current = self.runtime.persistence.get_entry(review_id).await?;
        if current.status == ReviewStatus::InReview && current.assigned_to == Some(reviewer) {
            return Ok(current);
        }
        if current.status != ReviewStatus::Pending {
            return Err(ReviewError::Conflict {
                message: format!(
                    "review {review_id} is not pending (status={})",
                    current.status.as_str()
                ),
            });
        }

        let mut next = current.clone();
        next.status = ReviewStatus::InReview;
        next.assigned_to = Some(reviewer);
        next.updated_at = chrono::Utc::now();

        let claimed = self
            .runtime
            .persistence
            .compare_and_set_status(review_id, ReviewStatus::Pending, &next)
            .await?;
        if !claimed {
            return Err(ReviewError::Conflict {
                message: format!("review {review_id} was claimed by another reviewer first"),
            });
        }

        self.runtime.events.send(
            "review:assigned",
            json!({ "review_id": review_id, "doc_id": current.doc_id, "reviewer": reviewer }),
            Target::Role(Role::Reviewer),
        );
        self.runtime
            .audit
            .append_best_effort(
                "review_assigned",
                json!({ "review_id": review_id, "doc_id": current.doc_id, "reviewer": reviewer }),
            )
            .await;

        Ok(next)
    }

    /// Applies `action` to `review_id` on behalf of `actor`. An entry still
    /// `pending` may be acted on directly — the CAS below claims it for
    /// `actor` atomically, so a prior explicit [`Self::assign`] call is not
    /// required, only recommended for UIs that want to show "in progress"
    /// before a decision is made. An entry already `in_review` under a
    /// *different* reviewer is rejected before the CAS is even attempted
    /// (single-reviewer ownership, `spec.md` §4.7); an entry already
    /// `approved`/`rejected` is terminal.
    pub async fn act(
        &self,
        review_id: Uuid,
        actor: Uuid,
        action: ReviewAction,
        note: Option<String>,
    ) -> Result<ReviewQueueEntry> {
        let current = self.runtime.persistence.get_entry(review_id).await?;

        match current.status {
            ReviewStatus::Approved | ReviewStatus::Rejected => {
                return Err(ReviewError::Conflict {
                    message: format!(
                        "review {review_id} already terminal (status={})",
                        current.status.as_str()
                    ),
                });
            }
            ReviewStatus::InReview => {
                if let Some(owner) = current.assigned_to {
                    if owner != actor {
                        return Err(ReviewError::Conflict {
                            message: format!("review {review_id} is owned by another reviewer"),
                        });
                    }
                }
            }
            ReviewStatus::Pending | ReviewStatus::Escalated => {}
        }

        let expected_status = current.status;
        let mut next = current.clone();
        next.assigned_to = Some(actor);
        next.updated_at = chrono::Utc::now();
        if let Some(note) = note {
            next.note = Some(note);
        }

        let (item_label_update, vector) = match action {
            ReviewAction::Approve => {
                next.status = ReviewStatus::Approved;
                let item = self.runtime.persistence.get_item(current.doc_id).await?;
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
                    metadata: json!({ "embedding_dim": embedding.len(), "source": "review_approval" }),
                };
                (Some((item.id, Label::Scam)), Some(vector))
            }
            ReviewAction::Reject => {
                next.status = ReviewStatus::Rejected;
                (Some((current.doc_id, Label::Benign)), None)
            }
            ReviewAction::Escalate => {
                next.status = ReviewStatus::Escalated;
                next.priority = 10;
                (None, None)
            }
        };

        let committed = self
            .runtime
            .persistence
            .commit_review_action(review_id, expected_status, &next, item_label_update, vector.as_ref())
            .await?;
        if !committed {
            return Err(ReviewError::Conflict {
                message: format!("review {review_id} changed concurrently"),
            });
        }

        self.runtime.events.send(
            &format!("review:{}", action.as_str()),
            json!({ "review_id": review_id, "doc_id": current.doc_id, "actor": actor }),
            Target::Role(Role::Reviewer),
        );
        self.runtime
            .audit
            .append_best_effort(
                "review_action",
                json!({
                    "review_id": review_id,
                    "doc_id": current.doc_id,
                    "actor": actor,
                    "action": action.as_str(),
                }),
            )
            .await;

        Ok(next)
    }

    /// Per-status counts plus how many entries are assigned to `me` and
    /// still active (`in_review` or `escalated`).
    pub async fn stats(&self, me: Option<Uuid>) -> Result<ReviewStats> {
        let counts = self.runtime.persistence.stats().await?;
        let mut stats = ReviewStats::default();
        for (status, count) in counts {
            match status {
                ReviewStatus::Pending => stats.pending = count,
                ReviewStatus::InReview => stats.in_review = count,
                ReviewStatus::Approved => stats.approved = count,
                ReviewStatus::Rejected => stats.rejected = count,
                ReviewStatus::Escalated => stats.escalated = count,
            }
        }
        if let Some(me) = me {
            stats.assigned_to_me_active = self.runtime.persistence.count_assigned_active(me).await?;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use triage_core::config::TriageConfig;
    use triage_core::domain::{CrawledItem, Language};
    use triage_index::SqliteVectorIndex;

    use super::*;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> triage_verify::Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    async fn machine() -> (ReviewStateMachine, Arc<TriageRuntime>) {
        let runtime = Arc::new(
            TriageRuntime::connect(TriageConfig::for_test("sqlite::memory:".to_string()))
                .await
                .unwrap(),
        );
        let index = Arc::new(SqliteVectorIndex::connect("sqlite::memory:").await.unwrap());
        let machine = ReviewStateMachine::new(runtime.clone(), index, Arc::new(FixedEmbedder));
        (machine, runtime)
    }

    async fn seed_pending_entry(runtime: &TriageRuntime) -> ReviewQueueEntry {
        let item = CrawledItem::new_enriched(
            "https://scam.example/offer".to_string(),
            "scam.example".to_string(),
            None,
            None,
            "win a free lottery prize now".to_string(),
            Language::En,
            0.9,
            false,
            75.0,
            Vec::new(),
            json!({}),
            json!({}),
        );
        runtime.persistence.insert_item(&item).await.unwrap();

        let now = chrono::Utc::now();
        let entry = ReviewQueueEntry {
            id: Uuid::new_v4(),
            doc_id: item.id,
            assigned_to: None,
            status: ReviewStatus::Pending,
            priority: 3,
            note: None,
            created_at: now,
            updated_at: now,
        };
        runtime.persistence.enqueue(&entry).await.unwrap();
        entry
    }

    #[tokio::test]
    async fn assign_claims_a_pending_entry() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;
        let reviewer = Uuid::new_v4();

        let claimed = machine.assign(entry.id, reviewer).await.unwrap();
        assert_eq!(claimed.status, ReviewStatus::InReview);
        assert_eq!(claimed.assigned_to, Some(reviewer));
    }

    #[tokio::test]
    async fn assign_twice_by_different_reviewers_conflicts() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;

        machine.assign(entry.id, Uuid::new_v4()).await.unwrap();
        let second = machine.assign(entry.id, Uuid::new_v4()).await;
        assert!(matches!(second, Err(ReviewError::Conflict { .. })));
    }

    #[tokio::test]
    async fn approve_labels_scam_and_writes_a_vector() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;
        let reviewer = Uuid::new_v4();

        let approved = machine
            .act(entry.id, reviewer, ReviewAction::Approve, Some("confirmed scam".to_string()))
            .await
            .unwrap();
        assert_eq!(approved.status, ReviewStatus::Approved);

        let item = runtime.persistence.get_item(entry.doc_id).await.unwrap();
        assert_eq!(item.label, Label::Scam);
    }

    #[tokio::test]
    async fn reject_labels_benign() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;

        machine.act(entry.id, Uuid::new_v4(), ReviewAction::Reject, None).await.unwrap();
        let item = runtime.persistence.get_item(entry.doc_id).await.unwrap();
        assert_eq!(item.label, Label::Benign);
    }

    #[tokio::test]
    async fn escalate_raises_priority_to_ten_and_stays_escalated() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;

        let escalated = machine
            .act(entry.id, Uuid::new_v4(), ReviewAction::Escalate, None)
            .await
            .unwrap();
        assert_eq!(escalated.status, ReviewStatus::Escalated);
        assert_eq!(escalated.priority, 10);
    }

    #[tokio::test]
    async fn approving_twice_yields_one_success_and_one_conflict() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;

        let first = machine.act(entry.id, Uuid::new_v4(), ReviewAction::Approve, None).await;
        let second = machine.act(entry.id, Uuid::new_v4(), ReviewAction::Approve, None).await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(ReviewError::Conflict { .. })));
    }

    /// `spec.md` §8's reviewer-race scenario, run as genuinely concurrent
    /// futures rather than two sequential calls: both `act(approve)` calls
    /// race against the same `pending` entry, and the CAS in
    /// `commit_review_action` must let exactly one through.
    #[tokio::test]
    async fn concurrent_approve_calls_let_exactly_one_through() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;

        let (first, second) = tokio::join!(
            machine.act(entry.id, Uuid::new_v4(), ReviewAction::Approve, None),
            machine.act(entry.id, Uuid::new_v4(), ReviewAction::Approve, None),
        );

        let ok_count = [&first, &second].iter().filter(|r| r.is_ok()).count();
        let conflict_count = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(ReviewError::Conflict { .. })))
            .count();
        assert_eq!(ok_count, 1);
        assert_eq!(conflict_count, 1);
    }

    #[tokio::test]
    async fn stats_counts_by_status() {
        let (machine, runtime) = machine().await;
        seed_pending_entry(&runtime).await;
        let second = seed_pending_entry(&runtime).await;
        machine.assign(second.id, Uuid::new_v4()).await.unwrap();

        let stats = machine.stats(None).await.unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_review, 1);
    }

    #[tokio::test]
    async fn stats_reports_assigned_to_me_active() {
        let (machine, runtime) = machine().await;
        let entry = seed_pending_entry(&runtime).await;
        let reviewer = Uuid::new_v4();
        machine.assign(entry.id, reviewer).await.unwrap();

        let stats = machine.stats(Some(reviewer)).await.unwrap();
        assert_eq!(stats.assigned_to_me_active, 1);
    }
}
