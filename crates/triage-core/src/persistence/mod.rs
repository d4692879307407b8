//! Storage seam shared by every stage past C1 (`spec.md` §3, §4.9).
//!
//! One [`Repository`] trait per entity family rather than a single
//! god-trait, mirroring how the teacher splits `Checkpointer` (graph state)
//! from its schema-migration concerns — each repository owns one table and
//! the transactions that must span it.

mod sqlite;

pub use sqlite::SqlitePersistence;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CrawledItem, Label, ModelVersion, ReviewQueueEntry, ReviewStatus, User, VectorRecord};
use crate::error::Result;

/// CRUD plus the label/score update the classifier and reviewer actions
/// need (`spec.md` §4.5, §4.7).
#[async_trait]
pub trait CrawledItemRepository: Send + Sync {
    async fn insert_item(&self, item: &CrawledItem) -> Result<()>;
    /// Insert `item`, or — if `item.url` already has a row — overwrite its
    /// content columns in place and return the *existing* row's id
    /// unchanged. `spec.md` §8: "Re-enriching the same URL is idempotent
    /// ... after two passes, exactly one `CrawledItem` with the most recent
    /// contents remains canonical". Keeping the original id intact matters
    /// because a prior pass's row may already be referenced by a
    /// [`ReviewQueueEntry`] or [`VectorRecord`](crate::domain::VectorRecord).
    async fn upsert_by_url(&self, item: &CrawledItem) -> Result<CrawledItem>;
    async fn get_item(&self, id: Uuid) -> Result<CrawledItem>;
    async fn find_by_url(&self, url: &str) -> Result<Option<CrawledItem>>;
    async fn update_label(&self, id: Uuid, label: Label, classifier_score: Option<f64>) -> Result<()>;
    async fn list_by_label(&self, label: Label, limit: i64, offset: i64) -> Result<Vec<CrawledItem>>;
}

/// Bookkeeping only — the embedding itself and nearest-neighbour search
/// live in `triage-index`; this repository just tracks which document each
/// stored vector belongs to.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    async fn upsert_vector(&self, record: &VectorRecord) -> Result<()>;
    async fn get_by_doc(&self, doc_id: Uuid) -> Result<Option<VectorRecord>>;
    async fn delete_by_doc(&self, doc_id: Uuid) -> Result<()>;
}

/// Review queue CRUD plus the compare-and-set primitive the state machine
/// in `triage-review` builds `assign`/`act` on top of.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn enqueue(&self, entry: &ReviewQueueEntry) -> Result<()>;
    async fn get_entry(&self, id: Uuid) -> Result<ReviewQueueEntry>;
    async fn next_pending(&self, min_priority: i32) -> Result<Option<ReviewQueueEntry>>;
    /// Update `entry`'s row only if its current status still matches
    /// `expected_status` (optimistic concurrency, `spec.md` §4.7: "two
    /// reviewers racing to claim the same item must not both succeed").
    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected_status: ReviewStatus,
        entry: &ReviewQueueEntry,
    ) -> Result<bool>;
    async fn stats(&self) -> Result<Vec<(ReviewStatus, i64)>>;
    /// Count of entries assigned to `reviewer` still in an active (`in_review`
    /// or `escalated`) status — the "assigned to me and active" figure
    /// `spec.md` §4.7's `stats()` contract calls for alongside the
    /// per-status counts.
    async fn count_assigned_active(&self, reviewer: Uuid) -> Result<i64>;
}

#[async_trait]
pub trait ModelVersionRepository: Send + Sync {
    async fn insert_version(&self, version: &ModelVersion) -> Result<()>;
    async fn active(&self) -> Result<ModelVersion>;
    async fn activate(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, id: Uuid) -> Result<User>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}
