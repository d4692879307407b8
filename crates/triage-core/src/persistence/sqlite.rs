//! SQLite implementation of every [`super`] repository trait, sharing one
//! pool and one embedded migration set the way the teacher's
//! `SQLiteCheckpointer` owns its schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::audit::AuditStore;
use crate::domain::{
    AuditLogRow, CrawledItem, Label, Language, LanguageThresholds, ModelVersion, ReviewQueueEntry,
    ReviewStatus, Role, User, VectorRecord,
};
use crate::error::{CoreError, Result};

use super::{CrawledItemRepository, ModelVersionRepository, ReviewRepository, UserRepository, VectorRepository};

/// Thin handle around a shared [`SqlitePool`]; every repository trait is
/// implemented on this one type since they all read/write the same
/// database.
#[derive(Clone)]
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // `sqlite::memory:` gives every physical connection its own private
        // database, so a default pool (max 10) silently hands out unmigrated
        // connections to callers racing on the same `SqlitePersistence` —
        // pin it to one connection so concurrent callers actually contend
        // on the same in-memory database rather than each other's empty one.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1).connect(database_url).await
        } else {
            SqlitePool::connect(database_url).await
        }
        .map_err(|e| CoreError::DependencyUnavailable {
            message: format!("persistence connect: {e}"),
        })?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            CoreError::IntegrityError {
                message: format!("migration failed: {e}"),
            }
        })?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Atomically applies C5's routing decision (`spec.md` §4.5): the
    /// `CrawledItem` label/score update, plus exactly one of a `Vector`
    /// insert (scam) or a `ReviewQueueEntry` insert (pending/needs_review)
    /// — never both. One commit, so a downstream vector-index write
    /// failure can never leave the item labeled `scam` without an
    /// evidence row. This sits outside the per-entity repository traits
    /// because no single one of them can see across `crawled_items`,
    /// `vectors`, and `review_queue` at once.
    pub async fn commit_classification(
        &self,
        doc_id: Uuid,
        label: Label,
        classifier_score: f64,
        vector: Option<&VectorRecord>,
        review_entry: Option<&ReviewQueueEntry>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;

        sqlx::query("UPDATE crawled_items SET label = ?2, classifier_score = ?3 WHERE id = ?1")
            .bind(doc_id)
            .bind(label_str(label))
            .bind(classifier_score)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;

        if let Some(record) = vector {
            sqlx::query(
                r#"
                INSERT INTO vectors (id, doc_id, embedding_id, external_id, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(doc_id) DO UPDATE SET
                    embedding_id = excluded.embedding_id,
                    external_id = excluded.external_id,
                    metadata = excluded.metadata
                "#,
            )
            .bind(record.id)
            .bind(record.doc_id)
            .bind(&record.embedding_id)
            .bind(&record.external_id)
            .bind(serde_json::to_string(&record.metadata).unwrap_or_default())
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        }

        if let Some(entry) = review_entry {
            sqlx::query(
                r#"
                INSERT INTO review_queue (id, doc_id, assigned_to, status, priority, note, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(entry.id)
            .bind(entry.doc_id)
            .bind(entry.assigned_to)
            .bind(entry.status.as_str())
            .bind(entry.priority)
            .bind(&entry.note)
            .bind(entry.created_at)
            .bind(entry.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        }

        tx.commit().await.map_err(CoreError::from)?;
        Ok(())
    }

    /// Atomically applies a reviewer action (C7's `act`): the CAS-guarded
    /// `review_queue` transition, the `crawled_items` label change it
    /// implies, and — on approve — the feedback-loop vector upsert, all in
    /// one commit. Returns `false` (after rolling back) when the CAS on
    /// `expected_status` fails, mirroring
    /// [`super::ReviewRepository::compare_and_set_status`]'s contract.
    pub async fn commit_review_action(
        &self,
        review_id: Uuid,
        expected_status: ReviewStatus,
        new_entry: &ReviewQueueEntry,
        item_label_update: Option<(Uuid, Label)>,
        vector: Option<&VectorRecord>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE review_queue SET
                assigned_to = ?3, status = ?4, priority = ?5, note = ?6, updated_at = ?7
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(review_id)
        .bind(expected_status.as_str())
        .bind(new_entry.assigned_to)
        .bind(new_entry.status.as_str())
        .bind(new_entry.priority)
        .bind(&new_entry.note)
        .bind(new_entry.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::from)?;

        if result.rows_affected() != 1 {
            tx.rollback().await.ok();
            return Ok(false);
        }

        if let Some((doc_id, label)) = item_label_update {
            sqlx::query("UPDATE crawled_items SET label = ?2 WHERE id = ?1")
                .bind(doc_id)
                .bind(label_str(label))
                .execute(&mut *tx)
                .await
                .map_err(CoreError::from)?;
        }

        if let Some(record) = vector {
            sqlx::query(
                r#"
                INSERT INTO vectors (id, doc_id, embedding_id, external_id, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(doc_id) DO UPDATE SET
                    embedding_id = excluded.embedding_id,
                    external_id = excluded.external_id,
                    metadata = excluded.metadata
                "#,
            )
            .bind(record.id)
            .bind(record.doc_id)
            .bind(&record.embedding_id)
            .bind(&record.external_id)
            .bind(serde_json::to_string(&record.metadata).unwrap_or_default())
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        }

        tx.commit().await.map_err(CoreError::from)?;
        Ok(true)
    }
}

fn label_str(label: Label) -> &'static str {
    match label {
        Label::Pending => "pending",
        Label::Benign => "benign",
        Label::Scam => "scam",
        Label::NeedsReview => "needs_review",
    }
}

fn parse_label(raw: &str) -> Result<Label> {
    match raw {
        "pending" => Ok(Label::Pending),
        "benign" => Ok(Label::Benign),
        "scam" => Ok(Label::Scam),
        "needs_review" => Ok(Label::NeedsReview),
        other => Err(CoreError::IntegrityError {
            message: format!("unknown label in row: {other}"),
        }),
    }
}

fn row_to_crawled_item(row: &sqlx::sqlite::SqliteRow) -> Result<CrawledItem> {
    let language_raw: String = row.get("language");
    let label_raw: String = row.get("label");
    let image_hashes_raw: String = row.get("image_hashes");
    let whois_raw: String = row.get("whois_data");
    let metadata_raw: String = row.get("metadata");
    Ok(CrawledItem {
        id: row.get("id"),
        url: row.get("url"),
        domain: row.get("domain"),
        raw_html_path: row.get("raw_html_path"),
        screenshot_path: row.get("screenshot_path"),
        clean_text: row.get("clean_text"),
        language: Language::parse(&language_raw).ok_or_else(|| CoreError::IntegrityError {
            message: format!("unknown language in row: {language_raw}"),
        })?,
        lang_confidence: row.get("lang_confidence"),
        translit: row.get::<i64, _>("translit") != 0,
        heuristic_score: row.get("heuristic_score"),
        classifier_score: row.get("classifier_score"),
        label: parse_label(&label_raw)?,
        image_hashes: serde_json::from_str(&image_hashes_raw).unwrap_or_default(),
        whois_data: serde_json::from_str(&whois_raw).unwrap_or(Value::Null),
        metadata: serde_json::from_str(&metadata_raw).unwrap_or(Value::Null),
        ingested_at: row.get("ingested_at"),
    })
}

#[async_trait]
impl CrawledItemRepository for SqlitePersistence {
    async fn insert_item(&self, item: &CrawledItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crawled_items (
                id, url, domain, raw_html_path, screenshot_path, clean_text,
                language, lang_confidence, translit, heuristic_score,
                classifier_score, label, image_hashes, whois_data, metadata, ingested_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(item.id)
        .bind(&item.url)
        .bind(&item.domain)
        .bind(&item.raw_html_path)
        .bind(&item.screenshot_path)
        .bind(&item.clean_text)
        .bind(item.language.as_str())
        .bind(item.lang_confidence)
        .bind(item.translit as i64)
        .bind(item.heuristic_score)
        .bind(item.classifier_score)
        .bind(label_str(item.label))
        .bind(serde_json::to_string(&item.image_hashes).unwrap_or_default())
        .bind(serde_json::to_string(&item.whois_data).unwrap_or_default())
        .bind(serde_json::to_string(&item.metadata).unwrap_or_default())
        .bind(item.ingested_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(())
    }

    async fn upsert_by_url(&self, item: &CrawledItem) -> Result<CrawledItem> {
        sqlx::query(
            r#"
            INSERT INTO crawled_items (
                id, url, domain, raw_html_path, screenshot_path, clean_text,
                language, lang_confidence, translit, heuristic_score,
                classifier_score, label, image_hashes, whois_data, metadata, ingested_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(url) DO UPDATE SET
                domain = excluded.domain,
                raw_html_path = excluded.raw_html_path,
                screenshot_path = excluded.screenshot_path,
                clean_text = excluded.clean_text,
                language = excluded.language,
                lang_confidence = excluded.lang_confidence,
                translit = excluded.translit,
                heuristic_score = excluded.heuristic_score,
                image_hashes = excluded.image_hashes,
                whois_data = excluded.whois_data,
                metadata = excluded.metadata,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(item.id)
        .bind(&item.url)
        .bind(&item.domain)
        .bind(&item.raw_html_path)
        .bind(&item.screenshot_path)
        .bind(&item.clean_text)
        .bind(item.language.as_str())
        .bind(item.lang_confidence)
        .bind(item.translit as i64)
        .bind(item.heuristic_score)
        .bind(item.classifier_score)
        .bind(label_str(item.label))
        .bind(serde_json::to_string(&item.image_hashes).unwrap_or_default())
        .bind(serde_json::to_string(&item.whois_data).unwrap_or_default())
        .bind(serde_json::to_string(&item.metadata).unwrap_or_default())
        .bind(item.ingested_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;

        // `id` is deliberately left out of the conflict's SET clause above so
        // a repeat pass keeps the row's original id; re-read by url to hand
        // the caller the canonical row rather than the freshly-constructed
        // (and possibly discarded) `item.id`.
        self.find_by_url(&item.url)
            .await?
            .ok_or_else(|| CoreError::IntegrityError {
                message: format!("upsert_by_url: row for {} missing immediately after write", item.url),
            })
    }

    async fn get_item(&self, id: Uuid) -> Result<CrawledItem> {
        let row = sqlx::query("SELECT * FROM crawled_items WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::from)?;
        row_to_crawled_item(&row)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<CrawledItem>> {
        let row = sqlx::query("SELECT * FROM crawled_items WHERE url = ?1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::from)?;
        row.as_ref().map(row_to_crawled_item).transpose()
    }

    async fn update_label(&self, id: Uuid, label: Label, classifier_score: Option<f64>) -> Result<()> {
        sqlx::query("UPDATE crawled_items SET label = ?2, classifier_score = ?3 WHERE id = ?1")
            .bind(id)
            .bind(label_str(label))
            .bind(classifier_score)
            .execute(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn list_by_label(&self, label: Label, limit: i64, offset: i64) -> Result<Vec<CrawledItem>> {
        let rows = sqlx::query(
            "SELECT * FROM crawled_items WHERE label = ?1 ORDER BY ingested_at DESC LIMIT ?2 OFFSET ?3",
        )
        .bind(label_str(label))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::from)?;
        rows.iter().map(row_to_crawled_item).collect()
    }
}

#[async_trait]
impl VectorRepository for SqlitePersistence {
    async fn upsert_vector(&self, record: &VectorRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vectors (id, doc_id, embedding_id, external_id, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(doc_id) DO UPDATE SET
                embedding_id = excluded.embedding_id,
                external_id = excluded.external_id,
                metadata = excluded.metadata
            "#,
        )
        .bind(record.id)
        .bind(record.doc_id)
        .bind(&record.embedding_id)
        .bind(&record.external_id)
        .bind(serde_json::to_string(&record.metadata).unwrap_or_default())
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(())
    }

    async fn get_by_doc(&self, doc_id: Uuid) -> Result<Option<VectorRecord>> {
        let row = sqlx::query("SELECT * FROM vectors WHERE doc_id = ?1")
            .bind(doc_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(row.map(|row| {
            let metadata_raw: String = row.get("metadata");
            VectorRecord {
                id: row.get("id"),
                doc_id: row.get("doc_id"),
                embedding_id: row.get("embedding_id"),
                external_id: row.get("external_id"),
                metadata: serde_json::from_str(&metadata_raw).unwrap_or(Value::Null),
            }
        }))
    }

    async fn delete_by_doc(&self, doc_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM vectors WHERE doc_id = ?1")
            .bind(doc_id)
            .execute(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }
}

fn row_to_review_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewQueueEntry> {
    let status_raw: String = row.get("status");
    Ok(ReviewQueueEntry {
        id: row.get("id"),
        doc_id: row.get("doc_id"),
        assigned_to: row.get("assigned_to"),
        status: ReviewStatus::parse(&status_raw).ok_or_else(|| CoreError::IntegrityError {
            message: format!("unknown review status in row: {status_raw}"),
        })?,
        priority: row.get("priority"),
        note: row.get("note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl ReviewRepository for SqlitePersistence {
    async fn enqueue(&self, entry: &ReviewQueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO review_queue (id, doc_id, assigned_to, status, priority, note, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.doc_id)
        .bind(entry.assigned_to)
        .bind(entry.status.as_str())
        .bind(entry.priority)
        .bind(&entry.note)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> Result<ReviewQueueEntry> {
        let row = sqlx::query("SELECT * FROM review_queue WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::from)?;
        row_to_review_entry(&row)
    }

    async fn next_pending(&self, min_priority: i32) -> Result<Option<ReviewQueueEntry>> {
        let row = sqlx::query(
            "SELECT * FROM review_queue WHERE status = 'pending' AND priority >= ?1 ORDER BY priority DESC, created_at ASC LIMIT 1",
        )
        .bind(min_priority)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::from)?;
        row.as_ref().map(row_to_review_entry).transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected_status: ReviewStatus,
        entry: &ReviewQueueEntry,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE review_queue SET
                assigned_to = ?3, status = ?4, priority = ?5, note = ?6, updated_at = ?7
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(expected_status.as_str())
        .bind(entry.assigned_to)
        .bind(entry.status.as_str())
        .bind(entry.priority)
        .bind(&entry.note)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(result.rows_affected() == 1)
    }

    async fn stats(&self) -> Result<Vec<(ReviewStatus, i64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) as c FROM review_queue GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::from)?;
        rows.iter()
            .map(|row| {
                let status_raw: String = row.get("status");
                let status = ReviewStatus::parse(&status_raw).ok_or_else(|| CoreError::IntegrityError {
                    message: format!("unknown review status in row: {status_raw}"),
                })?;
                Ok((status, row.get("c")))
            })
            .collect()
    }

    async fn count_assigned_active(&self, reviewer: Uuid) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as c FROM review_queue WHERE assigned_to = ?1 AND status IN ('in_review', 'escalated')",
        )
        .bind(reviewer)
        .fetch_one(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(row.get("c"))
    }
}

#[async_trait]
impl ModelVersionRepository for SqlitePersistence {
    async fn insert_version(&self, version: &ModelVersion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO model_versions (
                id, classifier_version, embedding_model, llm_version,
                threshold_hi, threshold_ta, threshold_kn, threshold_en, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(version.id)
        .bind(&version.classifier_version)
        .bind(&version.embedding_model)
        .bind(&version.llm_version)
        .bind(version.thresholds.hi)
        .bind(version.thresholds.ta)
        .bind(version.thresholds.kn)
        .bind(version.thresholds.en)
        .bind(version.is_active as i64)
        .bind(version.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(())
    }

    async fn active(&self) -> Result<ModelVersion> {
        let row = sqlx::query("SELECT * FROM model_versions WHERE is_active = 1 LIMIT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(ModelVersion {
            id: row.get("id"),
            classifier_version: row.get("classifier_version"),
            embedding_model: row.get("embedding_model"),
            llm_version: row.get("llm_version"),
            thresholds: LanguageThresholds {
                hi: row.get("threshold_hi"),
                ta: row.get("threshold_ta"),
                kn: row.get("threshold_kn"),
                en: row.get("threshold_en"),
            },
            is_active: row.get::<i64, _>("is_active") != 0,
            created_at: row.get("created_at"),
        })
    }

    async fn activate(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from)?;
        sqlx::query("UPDATE model_versions SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        let result = sqlx::query("UPDATE model_versions SET is_active = 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from)?;
        if result.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(CoreError::NotFound {
                what: format!("model version {id}"),
            });
        }
        tx.commit().await.map_err(CoreError::from)?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SqlitePersistence {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, username, role, verified) VALUES (?1, ?2, ?3, ?4)")
            .bind(user.id)
            .bind(&user.username)
            .bind(user.role.as_str())
            .bind(user.verified as i64)
            .execute(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::from)?;
        row_to_user(&row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::from)?;
        row.as_ref().map(row_to_user).transpose()
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_raw: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        role: Role::parse(&role_raw).ok_or_else(|| CoreError::IntegrityError {
            message: format!("unknown role in row: {role_raw}"),
        })?,
        verified: row.get::<i64, _>("verified") != 0,
    })
}

#[async_trait]
impl AuditStore for SqlitePersistence {
    async fn insert(&self, row: &AuditLogRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, event_type, payload, signature, key_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(row.id)
        .bind(&row.event_type)
        .bind(serde_json::to_string(&row.payload).unwrap_or_default())
        .bind(&row.signature)
        .bind(&row.key_id)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::from)?;
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<AuditLogRow>> {
        let row = sqlx::query("SELECT * FROM audit_log WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(row.map(|row| row_to_audit_log(&row)))
    }

    async fn list(&self, event_type: Option<&str>, limit: i64, offset: i64) -> Result<Vec<AuditLogRow>> {
        let rows = match event_type {
            Some(event_type) => sqlx::query(
                "SELECT * FROM audit_log WHERE event_type = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
            )
            .bind(event_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query("SELECT * FROM audit_log ORDER BY created_at DESC LIMIT ?1 OFFSET ?2")
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(CoreError::from)?;
        Ok(rows.iter().map(row_to_audit_log).collect())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audit_log WHERE created_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(CoreError::from)?;
        Ok(result.rows_affected())
    }
}

fn row_to_audit_log(row: &sqlx::sqlite::SqliteRow) -> AuditLogRow {
    let payload_raw: String = row.get("payload");
    AuditLogRow {
        id: row.get("id"),
        event_type: row.get("event_type"),
        payload: serde_json::from_str(&payload_raw).unwrap_or(Value::Null),
        signature: row.get("signature"),
        key_id: row.get("key_id"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn db() -> SqlitePersistence {
        SqlitePersistence::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn round_trips_crawled_item() {
        let db = db().await;
        let item = CrawledItem::new_enriched(
            "https://example.com/offer".to_string(),
            "example.com".to_string(),
            None,
            None,
            "limited time offer".to_string(),
            Language::En,
            0.98,
            false,
            42.0,
            vec!["abc123".to_string()],
            json!({"age_days": 5}),
            json!({}),
        );
        db.insert_item(&item).await.unwrap();
        let fetched = db.get_item(item.id).await.unwrap();
        assert_eq!(fetched.url, item.url);
        assert_eq!(fetched.label, Label::Pending);
        assert_eq!(fetched.image_hashes, vec!["abc123".to_string()]);
    }

    #[tokio::test]
    async fn review_queue_cas_rejects_stale_expected_status() {
        let db = db().await;
        let doc_id = Uuid::new_v4();
        let entry = ReviewQueueEntry {
            id: Uuid::new_v4(),
            doc_id,
            assigned_to: None,
            status: ReviewStatus::Pending,
            priority: 1,
            note: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        db.enqueue(&entry).await.unwrap();

        let mut claimed = entry.clone();
        claimed.status = ReviewStatus::InReview;
        claimed.assigned_to = Some(Uuid::new_v4());
        let first = db
            .compare_and_set_status(entry.id, ReviewStatus::Pending, &claimed)
            .await
            .unwrap();
        assert!(first);

        let second = db
            .compare_and_set_status(entry.id, ReviewStatus::Pending, &claimed)
            .await
            .unwrap();
        assert!(!second, "second claim against a stale expected status must fail");
    }

    #[tokio::test]
    async fn model_version_activation_is_exclusive() {
        let db = db().await;
        let first = ModelVersion::new("v1".to_string(), "embed-v1".to_string(), "llm-v1".to_string());
        let second = ModelVersion::new("v2".to_string(), "embed-v1".to_string(), "llm-v1".to_string());
        db.insert_version(&first).await.unwrap();
        db.insert_version(&second).await.unwrap();
        db.activate(first.id).await.unwrap();
        db.activate(second.id).await.unwrap();
        let active = db.active().await.unwrap();
        assert_eq!(active.id, second.id);
    }
}
