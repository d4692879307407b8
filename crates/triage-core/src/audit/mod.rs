//! Tamper-evident audit log (C2, `spec.md` §4.2).

mod canonical;

pub use canonical::canonical_json;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ring::hmac;
use serde_json::Value;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::domain::AuditLogRow;
use crate::error::{CoreError, Result};

/// Storage seam for audit rows, implemented by `persistence::sqlite` and
/// swappable in tests. Kept narrow (CRUD on one table) rather than folded
/// into the general [`crate::persistence::Repository`] so the audit log can
/// be constructed and unit-tested without the rest of the schema.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, row: &AuditLogRow) -> Result<()>;
    async fn fetch(&self, id: Uuid) -> Result<Option<AuditLogRow>>;
    async fn list(
        &self,
        event_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogRow>>;
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// A single process-wide symmetric key (`spec.md` §4.2). Rotation
/// invalidates prior signatures — a documented compliance trade-off, not a
/// bug; see `SPEC_FULL.md` §9 item 6 for the key-id follow-up that was
/// deliberately *not* built.
#[derive(Clone)]
pub struct HmacKey(Arc<hmac::Key>);

impl HmacKey {
    /// `spec.md` §6 requires `HMAC_KEY` to be at least 32 bytes.
    pub fn new(key_bytes: &[u8]) -> Self {
        Self(Arc::new(hmac::Key::new(hmac::HMAC_SHA256, key_bytes)))
    }

    fn sign_hex(&self, canonical: &str) -> String {
        let tag = hmac::sign(&self.0, canonical.as_bytes());
        hex::encode(tag.as_ref())
    }

    fn verify(&self, canonical: &str, signature_hex: &str) -> bool {
        let Ok(expected) = hex::decode(signature_hex) else {
            return false;
        };
        hmac::verify(&self.0, canonical.as_bytes(), &expected).is_ok()
    }
}

/// `append`/`verify`/`list`/`purge` contract from `spec.md` §4.2.
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    key: HmacKey,
}

impl AuditLog {
    pub fn new(store: Arc<dyn AuditStore>, key: HmacKey) -> Self {
        Self { store, key }
    }

    /// Sign and persist `payload` under `event_type`, returning the new
    /// row's id.
    ///
    /// Per `spec.md` §4.3/§7, append failures must never abort the calling
    /// operation — callers should treat an `Err` here as health
    /// degradation, log it, and continue. This method itself still returns
    /// the error so the caller can decide exactly that; it is the caller's
    /// job (queue consumers, `CheckPipeline`) not to propagate it further.
    #[instrument(skip(self, payload))]
    pub async fn append(&self, event_type: &str, payload: Value) -> Result<Uuid> {
        let canonical = canonical_json(&payload);
        let signature = self.key.sign_hex(&canonical);
        let row = AuditLogRow {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            payload,
            signature,
            key_id: None,
            created_at: Utc::now(),
        };
        let id = row.id;
        if let Err(err) = self.store.insert(&row).await {
            error!(event_type, error = %err, "audit append failed");
            return Err(err);
        }
        Ok(id)
    }

    /// Best-effort variant used by call sites that must never fail even if
    /// the audit store is unreachable (`spec.md` §7: "Audit-log write
    /// failures are silent and never propagate").
    pub async fn append_best_effort(&self, event_type: &str, payload: Value) {
        if let Err(err) = self.append(event_type, payload).await {
            warn!(event_type, error = %err, "audit append degraded, continuing without audit record");
        }
    }

    /// Recompute the signature for `id` and compare with constant-time
    /// equality (delegated to `ring`'s `hmac::verify`).
    #[instrument(skip(self))]
    pub async fn verify(&self, id: Uuid) -> Result<bool> {
        let Some(row) = self.store.fetch(id).await? else {
            return Err(CoreError::NotFound {
                what: format!("audit log {id}"),
            });
        };
        let canonical = canonical_json(&row.payload);
        Ok(self.key.verify(&canonical, &row.signature))
    }

    pub async fn list(
        &self,
        event_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogRow>> {
        self.store.list(event_type, limit, offset).await
    }

    /// Delete rows older than `days`.
    pub async fn purge(&self, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        self.store.delete_older_than(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<AuditLogRow>>,
    }

    #[async_trait]
    impl AuditStore for MemoryStore {
        async fn insert(&self, row: &AuditLogRow) -> Result<()> {
            self.rows.lock().push(row.clone());
            Ok(())
        }

        async fn fetch(&self, id: Uuid) -> Result<Option<AuditLogRow>> {
            Ok(self.rows.lock().iter().find(|r| r.id == id).cloned())
        }

        async fn list(
            &self,
            event_type: Option<&str>,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<AuditLogRow>> {
            let rows = self.rows.lock();
            let mut matching: Vec<AuditLogRow> = rows
                .iter()
                .filter(|r| event_type.is_none_or(|t| r.event_type == t))
                .cloned()
                .collect();
            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(matching
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            let mut rows = self.rows.lock();
            let before = rows.len();
            rows.retain(|r| r.created_at >= cutoff);
            Ok((before - rows.len()) as u64)
        }
    }

    fn log_with_store() -> (AuditLog, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let log = AuditLog::new(store.clone(), HmacKey::new(b"0123456789abcdef0123456789abcdef"));
        (log, store)
    }

    fn log() -> AuditLog {
        log_with_store().0
    }

    #[tokio::test]
    async fn verify_round_trips_for_arbitrary_payload() {
        let log = log();
        let id = log
            .append("x", json!({"claim": "तत्काल ₹1000 भेजें", "n": 1}))
            .await
            .unwrap();
        assert!(log.verify(id).await.unwrap());
    }

    #[tokio::test]
    async fn tampering_is_detected() {
        let (log, store) = log_with_store();
        let id = log.append("x", json!({"a": 1})).await.unwrap();
        for row in store.rows.lock().iter_mut() {
            if row.id == id {
                row.payload = json!({"a": 2});
            }
        }
        assert!(!log.verify(id).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_reverse_chronological() {
        let log = log();
        let first = log.append("check", json!({"n": 1})).await.unwrap();
        let second = log.append("check", json!({"n": 2})).await.unwrap();
        let rows = log.list(Some("check"), 10, 0).await.unwrap();
        assert_eq!(rows[0].id, second);
        assert_eq!(rows[1].id, first);
    }
}
