//! Property-based tests for invariants `spec.md` §8 and `SPEC_FULL.md` §8
//! call out by name rather than by example: the audit log's HMAC
//! round-trip and idempotent re-enrichment by URL.
//!
//! Grounded on the `EffortlessMetrics-shipper::shipper::property_tests`
//! idiom: a dedicated `#[cfg(test)] mod` wrapping `proptest!` blocks
//! separately from the unit tests living next to the code they exercise.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::audit::{canonical_json, AuditLog, AuditStore, HmacKey};
use crate::domain::{AuditLogRow, CrawledItem, Language};
use crate::error::Result;
use crate::persistence::{CrawledItemRepository, SqlitePersistence};

fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _₹@.]{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

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

    async fn list(&self, _event_type: Option<&str>, _limit: i64, _offset: i64) -> Result<Vec<AuditLogRow>> {
        Ok(Vec::new())
    }

    async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
        Ok(0)
    }
}

proptest! {
    /// `spec.md` §4.2: `verify(append(p))` is true for arbitrary payloads,
    /// regardless of nesting, key order, or embedded non-ASCII text.
    #[test]
    fn hmac_round_trips_for_arbitrary_payloads(value in json_value_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let log = AuditLog::new(
                Arc::new(MemoryStore::default()),
                HmacKey::new(b"0123456789abcdef0123456789abcdef"),
            );
            let id = log.append("property_test", value).await.unwrap();
            prop_assert!(log.verify(id).await.unwrap());
            Ok(())
        })?;
    }

    /// Canonicalization is idempotent: sorting an already-sorted tree is a
    /// no-op, so re-signing a re-fetched row never drifts.
    #[test]
    fn canonical_json_is_idempotent(value in json_value_strategy()) {
        let once = canonical_json(&value);
        let parsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonical_json(&parsed);
        prop_assert_eq!(once, twice);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// `SPEC_FULL.md` §8: "idempotent re-enrichment by URL" — after two
    /// `upsert_by_url` passes over the same URL with different content, the
    /// row's id is unchanged and its content reflects the second pass.
    #[test]
    fn upsert_by_url_keeps_the_same_id_across_passes(
        first_text in "[a-z ]{1,40}",
        second_text in "[a-z ]{1,40}",
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let db = SqlitePersistence::connect("sqlite::memory:").await.unwrap();
            let url = "https://example.test/proptest-item".to_string();

            let first = CrawledItem::new_enriched(
                url.clone(), "example.test".into(), None, None, first_text,
                Language::En, 0.5, false, 0.0, Vec::new(), json!({}), json!({}),
            );
            let persisted_first = db.upsert_by_url(&first).await.unwrap();

            let second = CrawledItem::new_enriched(
                url.clone(), "example.test".into(), None, None, second_text.clone(),
                Language::En, 0.5, false, 0.0, Vec::new(), json!({}), json!({}),
            );
            let persisted_second = db.upsert_by_url(&second).await.unwrap();

            prop_assert_eq!(persisted_first.id, persisted_second.id);
            prop_assert_eq!(persisted_second.clean_text, second_text);
            Ok(())
        })?;
    }
}
