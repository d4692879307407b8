use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// A persisted, tamper-evident event record (`spec.md` §3, §4.2).
///
/// `signature` is `HMAC_SHA256(key, canonical_json(payload))`, hex-encoded.
/// `payload` is written once at [`crate::audit::AuditLog::append`] and never
/// updated afterwards.
#[derive(Debug, Clone)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub signature: String,
    /// Reserved for a future key-rotation scheme (`spec.md` §9 open
    /// question). The current key is process-wide and unversioned, so this
    /// is always `None` today — see `SPEC_FULL.md` §4.2 for the rationale.
    pub key_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
