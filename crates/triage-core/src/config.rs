//! Environment-driven configuration (`spec.md` §6), resolved the way
//! `weavegraph::runtimes::RuntimeConfig::resolve_sqlite_db_name` resolves
//! its settings: an explicit value wins, otherwise fall back to `.env` /
//! the process environment, otherwise a hardcoded default.

use crate::error::{CoreError, Result};

/// Every externally-tunable knob the pipeline needs to run. Constructed
/// once at process start and shared behind an `Arc` via
/// [`crate::runtime::TriageRuntime`].
#[derive(Clone, Debug)]
pub struct TriageConfig {
    pub database_url: String,
    pub broker_url: String,
    pub vector_index_path: String,
    pub llm_primary_url: String,
    pub llm_secondary_url: Option<String>,
    pub embedding_model: String,
    pub hmac_key: Vec<u8>,
}

impl TriageConfig {
    fn resolve(key: &str, default: &str) -> String {
        std::env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Load from `.env` (if present) and the process environment.
    /// `HMAC_KEY` must decode to at least 32 bytes (`spec.md` §6); anything
    /// shorter is an invalid deployment, not a recoverable condition.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let hmac_key_raw = std::env::var("HMAC_KEY").map_err(|_| CoreError::InvalidInput {
            message: "HMAC_KEY is required".to_string(),
        })?;
        let hmac_key = hmac_key_raw.into_bytes();
        if hmac_key.len() < 32 {
            return Err(CoreError::InvalidInput {
                message: format!("HMAC_KEY must be at least 32 bytes, got {}", hmac_key.len()),
            });
        }

        Ok(Self {
            database_url: Self::resolve("DATABASE_URL", "sqlite://triage.db"),
            broker_url: Self::resolve("BROKER_URL", "sqlite://triage_broker.db"),
            vector_index_path: Self::resolve("VECTOR_INDEX_PATH", "sqlite://triage_vectors.db"),
            llm_primary_url: Self::resolve("LLM_PRIMARY_URL", "http://localhost:11434"),
            llm_secondary_url: std::env::var("LLM_SECONDARY_URL").ok(),
            embedding_model: Self::resolve("EMBEDDING_MODEL", "nomic-embed-text"),
            hmac_key,
        })
    }

    /// Construct directly from values, bypassing the environment — used by
    /// integration tests that want a `tempfile`-backed database without
    /// touching process-global env vars.
    pub fn for_test(database_url: String) -> Self {
        Self {
            database_url,
            broker_url: "sqlite::memory:".to_string(),
            vector_index_path: "sqlite::memory:".to_string(),
            llm_primary_url: "http://localhost:11434".to_string(),
            llm_secondary_url: None,
            embedding_model: "nomic-embed-text".to_string(),
            hmac_key: b"0123456789abcdef0123456789abcdef".to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_test_produces_a_usable_key() {
        let config = TriageConfig::for_test("sqlite::memory:".to_string());
        assert!(config.hmac_key.len() >= 32);
    }
}
