//! Explicit dependency injection for the pipeline (`SPEC_FULL.md` §9: ambient
//! DI over a global registry). Every stage takes a `&TriageRuntime` rather
//! than reaching for a singleton, the same way `weavegraph::app::App` threads
//! one `RuntimeConfig` through the graph instead of each node resolving its
//! own config.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::audit::{AuditLog, HmacKey};
use crate::config::TriageConfig;
use crate::domain::ModelVersion;
use crate::error::Result;
use crate::event_bus::EventBus;
use crate::fabric::{Broker, SqliteBroker};
use crate::persistence::SqlitePersistence;

/// Shared handles every crate in the workspace is constructed from. Cloning
/// is cheap — every field is an `Arc` or a small value type.
#[derive(Clone)]
pub struct TriageRuntime {
    pub config: TriageConfig,
    pub persistence: Arc<SqlitePersistence>,
    pub broker: Arc<dyn Broker>,
    pub audit: Arc<AuditLog>,
    pub events: Arc<EventBus>,
    active_model_version: Arc<RwLock<ModelVersion>>,
}

impl TriageRuntime {
    pub async fn connect(config: TriageConfig) -> Result<Self> {
        let persistence = Arc::new(SqlitePersistence::connect(&config.database_url).await?);
        let broker = Arc::new(SqliteBroker::connect(&config.broker_url).await?) as Arc<dyn Broker>;
        let audit = Arc::new(AuditLog::new(persistence.clone(), HmacKey::new(&config.hmac_key)));
        let events = Arc::new(EventBus::new());

        use crate::persistence::ModelVersionRepository;
        let active_model_version = match persistence.active().await {
            Ok(version) => version,
            Err(_) => {
                let default_version = ModelVersion::new(
                    "heuristic-v1".to_string(),
                    config.embedding_model.clone(),
                    "none".to_string(),
                );
                persistence.insert_version(&default_version).await?;
                persistence.activate(default_version.id).await?;
                default_version
            }
        };

        Ok(Self {
            config,
            persistence,
            broker,
            audit,
            events,
            active_model_version: Arc::new(RwLock::new(active_model_version)),
        })
    }

    pub fn active_model_version(&self) -> ModelVersion {
        self.active_model_version.read().clone()
    }

    /// Swap the cached active [`ModelVersion`] after
    /// [`crate::persistence::ModelVersionRepository::activate`] commits, so
    /// in-flight stages pick up the new thresholds without re-querying the
    /// database on every document.
    pub fn set_active_model_version(&self, version: ModelVersion) {
        *self.active_model_version.write() = version;
    }
}
