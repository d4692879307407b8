//! `spec.md` §4.6 "provider switch" / §5's literal wording: "a process-wide
//! state behind a mutex; switching is rare and idempotent." One permanent,
//! one-way swap from primary to secondary on the first observed failure —
//! not a retry-per-call policy.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::llm::LlmProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderHandle {
    Primary,
    Secondary,
}

impl ProviderHandle {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderHandle::Primary => "primary",
            ProviderHandle::Secondary => "secondary",
        }
    }
}

/// Selects between a primary and secondary [`LlmProvider`]. Probes the
/// primary once at construction; after that, only an explicit
/// [`FailoverSelector::mark_primary_failed`] call moves the active handle,
/// and the move never reverts within the process.
pub struct FailoverSelector {
    primary: Arc<dyn LlmProvider>,
    secondary: Arc<dyn LlmProvider>,
    active: Mutex<ProviderHandle>,
}

impl FailoverSelector {
    /// Probes `primary` with [`LlmProvider::available`]; starts on
    /// `Secondary` if the probe fails.
    pub async fn new(primary: Arc<dyn LlmProvider>, secondary: Arc<dyn LlmProvider>) -> Self {
        let starting = if primary.available().await {
            ProviderHandle::Primary
        } else {
            warn!("primary llm provider unavailable at startup, starting on secondary");
            ProviderHandle::Secondary
        };
        Self {
            primary,
            secondary,
            active: Mutex::new(starting),
        }
    }

    pub fn active_handle(&self) -> ProviderHandle {
        *self.active.lock()
    }

    pub fn active(&self) -> Arc<dyn LlmProvider> {
        match self.active_handle() {
            ProviderHandle::Primary => self.primary.clone(),
            ProviderHandle::Secondary => self.secondary.clone(),
        }
    }

    /// Permanently routes to the secondary provider. Idempotent: if the
    /// switch already happened, returns `false` and does nothing further
    /// (used by callers to decide whether to emit a fresh `provider:switch`
    /// audit event).
    pub fn mark_primary_failed(&self) -> bool {
        let mut active = self.active.lock();
        if *active == ProviderHandle::Secondary {
            return false;
        }
        *active = ProviderHandle::Secondary;
        info!("llm provider switched from primary to secondary");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use triage_core::domain::Language;

    use crate::error::Result;
    use crate::verdict::{EvidenceItem, MiniLesson, StructuredVerdict, Verdict};

    struct StubProvider {
        available: bool,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn verdict(&self, _: &str, _: Language, _: &[EvidenceItem]) -> Result<StructuredVerdict> {
            Ok(StructuredVerdict::fallback())
        }

        async fn lesson(&self, _: &str, _: Verdict, _: Language, _: &[EvidenceItem]) -> Result<MiniLesson> {
            Ok(MiniLesson::fallback())
        }

        async fn available(&self) -> bool {
            self.available
        }
    }

    #[tokio::test]
    async fn starts_on_primary_when_available() {
        let selector = FailoverSelector::new(
            Arc::new(StubProvider { available: true }),
            Arc::new(StubProvider { available: true }),
        )
        .await;
        assert_eq!(selector.active_handle(), ProviderHandle::Primary);
    }

    #[tokio::test]
    async fn starts_on_secondary_when_primary_probe_fails() {
        let selector = FailoverSelector::new(
            Arc::new(StubProvider { available: false }),
            Arc::new(StubProvider { available: true }),
        )
        .await;
        assert_eq!(selector.active_handle(), ProviderHandle::Secondary);
    }

    #[tokio::test]
    async fn switch_is_permanent_and_idempotent() {
        let selector = FailoverSelector::new(
            Arc::new(StubProvider { available: true }),
            Arc::new(StubProvider { available: true }),
        )
        .await;
        assert!(selector.mark_primary_failed());
        assert_eq!(selector.active_handle(), ProviderHandle::Secondary);
        assert!(!selector.mark_primary_failed());
        assert_eq!(selector.active_handle(), ProviderHandle::Secondary);
    }
}
