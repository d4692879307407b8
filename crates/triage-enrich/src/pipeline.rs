//! Stage/executor pair grounded on `wg_bastion::pipeline` (`GuardrailStage`,
//! `PipelineExecutor`, degradable-error semantics) — adapted from "evaluate
//! `Content`, return a block/allow decision" to "mutate an
//! [`EnrichmentContext`] in place, return nothing but an error".
//!
//! Steps 1-8 of `spec.md` §4.4 are each a `Stage`; steps 9-11 (persist,
//! forward, ack) belong to [`crate::consumer::EnrichmentConsumer`], not
//! this module, since only step 9's failure is message-fatal.

use async_trait::async_trait;
use tracing::{error, warn};

use crate::context::EnrichmentContext;
use crate::error::EnrichError;

/// One step of the enrichment algorithm.
#[async_trait]
pub trait Stage: Send + Sync {
    fn id(&self) -> &str;

    /// Steps 2-8 are best-effort per `spec.md` §4.4 "Failure semantics":
    /// a degradable stage's error is logged and the pipeline continues
    /// with whatever the context held before this stage ran. Defaults to
    /// `true` since every step this pipeline currently runs is advisory to
    /// the final score, not fatal to the document.
    fn degradable(&self) -> bool {
        true
    }

    async fn run(&self, ctx: &mut EnrichmentContext) -> Result<(), EnrichError>;
}

/// Outcome of a full pass over the stage list.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub degraded_stages: Vec<String>,
}

/// Runs stages in the fixed order they were registered — unlike
/// `wg_bastion::pipeline::PipelineExecutor`, ordering here is the
/// algorithm itself (step 2 depends on step 1's output, step 8 on nearly
/// everything before it), not a priority to sort by.
pub struct PipelineExecutor {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineExecutor {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub async fn run(&self, ctx: &mut EnrichmentContext) -> Result<PipelineReport, EnrichError> {
        let mut report = PipelineReport::default();
        for stage in &self.stages {
            match stage.run(ctx).await {
                Ok(()) => {}
                Err(err) if stage.degradable() => {
                    warn!(stage = stage.id(), error = %err, "enrichment stage degraded, continuing");
                    report.degraded_stages.push(stage.id().to_string());
                }
                Err(err) => {
                    error!(stage = stage.id(), error = %err, "enrichment stage failed fatally");
                    return Err(err);
                }
            }
        }
        Ok(report)
    }
}
