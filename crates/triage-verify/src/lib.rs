//! Classification & routing (C5) and the synchronous check pipeline (C6),
//! with LLM provider failover (`spec.md` §4.5, §4.6).
//!
//! This crate sits above `triage-core`, `triage-index`, and `triage-enrich`
//! the way `wg-bastion::pipeline` sits above `wg-bastion::input` — it
//! composes capabilities (`Classifier`, `Embedder`, `LlmProvider`) the
//! consumer loop and the `/api/check` handler inject, rather than owning
//! any storage itself.

pub mod check;
pub mod classifier;
pub mod consumer;
pub mod embedder;
pub mod error;
pub mod failover;
pub mod llm;
pub mod prompts;
pub mod routing;
pub mod tolerant_json;
pub mod verdict;

pub use check::{CheckPipeline, CheckRequest, CheckResponse, LanguageOrAuto};
pub use consumer::ClassificationConsumer;
pub use classifier::{Classifier, OllamaClassifier};
pub use embedder::{Embedder, OllamaEmbedder};
pub use error::{Result, VerifyError};
pub use failover::{FailoverSelector, ProviderHandle};
pub use llm::{CloudLlmProvider, LlmProvider, OllamaLlmProvider};
pub use routing::{ClassificationService, RoutingOutcome};
pub use verdict::{EvidenceItem, MiniLesson, Quiz, StructuredVerdict, Verdict};
