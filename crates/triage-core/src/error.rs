//! Shared error vocabulary for the triage pipeline.
//!
//! Every crate in the workspace defines its own `thiserror` enum for the
//! specifics of its component, but all of them report one of the five kinds
//! below so callers (queue consumers, RPC handlers) can decide ack/nack and
//! HTTP status without matching on crate-specific variants.

use miette::Diagnostic;
use thiserror::Error;

/// The caller-facing classification of a failure.
///
/// See `spec.md` §7. `InvalidInput` and `NotFound` and `Conflict` are 4xx;
/// `DependencyUnavailable` only surfaces as 5xx when no fallback exists;
/// `IntegrityError` is always 5xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    DependencyUnavailable,
    IntegrityError,
}

/// Implemented by every crate-local error enum so the message-loop boundary
/// can decide ack/nack/HTTP-status generically.
pub trait Classify {
    fn kind(&self) -> ErrorKind;

    /// Errors in this kind are expected to recover on retry without a code
    /// change (e.g. a transient broker/LLM/vector-index outage).
    fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::DependencyUnavailable)
    }
}

/// Error surface shared by persistence, the message fabric, and the audit
/// log — the pieces every other crate in the workspace depends on.
#[derive(Debug, Error, Diagnostic)]
pub enum CoreError {
    #[error("invalid input: {message}")]
    #[diagnostic(code(triage::core::invalid_input))]
    InvalidInput { message: String },

    #[error("not found: {what}")]
    #[diagnostic(code(triage::core::not_found))]
    NotFound { what: String },

    #[error("conflict: {message}")]
    #[diagnostic(code(triage::core::conflict))]
    Conflict { message: String },

    #[error("dependency unavailable: {message}")]
    #[diagnostic(code(triage::core::dependency_unavailable))]
    DependencyUnavailable { message: String },

    #[error("integrity error: {message}")]
    #[diagnostic(code(triage::core::integrity))]
    IntegrityError { message: String },
}

impl Classify for CoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput { .. } => ErrorKind::InvalidInput,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict { .. } => ErrorKind::Conflict,
            CoreError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            CoreError::IntegrityError { .. } => ErrorKind::IntegrityError,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoreError::NotFound {
                what: "row not found".to_string(),
            },
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                CoreError::Conflict {
                    message: db_err.to_string(),
                }
            }
            other => CoreError::IntegrityError {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
