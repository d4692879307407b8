use miette::Diagnostic;
use thiserror::Error;
use triage_core::{Classify, ErrorKind};

#[derive(Debug, Error, Diagnostic)]
pub enum ReviewError {
    #[error("invalid input: {message}")]
    #[diagnostic(code(triage::review::invalid_input))]
    InvalidInput { message: String },

    #[error("not found: {what}")]
    #[diagnostic(code(triage::review::not_found))]
    NotFound { what: String },

    /// `spec.md` §4.7: assigning an already-assigned entry, or acting on one
    /// whose status moved since the caller read it.
    #[error("conflict: {message}")]
    #[diagnostic(code(triage::review::conflict))]
    Conflict { message: String },

    #[error("review dependency unavailable: {message}")]
    #[diagnostic(code(triage::review::dependency_unavailable))]
    DependencyUnavailable { message: String },

    #[error("review integrity error: {message}")]
    #[diagnostic(code(triage::review::integrity))]
    IntegrityError { message: String },
}

impl Classify for ReviewError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ReviewError::NotFound { .. } => ErrorKind::NotFound,
            ReviewError::Conflict { .. } => ErrorKind::Conflict,
            ReviewError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            ReviewError::IntegrityError { .. } => ErrorKind::IntegrityError,
        }
    }
}

impl From<triage_core::CoreError> for ReviewError {
    fn from(err: triage_core::CoreError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ReviewError::NotFound {
                what: err.to_string(),
            },
            ErrorKind::InvalidInput => ReviewError::InvalidInput {
                message: err.to_string(),
            },
            ErrorKind::Conflict => ReviewError::Conflict {
                message: err.to_string(),
            },
            ErrorKind::DependencyUnavailable => ReviewError::DependencyUnavailable {
                message: err.to_string(),
            },
            ErrorKind::IntegrityError => ReviewError::IntegrityError {
                message: err.to_string(),
            },
        }
    }
}

impl From<triage_index::IndexError> for ReviewError {
    fn from(err: triage_index::IndexError) -> Self {
        ReviewError::DependencyUnavailable {
            message: err.to_string(),
        }
    }
}

impl From<triage_verify::VerifyError> for ReviewError {
    fn from(err: triage_verify::VerifyError) -> Self {
        ReviewError::DependencyUnavailable {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
