use miette::Diagnostic;
use thiserror::Error;
use triage_core::{Classify, ErrorKind};

#[derive(Debug, Error, Diagnostic)]
pub enum VerifyError {
    #[error("invalid input: {message}")]
    #[diagnostic(code(triage::verify::invalid_input))]
    InvalidInput { message: String },

    #[error("not found: {what}")]
    #[diagnostic(code(triage::verify::not_found))]
    NotFound { what: String },

    #[error("verification dependency unavailable: {message}")]
    #[diagnostic(code(triage::verify::dependency_unavailable))]
    DependencyUnavailable { message: String },

    #[error("verification integrity error: {message}")]
    #[diagnostic(code(triage::verify::integrity))]
    IntegrityError { message: String },
}

impl Classify for VerifyError {
    fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::InvalidInput { .. } => ErrorKind::InvalidInput,
            VerifyError::NotFound { .. } => ErrorKind::NotFound,
            VerifyError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            VerifyError::IntegrityError { .. } => ErrorKind::IntegrityError,
        }
    }
}

impl From<triage_core::CoreError> for VerifyError {
    fn from(err: triage_core::CoreError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => VerifyError::NotFound {
                what: err.to_string(),
            },
            ErrorKind::InvalidInput => VerifyError::InvalidInput {
                message: err.to_string(),
            },
            _ => VerifyError::IntegrityError {
                message: err.to_string(),
            },
        }
    }
}

impl From<triage_index::IndexError> for VerifyError {
    fn from(err: triage_index::IndexError) -> Self {
        VerifyError::DependencyUnavailable {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
