use miette::Diagnostic;
use thiserror::Error;
use triage_core::{Classify, ErrorKind};

#[derive(Debug, Error, Diagnostic)]
pub enum EnrichError {
    #[error("invalid input: {message}")]
    #[diagnostic(code(triage::enrich::invalid_input))]
    InvalidInput { message: String },

    #[error("enrichment dependency unavailable: {message}")]
    #[diagnostic(code(triage::enrich::dependency_unavailable))]
    DependencyUnavailable { message: String },

    #[error("enrichment integrity error: {message}")]
    #[diagnostic(code(triage::enrich::integrity))]
    IntegrityError { message: String },
}

impl Classify for EnrichError {
    fn kind(&self) -> ErrorKind {
        match self {
            EnrichError::InvalidInput { .. } => ErrorKind::InvalidInput,
            EnrichError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            EnrichError::IntegrityError { .. } => ErrorKind::IntegrityError,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
