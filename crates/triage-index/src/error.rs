use miette::Diagnostic;
use thiserror::Error;
use triage_core::{Classify, ErrorKind};

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("invalid input: {message}")]
    #[diagnostic(code(triage::index::invalid_input))]
    InvalidInput { message: String },

    #[error("not found: {what}")]
    #[diagnostic(code(triage::index::not_found))]
    NotFound { what: String },

    #[error("vector store unavailable: {message}")]
    #[diagnostic(code(triage::index::dependency_unavailable))]
    DependencyUnavailable { message: String },

    #[error("vector store integrity error: {message}")]
    #[diagnostic(code(triage::index::integrity))]
    IntegrityError { message: String },
}

impl Classify for IndexError {
    fn kind(&self) -> ErrorKind {
        match self {
            IndexError::InvalidInput { .. } => ErrorKind::InvalidInput,
            IndexError::NotFound { .. } => ErrorKind::NotFound,
            IndexError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            IndexError::IntegrityError { .. } => ErrorKind::IntegrityError,
        }
    }
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => IndexError::NotFound {
                what: "vector row not found".to_string(),
            },
            other => IndexError::IntegrityError {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
