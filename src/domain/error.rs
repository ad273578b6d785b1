use thiserror::Error;

/// Errors raised by pure domain rules, before any storage is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("invalid input: {message}")]
    Validation { message: String },
    #[error("operation not permitted: {message}")]
    Invariant { message: String },
    #[error("only the author may {action}")]
    NotAuthor { action: &'static str },
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    pub fn not_author(action: &'static str) -> Self {
        Self::NotAuthor { action }
    }
}
