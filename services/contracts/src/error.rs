use thiserror::Error;

/// Failure taxonomy shared by the inspection services.
///
/// `NotFound` and `Validation` are client-facing and carry their message to
/// the caller. `Unexpected` wraps any remote-call or parsing failure; callers
/// log the detail and surface a generic failure only.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
