use thiserror::Error;

use crate::{
    application::theme::ThemeConfigError, domain::error::DomainError, infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Theme(#[from] ThemeConfigError),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status reported by the binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Validation(_)
            | AppError::Infra(InfraError::Configuration { .. }) => 2,
            AppError::NotFound(_)
            | AppError::Theme(
                ThemeConfigError::ThemeNotFound(_) | ThemeConfigError::ManifestNotFound { .. },
            ) => 3,
            AppError::Theme(ThemeConfigError::Compilation(_)) => 4,
            AppError::Theme(_) | AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}
