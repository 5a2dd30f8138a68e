use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::application::theme::compilation::CompilationError;

#[derive(Debug, Error)]
pub enum ThemeConfigError {
    #[error("theme `{0}` not found")]
    ThemeNotFound(String),
    #[error("base theme `{name}` is not installed")]
    BaseThemeNotFound { name: String },
    #[error("no manifest is installed for theme `{name}`")]
    ManifestNotFound { name: String },
    #[error(transparent)]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ThemeConfigError {
    pub fn theme_not_found(id: Uuid) -> Self {
        Self::ThemeNotFound(id.to_string())
    }

    pub fn base_theme_not_found(name: impl Into<String>) -> Self {
        Self::BaseThemeNotFound { name: name.into() }
    }

    pub fn manifest_not_found(name: impl Into<String>) -> Self {
        Self::ManifestNotFound { name: name.into() }
    }
}
