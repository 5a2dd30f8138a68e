//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{RuntimeConfigRecord, ThemeRecord};
use crate::domain::theme_config::ThemeManifest;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("stored value could not be decoded: {message}")]
    Decode { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Read access to theme descriptors.
#[async_trait]
pub trait ThemesRepo: Send + Sync {
    /// Every theme known to the platform, used to resolve ancestor chains.
    async fn list_themes(&self) -> Result<Vec<ThemeRecord>, RepoError>;
}

/// Read access to the declared bundles of real themes.
#[async_trait]
pub trait ThemeManifestRepo: Send + Sync {
    async fn find_manifest(&self, technical_name: &str)
    -> Result<Option<ThemeManifest>, RepoError>;

    async fn list_manifests(&self) -> Result<Vec<ThemeManifest>, RepoError>;
}

/// Durable storage of precomputed runtime configuration.
///
/// Absence is `Ok(None)`; only infrastructure failures are errors.
#[async_trait]
pub trait RuntimeConfigRepo: Send + Sync {
    async fn find_by_id(&self, theme_id: Uuid) -> Result<Option<RuntimeConfigRecord>, RepoError>;

    async fn find_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<RuntimeConfigRecord>, RepoError>;

    /// Replaces the whole stored record for `record.theme_id`.
    async fn upsert(&self, record: &RuntimeConfigRecord) -> Result<(), RepoError>;

    /// Direct copies of a theme: unnamed themes whose parent is `theme_id`.
    async fn list_copy_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError>;

    /// Transitive descendants in breadth-first order, each at most once.
    async fn list_child_theme_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError>;

    /// The theme's own technical name, or its parent's for an unnamed copy.
    async fn theme_technical_name(&self, theme_id: Uuid) -> Result<Option<String>, RepoError>;

    async fn theme_id_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<Uuid>, RepoError>;

    /// Distinct technical names that have a persisted runtime config.
    async fn list_active_theme_names(&self) -> Result<Vec<String>, RepoError>;
}
