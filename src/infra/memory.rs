//! In-process implementation of every theme repository, for embedders and
//! tests that run without Postgres.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::application::repos::{RepoError, RuntimeConfigRepo, ThemeManifestRepo, ThemesRepo};
use crate::application::theme::graph::breadth_first_descendants;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{RuntimeConfigRecord, ThemeRecord};
use crate::domain::theme_config::ThemeManifest;

const SOURCE: &str = "infra::memory::InMemoryThemeStore";

#[derive(Default)]
pub struct InMemoryThemeStore {
    themes: RwLock<Vec<ThemeRecord>>,
    manifests: RwLock<IndexMap<String, ThemeManifest>>,
    runtime_configs: RwLock<HashMap<Uuid, RuntimeConfigRecord>>,
}

impl InMemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a theme, replacing any theme with the same id.
    pub fn insert_theme(&self, theme: ThemeRecord) {
        let mut themes = rw_write(&self.themes, SOURCE, "insert_theme");
        match themes.iter_mut().find(|existing| existing.id == theme.id) {
            Some(existing) => *existing = theme,
            None => themes.push(theme),
        }
    }

    /// Replaces the stored override values of a theme. Returns `false` when
    /// the theme is unknown.
    pub fn set_config_values(&self, theme_id: Uuid, values: IndexMap<String, Value>) -> bool {
        let mut themes = rw_write(&self.themes, SOURCE, "set_config_values");
        let Some(theme) = themes.iter_mut().find(|theme| theme.id == theme_id) else {
            return false;
        };
        theme.config_values = values;
        true
    }

    pub fn insert_manifest(&self, manifest: ThemeManifest) {
        rw_write(&self.manifests, SOURCE, "insert_manifest")
            .insert(manifest.technical_name.clone(), manifest);
    }

    fn theme(&self, theme_id: Uuid) -> Option<ThemeRecord> {
        rw_read(&self.themes, SOURCE, "theme")
            .iter()
            .find(|theme| theme.id == theme_id)
            .cloned()
    }
}

#[async_trait]
impl ThemesRepo for InMemoryThemeStore {
    async fn list_themes(&self) -> Result<Vec<ThemeRecord>, RepoError> {
        Ok(rw_read(&self.themes, SOURCE, "list_themes").clone())
    }
}

#[async_trait]
impl ThemeManifestRepo for InMemoryThemeStore {
    async fn find_manifest(
        &self,
        technical_name: &str,
    ) -> Result<Option<ThemeManifest>, RepoError> {
        Ok(rw_read(&self.manifests, SOURCE, "find_manifest")
            .get(technical_name)
            .cloned())
    }

    async fn list_manifests(&self) -> Result<Vec<ThemeManifest>, RepoError> {
        Ok(rw_read(&self.manifests, SOURCE, "list_manifests")
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RuntimeConfigRepo for InMemoryThemeStore {
    async fn find_by_id(&self, theme_id: Uuid) -> Result<Option<RuntimeConfigRecord>, RepoError> {
        Ok(rw_read(&self.runtime_configs, SOURCE, "find_by_id")
            .get(&theme_id)
            .cloned())
    }

    async fn find_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<RuntimeConfigRecord>, RepoError> {
        Ok(rw_read(&self.runtime_configs, SOURCE, "find_by_technical_name")
            .values()
            .filter(|record| record.technical_name.as_deref() == Some(technical_name))
            .max_by_key(|record| record.updated_at)
            .cloned())
    }

    async fn upsert(&self, record: &RuntimeConfigRecord) -> Result<(), RepoError> {
        if self.theme(record.theme_id).is_none() {
            return Err(RepoError::InvalidInput {
                message: format!("theme `{}` does not exist", record.theme_id),
            });
        }
        rw_write(&self.runtime_configs, SOURCE, "upsert").insert(record.theme_id, record.clone());
        Ok(())
    }

    async fn list_copy_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        Ok(rw_read(&self.themes, SOURCE, "list_copy_ids")
            .iter()
            .filter(|theme| theme.is_copy() && theme.parent_theme_id == Some(theme_id))
            .map(|theme| theme.id)
            .collect())
    }

    async fn list_child_theme_ids(&self, theme_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let edges: Vec<(Uuid, Uuid)> = rw_read(&self.themes, SOURCE, "list_child_theme_ids")
            .iter()
            .filter_map(|theme| theme.parent_theme_id.map(|parent| (parent, theme.id)))
            .collect();
        Ok(breadth_first_descendants(theme_id, &edges))
    }

    async fn theme_technical_name(&self, theme_id: Uuid) -> Result<Option<String>, RepoError> {
        let Some(theme) = self.theme(theme_id) else {
            return Ok(None);
        };
        if theme.technical_name.is_some() {
            return Ok(theme.technical_name);
        }
        Ok(theme
            .parent_theme_id
            .and_then(|parent_id| self.theme(parent_id))
            .and_then(|parent| parent.technical_name))
    }

    async fn theme_id_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<Uuid>, RepoError> {
        Ok(rw_read(&self.themes, SOURCE, "theme_id_by_technical_name")
            .iter()
            .find(|theme| theme.technical_name.as_deref() == Some(technical_name))
            .map(|theme| theme.id))
    }

    async fn list_active_theme_names(&self) -> Result<Vec<String>, RepoError> {
        let mut names: Vec<String> = rw_read(&self.runtime_configs, SOURCE, "list_active_theme_names")
            .values()
            .filter_map(|record| record.technical_name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
