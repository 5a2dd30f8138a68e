//! Orchestration of runtime configuration: memoized lookup, lazy
//! generation, refresh and propagation to copies and descendants.

use std::sync::Arc;

use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::repos::{RuntimeConfigRepo, ThemeManifestRepo, ThemesRepo};
use crate::cache::{Lookup, RuntimeConfigCache};
use crate::domain::entities::{RuntimeConfigRecord, ThemeRecord};
use crate::domain::theme_config::ThemeManifest;

use super::compilation::ScriptFileResolver;
use super::error::ThemeConfigError;
use super::merge::ConfigMerger;
use super::structure::{ThemeStructure, build_structure};

const SOURCE: &str = "application::theme::RuntimeConfigService";

pub(crate) const METRIC_GENERATED: &str = "livery_runtime_config_generated_total";
pub(crate) const METRIC_COMPILE_FAILURE: &str = "livery_runtime_config_compile_failure_total";

/// Source of `updated_at` timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// The single entry point for obtaining a theme's runtime configuration.
///
/// Lookups go memo → store → generation. Every write reaches the store
/// before the memo, and the memo is only ever cleared as a whole.
#[derive(Clone)]
pub struct RuntimeConfigService {
    store: Arc<dyn RuntimeConfigRepo>,
    themes: Arc<dyn ThemesRepo>,
    manifests: Arc<dyn ThemeManifestRepo>,
    resolver: Arc<dyn ScriptFileResolver>,
    cache: Arc<RuntimeConfigCache>,
    clock: Arc<dyn Clock>,
    merger: ConfigMerger,
}

impl RuntimeConfigService {
    pub fn new(
        store: Arc<dyn RuntimeConfigRepo>,
        themes: Arc<dyn ThemesRepo>,
        manifests: Arc<dyn ThemeManifestRepo>,
        resolver: Arc<dyn ScriptFileResolver>,
        cache: Arc<RuntimeConfigCache>,
        clock: Arc<dyn Clock>,
        merger: ConfigMerger,
    ) -> Self {
        Self {
            store,
            themes,
            manifests,
            resolver,
            cache,
            clock,
            merger,
        }
    }

    pub async fn runtime_config(
        &self,
        theme_id: Uuid,
    ) -> Result<Option<RuntimeConfigRecord>, ThemeConfigError> {
        if let Lookup::Hit(record) = self.cache.get_by_id(theme_id) {
            return Ok(record);
        }

        let record = match self.store.find_by_id(theme_id).await? {
            Some(record) => Some(record),
            None => self.generate_by_theme_id(theme_id).await?,
        };

        self.cache.remember_id(theme_id, record.clone());
        Ok(record)
    }

    pub async fn runtime_config_by_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<RuntimeConfigRecord>, ThemeConfigError> {
        if let Lookup::Hit(record) = self.cache.get_by_name(technical_name) {
            return Ok(record);
        }

        let record = match self.store.find_by_technical_name(technical_name).await? {
            Some(record) => Some(record),
            None => self.generate_by_technical_name(technical_name).await?,
        };

        self.cache.remember_name(technical_name, record.clone());
        Ok(record)
    }

    /// Like [`runtime_config`](Self::runtime_config), but the returned
    /// record always carries resolved script files. A never-compiled record
    /// is regenerated with compilation failures surfaced to the caller.
    pub async fn resolved_runtime_config(
        &self,
        theme_id: Uuid,
    ) -> Result<Option<RuntimeConfigRecord>, ThemeConfigError> {
        let Some(record) = self.runtime_config(theme_id).await? else {
            return Ok(None);
        };
        if record.is_compiled() {
            return Ok(Some(record));
        }

        debug!(
            target = SOURCE,
            theme_id = %theme_id,
            "runtime config was never compiled, regenerating"
        );
        let manifest = self.manifest_for(theme_id).await?;
        self.refresh_runtime_config(theme_id, &manifest, true, None)
            .await
            .map(Some)
    }

    /// Regenerates and persists the runtime config of a theme, then of each
    /// of its direct copies. Returns the theme's own record.
    ///
    /// With `fail_on_file_resolve_error` unset, a compilation failure leaves
    /// `script_files` unset instead of failing the refresh.
    pub async fn refresh_runtime_config(
        &self,
        theme_id: Uuid,
        manifest: &ThemeManifest,
        fail_on_file_resolve_error: bool,
        manifests: Option<&[ThemeManifest]>,
    ) -> Result<RuntimeConfigRecord, ThemeConfigError> {
        let loaded;
        let manifests = match manifests {
            Some(manifests) => manifests,
            None => {
                loaded = self.manifests.list_manifests().await?;
                loaded.as_slice()
            }
        };

        let script_files = match self
            .resolver
            .resolve_script_files(manifest, manifests)
            .await
        {
            Ok(files) => Some(files),
            Err(err) if fail_on_file_resolve_error => {
                counter!(METRIC_COMPILE_FAILURE, "mode" => "strict").increment(1);
                return Err(err.into());
            }
            Err(err) => {
                counter!(METRIC_COMPILE_FAILURE, "mode" => "best_effort").increment(1);
                warn!(
                    target = SOURCE,
                    theme_id = %theme_id,
                    error = %err,
                    "script file resolution failed, storing uncompiled runtime config"
                );
                None
            }
        };

        let themes = self.themes.list_themes().await?;
        let merged = self.merger.merge(theme_id, &themes)?;

        let record = RuntimeConfigRecord {
            theme_id,
            technical_name: merged.technical_name.clone(),
            resolved_config: merged.resolved_values(),
            view_inheritance: manifest.view_inheritance.clone(),
            script_files,
            icon_sets: manifest.resolved_icon_sets(),
            updated_at: self.clock.now(),
        };
        self.persist(&record).await?;

        let copy_ids = self.store.list_copy_ids(theme_id).await?;
        for copy_id in &copy_ids {
            let merged = self.merger.merge(*copy_id, &themes)?;
            let copy = RuntimeConfigRecord {
                theme_id: *copy_id,
                technical_name: None,
                resolved_config: merged.resolved_values(),
                updated_at: self.clock.now(),
                ..record.clone()
            };
            self.persist(&copy).await?;
        }

        counter!(METRIC_GENERATED).increment(1);
        info!(
            target = SOURCE,
            theme_id = %theme_id,
            compiled = record.is_compiled(),
            copies = copy_ids.len(),
            "runtime config refreshed"
        );

        Ok(record)
    }

    /// [`refresh_runtime_config`](Self::refresh_runtime_config) with the
    /// theme's own manifest, or its parent's for a copy.
    pub async fn regenerate(
        &self,
        theme_id: Uuid,
        fail_on_file_resolve_error: bool,
    ) -> Result<RuntimeConfigRecord, ThemeConfigError> {
        let manifest = self.manifest_for(theme_id).await?;
        self.refresh_runtime_config(theme_id, &manifest, fail_on_file_resolve_error, None)
            .await
    }

    /// Recomputes resolved values of a theme and of all its descendants,
    /// leaving compiled fields untouched. Themes without a stored runtime
    /// config are skipped; their next lookup generates them in full.
    pub async fn refresh_config_values(
        &self,
        theme_id: Uuid,
    ) -> Result<Option<RuntimeConfigRecord>, ThemeConfigError> {
        let themes = self.themes.list_themes().await?;
        let refreshed = self.refresh_values_of(theme_id, &themes).await?;

        let descendants = self.store.list_child_theme_ids(theme_id).await?;
        for child_id in &descendants {
            self.refresh_values_of(*child_id, &themes).await?;
        }

        debug!(
            target = SOURCE,
            theme_id = %theme_id,
            descendants = descendants.len(),
            "config values refreshed"
        );
        Ok(refreshed)
    }

    /// Presentation tree of a theme's merged fields, keyed by the theme's
    /// technical name (the parent's for a copy).
    pub async fn theme_structure(&self, theme_id: Uuid) -> Result<ThemeStructure, ThemeConfigError> {
        let technical_name = self
            .store
            .theme_technical_name(theme_id)
            .await?
            .ok_or_else(|| ThemeConfigError::theme_not_found(theme_id))?;
        let themes = self.themes.list_themes().await?;
        let merged = self.merger.merge(theme_id, &themes)?;
        Ok(build_structure(&merged, &technical_name))
    }

    pub fn reset_caches(&self) {
        let entries = self.cache.len();
        self.cache.clear();
        debug!(target = SOURCE, entries, "runtime config caches cleared");
    }

    pub async fn active_theme_names(&self) -> Result<Vec<String>, ThemeConfigError> {
        if let Some(names) = self.cache.active_theme_names() {
            return Ok(names);
        }

        let names = self.store.list_active_theme_names().await?;
        self.cache.set_active_theme_names(names.clone());
        Ok(names)
    }

    async fn refresh_values_of(
        &self,
        theme_id: Uuid,
        themes: &[ThemeRecord],
    ) -> Result<Option<RuntimeConfigRecord>, ThemeConfigError> {
        let Some(existing) = self.store.find_by_id(theme_id).await? else {
            debug!(
                target = SOURCE,
                theme_id = %theme_id,
                "no stored runtime config, skipping value refresh"
            );
            return Ok(None);
        };

        let merged = self.merger.merge(theme_id, themes)?;
        let record = RuntimeConfigRecord {
            resolved_config: merged.resolved_values(),
            updated_at: self.clock.now(),
            ..existing
        };
        self.persist(&record).await?;
        Ok(Some(record))
    }

    async fn persist(&self, record: &RuntimeConfigRecord) -> Result<(), ThemeConfigError> {
        self.store.upsert(record).await?;
        self.cache.store(record);
        Ok(())
    }

    async fn manifest_for(&self, theme_id: Uuid) -> Result<ThemeManifest, ThemeConfigError> {
        let technical_name = self
            .store
            .theme_technical_name(theme_id)
            .await?
            .ok_or_else(|| ThemeConfigError::theme_not_found(theme_id))?;
        self.manifests
            .find_manifest(&technical_name)
            .await?
            .ok_or_else(|| ThemeConfigError::manifest_not_found(technical_name))
    }

    async fn generate_by_theme_id(
        &self,
        theme_id: Uuid,
    ) -> Result<Option<RuntimeConfigRecord>, ThemeConfigError> {
        let Some(technical_name) = self.store.theme_technical_name(theme_id).await? else {
            debug!(target = SOURCE, theme_id = %theme_id, "unknown theme, nothing to generate");
            return Ok(None);
        };
        let Some(manifest) = self.manifests.find_manifest(&technical_name).await? else {
            debug!(
                target = SOURCE,
                theme_id = %theme_id,
                technical_name,
                "theme has no manifest, nothing to generate"
            );
            return Ok(None);
        };

        self.refresh_runtime_config(theme_id, &manifest, false, None)
            .await
            .map(Some)
    }

    async fn generate_by_technical_name(
        &self,
        technical_name: &str,
    ) -> Result<Option<RuntimeConfigRecord>, ThemeConfigError> {
        let Some(theme_id) = self.store.theme_id_by_technical_name(technical_name).await? else {
            debug!(target = SOURCE, technical_name, "unknown theme, nothing to generate");
            return Ok(None);
        };
        let Some(manifest) = self.manifests.find_manifest(technical_name).await? else {
            debug!(
                target = SOURCE,
                technical_name,
                "theme has no manifest, nothing to generate"
            );
            return Ok(None);
        };

        self.refresh_runtime_config(theme_id, &manifest, false, None)
            .await
            .map(Some)
    }
}
