//! Theme manifests read from `<themes_dir>/<TechnicalName>/theme.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::application::repos::{RepoError, ThemeManifestRepo};
use crate::domain::theme_config::ThemeManifest;

const MANIFEST_FILE: &str = "theme.json";

#[derive(Debug, Clone)]
pub struct ManifestDirectory {
    root: PathBuf,
}

impl ManifestDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read(&self, directory: &Path) -> Result<Option<ThemeManifest>, RepoError> {
        let path = directory.join(MANIFEST_FILE);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(RepoError::from_persistence(format!(
                    "failed to read `{}`: {err}",
                    path.display()
                )));
            }
        };

        ThemeManifest::parse(&raw)
            .map(Some)
            .map_err(|err| RepoError::decode(format!("`{}`: {err}", path.display())))
    }
}

/// Technical names are single path segments.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[async_trait]
impl ThemeManifestRepo for ManifestDirectory {
    async fn find_manifest(
        &self,
        technical_name: &str,
    ) -> Result<Option<ThemeManifest>, RepoError> {
        if !is_plain_name(technical_name) {
            return Ok(None);
        }

        let Some(manifest) = self.read(&self.root.join(technical_name)).await? else {
            return Ok(None);
        };
        if manifest.technical_name != technical_name {
            return Err(RepoError::Integrity {
                message: format!(
                    "manifest in `{technical_name}` declares technical name `{}`",
                    manifest.technical_name
                ),
            });
        }
        Ok(Some(manifest))
    }

    async fn list_manifests(&self) -> Result<Vec<ThemeManifest>, RepoError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(root = %self.root.display(), "theme directory does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(RepoError::from_persistence(err)),
        };

        let mut directories = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(RepoError::from_persistence)?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(RepoError::from_persistence)?
                .is_dir();
            if is_dir {
                directories.push(entry.path());
            }
        }
        directories.sort();

        let mut manifests = Vec::new();
        for directory in directories {
            if let Some(manifest) = self.read(&directory).await? {
                manifests.push(manifest);
            }
        }
        Ok(manifests)
    }
}
