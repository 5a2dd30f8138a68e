//! Script file resolution against the on-disk theme asset tree.
//!
//! A manifest's `script` entries are either paths relative to the theme's
//! own directory under the asset root, or `@ThemeName` references that pull
//! in another theme's script list at that position. `@Plugins` stands for
//! every non-theme bundle, in manifest order.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::application::theme::compilation::{CompilationError, ScriptFileResolver};
use crate::domain::theme_config::{ThemeManifest, theme_reference};

const PLUGINS_REFERENCE: &str = "Plugins";

#[derive(Debug, Clone)]
pub struct FilesystemScriptResolver {
    asset_root: PathBuf,
}

/// One script entry after reference expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScriptEntry {
    theme: String,
    path: String,
}

impl ScriptEntry {
    /// Location relative to the asset root, as served to storefronts.
    fn public_path(&self) -> String {
        format!("{}/{}", self.theme, self.path.trim_start_matches('/'))
    }
}

impl FilesystemScriptResolver {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    fn locate(&self, entry: &ScriptEntry) -> Option<PathBuf> {
        let relative = Path::new(entry.path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.asset_root.join(&entry.theme).join(relative))
    }
}

#[async_trait]
impl ScriptFileResolver for FilesystemScriptResolver {
    async fn resolve_script_files(
        &self,
        manifest: &ThemeManifest,
        manifests: &[ThemeManifest],
    ) -> Result<Vec<String>, CompilationError> {
        let mut entries = Vec::new();
        let mut expanded = HashSet::new();
        expand(manifest, manifests, &mut expanded, &mut entries)?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for entry in entries {
            let public_path = entry.public_path();
            if !seen.insert(public_path.clone()) {
                continue;
            }

            let Some(location) = self.locate(&entry) else {
                return Err(CompilationError::MissingFile {
                    path: PathBuf::from(&entry.path),
                    theme: entry.theme,
                });
            };
            let is_file = match tokio::fs::metadata(&location).await {
                Ok(metadata) => metadata.is_file(),
                Err(err) if err.kind() == ErrorKind::NotFound => false,
                Err(source) => {
                    return Err(CompilationError::Io {
                        path: location,
                        source,
                    });
                }
            };
            if !is_file {
                return Err(CompilationError::MissingFile {
                    theme: entry.theme,
                    path: location,
                });
            }

            resolved.push(public_path);
        }

        debug!(
            theme = %manifest.technical_name,
            files = resolved.len(),
            "resolved script files"
        );
        Ok(resolved)
    }
}

/// Appends the script entries of `manifest` to `out`, expanding references
/// depth-first. Each manifest is expanded at most once.
fn expand(
    manifest: &ThemeManifest,
    manifests: &[ThemeManifest],
    expanded: &mut HashSet<String>,
    out: &mut Vec<ScriptEntry>,
) -> Result<(), CompilationError> {
    if !expanded.insert(manifest.technical_name.clone()) {
        return Ok(());
    }

    for script in &manifest.script_files {
        let Some(reference) = theme_reference(script) else {
            out.push(ScriptEntry {
                theme: manifest.technical_name.clone(),
                path: script.clone(),
            });
            continue;
        };

        if reference == PLUGINS_REFERENCE {
            for plugin in manifests.iter().filter(|candidate| !candidate.is_theme) {
                expand(plugin, manifests, expanded, out)?;
            }
            continue;
        }

        let target = manifests
            .iter()
            .find(|candidate| candidate.technical_name == reference)
            .ok_or_else(|| CompilationError::UnknownThemeReference {
                theme: manifest.technical_name.clone(),
                reference: script.clone(),
            })?;
        expand(target, manifests, expanded, out)?;
    }

    Ok(())
}
