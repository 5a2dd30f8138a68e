//! Boundary to the theme compiler: resolution of a theme's script files.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::theme_config::ThemeManifest;

#[derive(Debug, Error)]
pub enum CompilationError {
    #[error("script file `{path}` of theme `{theme}` does not exist")]
    MissingFile { theme: String, path: PathBuf },
    #[error("theme `{theme}` references unknown theme `{reference}`")]
    UnknownThemeReference { theme: String, reference: String },
    #[error("failed to inspect `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Produces the ordered script files a compiled theme serves.
///
/// Slow by nature (file system or external build); only invoked when a
/// runtime config is regenerated. Either every script file resolves or the
/// call fails: a partial list is never returned.
#[async_trait]
pub trait ScriptFileResolver: Send + Sync {
    async fn resolve_script_files(
        &self,
        manifest: &ThemeManifest,
        manifests: &[ThemeManifest],
    ) -> Result<Vec<String>, CompilationError>;
}
