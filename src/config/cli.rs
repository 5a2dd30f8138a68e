use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the livery binary.
#[derive(Debug, Parser)]
#[command(
    name = "livery",
    version,
    about = "Inspect and regenerate theme runtime configuration"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "LIVERY_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the runtime config of a theme, generating it when missing.
    Show(ShowArgs),
    /// Print the runtime config with script files resolved, compiling if needed.
    Resolve(ThemeArgs),
    /// Regenerate the runtime config of a theme and its copies.
    Refresh(RefreshArgs),
    /// Recompute resolved values of a theme and all of its descendants.
    #[command(name = "refresh-values")]
    RefreshValues(ThemeArgs),
    /// List technical names of themes with a stored runtime config.
    #[command(name = "active-themes")]
    ActiveThemes,
    /// Print the tab/block/section tree of a theme's merged fields.
    Structure(ThemeArgs),
    /// Apply pending database migrations.
    Migrate,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Theme id, or technical name of a named theme.
    #[arg(value_name = "THEME")]
    pub theme: String,
}

#[derive(Debug, Args, Clone)]
pub struct ThemeArgs {
    #[arg(value_name = "THEME_ID")]
    pub theme_id: Uuid,
}

#[derive(Debug, Args, Clone)]
pub struct RefreshArgs {
    #[arg(value_name = "THEME_ID")]
    pub theme_id: Uuid,

    /// Fail when a script file cannot be resolved instead of storing an
    /// uncompiled runtime config.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub strict: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the technical name of the platform base theme.
    #[arg(long = "base-theme", value_name = "NAME", global = true)]
    pub base_theme: Option<String>,

    /// Override the directory holding `<TechnicalName>/theme.json` manifests.
    #[arg(
        long = "themes-dir",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub themes_dir: Option<PathBuf>,

    /// Override the root directory script files are resolved against.
    #[arg(
        long = "asset-root",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub asset_root: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_missing_value = "true",
        global = true
    )]
    pub log_json: Option<bool>,
}
