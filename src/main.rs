use std::{process, sync::Arc};

use livery::{
    application::{
        error::AppError,
        repos::{RuntimeConfigRepo, ThemeManifestRepo, ThemesRepo},
        theme::{ConfigMerger, RuntimeConfigService, ScriptFileResolver, SystemClock},
    },
    cache::RuntimeConfigCache,
    config::{self, Command},
    infra::{
        assets::FilesystemScriptResolver, db::PostgresRepositories, error::InfraError,
        manifests::ManifestDirectory, telemetry,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::validation(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let repositories = init_repositories(&settings).await?;
    if matches!(cli_args.command, Command::Migrate) {
        info!(target = "livery::migrate", "database schema is up to date");
        return Ok(());
    }

    let service = build_runtime_config_service(repositories, &settings.themes);

    match cli_args.command {
        Command::Show(args) => {
            let record = match Uuid::parse_str(&args.theme) {
                Ok(theme_id) => service.runtime_config(theme_id).await?,
                Err(_) => service.runtime_config_by_name(&args.theme).await?,
            };
            let record =
                record.ok_or_else(|| AppError::not_found(format!("theme `{}`", args.theme)))?;
            print_json(&record)
        }
        Command::Resolve(args) => {
            let record = service
                .resolved_runtime_config(args.theme_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("theme `{}`", args.theme_id)))?;
            print_json(&record)
        }
        Command::Refresh(args) => {
            let record = service.regenerate(args.theme_id, args.strict).await?;
            info!(
                target = "livery::refresh",
                theme_id = %args.theme_id,
                compiled = record.is_compiled(),
                "runtime config regenerated"
            );
            print_json(&record)
        }
        Command::RefreshValues(args) => {
            let record = service.refresh_config_values(args.theme_id).await?;
            print_json(&record)
        }
        Command::ActiveThemes => print_json(&service.active_theme_names().await?),
        Command::Structure(args) => print_json(&service.theme_structure(args.theme_id).await?),
        Command::Migrate => Ok(()),
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_runtime_config_service(
    repositories: Arc<PostgresRepositories>,
    themes: &config::ThemeSettings,
) -> RuntimeConfigService {
    let store: Arc<dyn RuntimeConfigRepo> = repositories.clone();
    let themes_repo: Arc<dyn ThemesRepo> = repositories;
    let manifests: Arc<dyn ThemeManifestRepo> =
        Arc::new(ManifestDirectory::new(themes.themes_dir.clone()));
    let resolver: Arc<dyn ScriptFileResolver> =
        Arc::new(FilesystemScriptResolver::new(themes.asset_root.clone()));

    RuntimeConfigService::new(
        store,
        themes_repo,
        manifests,
        resolver,
        Arc::new(RuntimeConfigCache::new()),
        Arc::new(SystemClock),
        ConfigMerger::new(themes.base_theme.clone()),
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
