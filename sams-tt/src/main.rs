//! sams-tt (Timetable) - timetable proposal, voting and finalization service
//!
//! Serves the timetable workflow over HTTP on port 5740 by default.

use anyhow::{Context, Result};
use clap::Parser;
use sams_common::catalog::Catalog;
use sams_common::config::{
    config_file_path, load_optional_toml_config, RootFolderInitializer, RootFolderResolver,
    StorageBackend,
};
use sams_common::events::EventBus;
use sams_common::users::UserDirectory;
use sams_tt::store::{CourseStore, MemoryCourseStore, SqliteCourseStore};
use sams_tt::voting::TimetableVoting;
use sams_tt::{build_router, config, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MODULE_NAME: &str = "sams-tt";

#[derive(Debug, Parser)]
#[command(name = "sams-tt", version, about = "SAMS timetable voting service")]
struct Args {
    /// Root folder holding the database
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: ~/.config/sams/sams-tt.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5740
    #[arg(long)]
    bind: Option<String>,

    /// Course state backend: memory or sqlite
    #[arg(long)]
    storage: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(|| config_file_path(MODULE_NAME));
    let toml_config = load_optional_toml_config(config_path.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting SAMS Timetable (sams-tt) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config directory available, using compiled defaults (pass --config to override)"),
    }

    let catalog = Arc::new(Catalog::seeded());
    let directory = Arc::new(UserDirectory::seeded());
    let event_bus = EventBus::new(256);

    let store: Arc<dyn CourseStore> = match config::resolve_storage(args.storage, &toml_config) {
        StorageBackend::Memory => {
            info!("Course state kept in memory (lost on restart)");
            Arc::new(MemoryCourseStore::new())
        }
        StorageBackend::Sqlite => {
            let root_folder = RootFolderResolver::new(MODULE_NAME)
                .with_cli_arg(args.root_folder.clone())
                .with_config_path(config_path.clone())
                .resolve();
            let initializer = RootFolderInitializer::new(root_folder);
            initializer.ensure_directory_exists()?;

            let db_path = initializer.database_path();
            if initializer.database_exists() {
                info!("Opening existing database: {}", db_path.display());
            } else {
                info!("Creating new database: {}", db_path.display());
            }

            let pool = match sams_common::db::init_database(&db_path).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("Failed to initialize database: {}", e);
                    return Err(e.into());
                }
            };
            Arc::new(SqliteCourseStore::new(pool))
        }
    };

    let mut voting = TimetableVoting::new(store, catalog.clone(), directory.clone(), event_bus.clone());
    match config::build_generator(&toml_config) {
        Ok(Some(generator)) => {
            voting = voting.with_generator(
                Arc::new(generator),
                config::retry_policy_from(&toml_config.generator),
            );
        }
        Ok(None) => {}
        Err(e) => {
            error!("Schedule generator disabled: {}", e);
        }
    }

    let state = AppState::new(Arc::new(voting), catalog, directory, event_bus);
    let app = build_router(state);

    let addr = config::resolve_bind_address(args.bind.as_deref(), &toml_config)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("sams-tt listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
