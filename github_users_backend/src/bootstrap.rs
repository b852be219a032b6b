use crate::config::AppConfig;
use crate::database::Database;
use crate::remote::{UserApiService, UserRemoteSource};
use crate::users::UserRepositoryService;
use anyhow::{Context, Result};
use std::fs;
use std::sync::Arc;

/// Process-wide services, built once by the entry point and passed down.
pub struct AppResources {
    pub directories_created: Vec<String>,
    pub database_initialized: bool,
    pub database: Database,
    pub repository: UserRepositoryService,
}

pub fn initialize(config: &AppConfig) -> Result<AppResources> {
    let mut directories_created = Vec::new();
    create_dir_if_missing(&config.paths.base, &mut directories_created)?;
    create_dir_if_missing(&config.paths.data_dir, &mut directories_created)?;

    let database = Database::connect(&config.paths)?;
    let database_initialized = database.ensure_migrations()?;

    let api = UserApiService::new(&config.api_base_url, &config.http)?;
    tracing::info!(
        api = %api.base_url(),
        db = %config.paths.db_path.display(),
        page_size = config.paging.page_size,
        "bootstrap complete"
    );
    let remote: Arc<dyn UserRemoteSource> = Arc::new(api);
    let repository = UserRepositoryService::new(database.clone(), remote, config.paging);

    Ok(AppResources {
        directories_created,
        database_initialized,
        database,
        repository,
    })
}

fn create_dir_if_missing(path: &std::path::Path, created: &mut Vec<String>) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        created.push(path.display().to_string());
    }
    Ok(())
}
