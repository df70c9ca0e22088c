use std::path::PathBuf;

use async_trait::async_trait;
use proforma_core::db::{DbConfig, RepositoryFactory};
use proforma_core::{QuoteRepository, RepositoryError};
use tracing::info;

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime.
///
/// Resolution order:
/// 1. `PROFORMA_SEEDS_DIR` if set.
/// 2. `./seeds` if it exists in the current working directory.
/// 3. `$CARGO_MANIFEST_DIR/seeds` (running from the build tree).
pub fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PROFORMA_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// Turns a bare path or `:memory:` into a sqlx connection url. Urls that
/// already carry the `sqlite:` scheme pass through unchanged.
pub fn connection_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{}", trimmed)
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// ```rust,no_run
/// use proforma_core::db::RepositoryRegistry;
/// use proforma_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens the database, applies migrations and loads the default
    /// configuration seeds (see [`seeds_dir`]).
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn QuoteRepository>, RepositoryError> {
        let url = connection_url(&config.connection_string);
        let repo = SqliteRepository::new(&url)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{:#}", e)))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;
        repo.run_seeds(&seeds_dir())
            .await
            .map_err(|e| RepositoryError::Database(format!("{:#}", e)))?;

        info!(url = %url, "opened sqlite repository");
        Ok(Box::new(repo))
    }
}
