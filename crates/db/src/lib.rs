//! Database layer for roadwatch.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use roadwatch_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::OnceCell;
use tracing::log::LevelFilter;

/// Open a pooled database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Process-wide database handle, connected on first use.
///
/// Every clone shares the same underlying pool; the pool lives until the
/// process exits.
#[derive(Clone)]
pub struct SharedConnection {
    config: Arc<Config>,
    cell: Arc<OnceCell<Arc<DatabaseConnection>>>,
}

impl SharedConnection {
    /// Create an unconnected handle.
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Wrap an already-open connection.
    #[must_use]
    pub fn from_connection(config: Arc<Config>, db: DatabaseConnection) -> Self {
        Self {
            config,
            cell: Arc::new(OnceCell::new_with(Some(Arc::new(db)))),
        }
    }

    /// Return the pool, connecting and migrating if this is the first call.
    ///
    /// Concurrent first calls wait on a single connection attempt; a failed
    /// attempt leaves the handle unconnected so the next call retries.
    pub async fn ensure_connected(&self) -> Result<Arc<DatabaseConnection>, AppError> {
        if let Some(db) = self.cell.get() {
            tracing::debug!("Using existing database connection");
            return Ok(Arc::clone(db));
        }

        let db = self
            .cell
            .get_or_try_init(|| async {
                let db = init(&self.config).await?;
                tracing::info!("Database connected");
                migrate(&db).await?;
                tracing::info!("Migrations completed");
                Ok::<_, AppError>(Arc::new(db))
            })
            .await?;

        Ok(Arc::clone(db))
    }

    /// Whether a connection has been established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }
}
