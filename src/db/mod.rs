use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub enum DatabasePool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DatabasePool {
    pub async fn new(config: &Config) -> AppResult<Self> {
        Self::connect(&config.database.url).await
    }

    pub async fn connect(database_url: &str) -> AppResult<Self> {
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;

            Ok(DatabasePool::Postgres(pool))
        } else if database_url.starts_with("sqlite://") {
            let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

            // In-memory SQLite databases exist per connection; a larger pool
            // would hand out fresh empty databases.
            let max_connections = if database_url.contains(":memory:") {
                1
            } else {
                10
            };

            let pool = SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await?;

            Ok(DatabasePool::Sqlite(pool))
        } else {
            Err(AppError::ConfigError(config::ConfigError::Message(
                "Invalid database URL. Must start with postgres:// or sqlite://".to_string(),
            )))
        }
    }

    pub async fn migrate(&self) -> AppResult<()> {
        match self {
            DatabasePool::Postgres(pool) => {
                Migrator::new(std::path::Path::new("./migrations/postgres"))
                    .await?
                    .run(pool)
                    .await?;
            }
            DatabasePool::Sqlite(pool) => {
                Migrator::new(std::path::Path::new("./migrations/sqlite"))
                    .await?
                    .run(pool)
                    .await?;
            }
        }
        Ok(())
    }
}
