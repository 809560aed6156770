use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use crate::config::Config;

pub async fn db_connect(config: &Config) -> Result<DatabaseConnection, DbErr> {
    let url = config.database_url.trim();
    if url.is_empty() {
        return Err(DbErr::Custom("DATABASE_URL is required".to_string()));
    }

    let mut options = ConnectOptions::new(url.to_string());

    // Every pooled connection to `sqlite::memory:` would be its own database.
    if url.starts_with("sqlite") && url.contains(":memory:") {
        options.max_connections(1);
        options.min_connections(1);
    } else {
        options.max_connections(config.database_max_connections);
        options.min_connections(0);
        options.idle_timeout(Duration::from_secs(300));
    }
    options.connect_timeout(Duration::from_secs(5));
    options.acquire_timeout(Duration::from_secs(10));
    options.sqlx_logging(false);

    Database::connect(options).await
}

/// Apply every pending migration.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await
}
