pub mod error;
pub mod models;
pub mod test_utils;

pub use error::{StoreError, StoreResult};

use sea_orm::{Database, DatabaseConnection, DbErr};
use std::path::Path;
use util::config::{AppConfig, database_url, is_dsn};

/// Connects to the database named by `DATABASE_PATH`.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let path = AppConfig::global().database_path.clone();
    if !is_dsn(&path) {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(&path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbErr::Custom(format!(
                    "cannot create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }
    let url = database_url(&path);
    tracing::debug!(%url, "connecting to database");
    Database::connect(&url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn unusable_directory_is_reported() {
        // Cargo.toml is a file, so nothing can be created beneath it.
        AppConfig::set_database_path("Cargo.toml/nested/makeup.db");
        let err = connect().await.unwrap_err();
        AppConfig::reset();

        assert!(matches!(&err, DbErr::Custom(msg) if msg.contains("database directory")));
    }
}
