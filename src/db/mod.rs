/// Database layer for vidhub
///
/// Manages the SQLite connection pool, embedded migrations, and the row
/// models shared by the managers.

pub mod models;

use crate::error::{HubError, HubResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> HubResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Create a private in-memory database with the schema applied
///
/// A single connection is used so every query sees the same database.
pub async fn create_memory_pool() -> HubResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> HubResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| HubError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Fresh record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Validate an externally supplied record id
pub fn parse_id(raw: &str, field: &str) -> HubResult<String> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| HubError::Validation(format!("malformed {} id", field)))
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> HubResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_pool_creates_parent_and_migrates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("vidhub.sqlite");

        let pool = create_pool(&path, DatabaseOptions::default()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        test_connection(&pool).await.unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_parse_id() {
        let id = new_id();
        assert_eq!(parse_id(&id, "video").unwrap(), id);
        assert!(matches!(parse_id("42", "video"), Err(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn test_like_requires_exactly_one_target() {
        let pool = create_memory_pool().await.unwrap();

        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, created_at)
             VALUES ('u1', 'alice', 'a@example.com', 'Alice', 'x', CURRENT_TIMESTAMP)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = sqlx::query(
            "INSERT INTO likes (id, liked_by, video_id, comment_id, created_at)
             VALUES ('l1', 'u1', NULL, NULL, CURRENT_TIMESTAMP)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
