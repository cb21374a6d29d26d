//! Database access for audix-ml
//!
//! SQLite holds the latest health score per device.

pub mod device_health;

pub use device_health::{DeviceHealthRecord, SqliteScoreStore};

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the database file (and its parent directory) if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create audix-ml tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> audix_common::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_health (
            device_key TEXT PRIMARY KEY,
            normal_score REAL NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (device_health)");

    Ok(())
}
