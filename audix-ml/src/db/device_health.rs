//! Device health records
//!
//! One row per device key (`device:{id}`); writes overwrite, history is not kept.

use super::init_tables;
use crate::models::DeviceId;
use crate::types::{ScoreStore, StoreError};
use audix_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};

/// Stored health score for a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceHealthRecord {
    pub device_key: String,
    pub health_score: f64,
    pub updated_at: DateTime<Utc>,
}

/// Insert or overwrite the score stored under `device_key`
pub async fn upsert_health_score(db: &Pool<Sqlite>, device_key: &str, health_score: f64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO device_health (device_key, normal_score, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(device_key) DO UPDATE SET
            normal_score = excluded.normal_score,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(device_key)
    .bind(health_score)
    .bind(Utc::now())
    .execute(db)
    .await?;

    Ok(())
}

/// Latest score stored under `device_key`, if any
pub async fn get_health_score(db: &Pool<Sqlite>, device_key: &str) -> Result<Option<DeviceHealthRecord>> {
    let row: Option<(String, f64, DateTime<Utc>)> = sqlx::query_as(
        "SELECT device_key, normal_score, updated_at FROM device_health WHERE device_key = ?",
    )
    .bind(device_key)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|(device_key, health_score, updated_at)| DeviceHealthRecord {
        device_key,
        health_score,
        updated_at,
    }))
}

/// `ScoreStore` backed by the `device_health` table
#[derive(Clone)]
pub struct SqliteScoreStore {
    pool: Pool<Sqlite>,
}

impl SqliteScoreStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Store over an in-memory database (single connection so the schema is shared)
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        init_tables(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get(&self, device_id: &DeviceId) -> Result<Option<DeviceHealthRecord>> {
        get_health_score(&self.pool, &device_id.store_key()).await
    }

    /// Whether the database answers a trivial query
    pub async fn is_reachable(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait::async_trait]
impl ScoreStore for SqliteScoreStore {
    async fn upsert(&self, device_id: &DeviceId, health_score: f64) -> std::result::Result<(), StoreError> {
        upsert_health_score(&self.pool, &device_id.store_key(), health_score)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
