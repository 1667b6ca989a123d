use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::db::models::SensorReading;

/// Fallback when the caller supplies no limit (or a nonsensical one).
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// Append-only store of telemetry samples.
#[derive(Clone)]
pub struct ReadingService {
    pool: PgPool,
}

impl ReadingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts one reading with a database-assigned timestamp. Missing or
    /// out-of-range values are stored as-is; nothing is validated here.
    pub async fn record(
        &self,
        device_id: &str,
        temperature: Option<f64>,
        humidity: Option<f64>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO sensor_readings (device_id, temperature, humidity) VALUES ($1, $2, $3)",
        )
        .bind(device_id)
        .bind(temperature)
        .bind(humidity)
        .execute(&self.pool)
        .await?;

        info!(device_id = %device_id, "Sensor reading persisted");
        Ok(())
    }

    /// Most recent reading for `device_id`, if any exist.
    pub async fn latest(&self, device_id: &str) -> Result<Option<SensorReading>> {
        let row = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, device_id, temperature, humidity, recorded_at
            FROM sensor_readings
            WHERE device_id = $1
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Up to `limit` readings for `device_id`, newest first.
    pub async fn history(&self, device_id: &str, limit: i64) -> Result<Vec<SensorReading>> {
        let rows = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, device_id, temperature, humidity, recorded_at
            FROM sensor_readings
            WHERE device_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every reading across all devices, newest first. Unbounded — meant
    /// for administrative export only.
    pub async fn dataset(&self) -> Result<Vec<SensorReading>> {
        let rows = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, device_id, temperature, humidity, recorded_at
            FROM sensor_readings
            ORDER BY recorded_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Removes all readings for one device. Returns the number removed.
    pub async fn delete_for_device(&self, device_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sensor_readings WHERE device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        info!(device_id = %device_id, deleted, "Device readings deleted");
        Ok(deleted)
    }

    /// Removes every reading in the store, all devices.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sensor_readings")
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        info!(deleted, "All readings deleted");
        Ok(deleted)
    }

    /// Removes readings strictly older than `cutoff`. A reading exactly at
    /// the cutoff instant is retained.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sensor_readings WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
