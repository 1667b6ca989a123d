use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::db::models::DeviceState;

/// Owns the single current LED state per device id.
#[derive(Clone)]
pub struct DeviceStateService {
    pool: PgPool,
}

impl DeviceStateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current state for `device_id`, or `None` if the device has never
    /// been written. Absence is not an error.
    pub async fn get(&self, device_id: &str) -> Result<Option<DeviceState>> {
        let row = sqlx::query_as::<_, DeviceState>(
            "SELECT device_id, led, updated_at FROM device_states WHERE device_id = $1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Upserts the state: creates the row on first write, otherwise
    /// overwrites `led`. `updated_at` is set by the database on every
    /// write. Last-write-wins — concurrent writers for the same id race
    /// and whichever commit lands last sticks.
    pub async fn set(&self, device_id: &str, led: bool) -> Result<DeviceState> {
        let row = sqlx::query_as::<_, DeviceState>(
            r#"
            INSERT INTO device_states (device_id, led, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (device_id)
            DO UPDATE SET led = EXCLUDED.led, updated_at = now()
            RETURNING device_id, led, updated_at
            "#,
        )
        .bind(device_id)
        .bind(led)
        .fetch_one(&self.pool)
        .await?;

        info!(device_id = %device_id, led = led, "Device state updated");
        Ok(row)
    }
}
