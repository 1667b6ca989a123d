use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Latest commanded LED value for one device. Exactly one row per
/// `device_id` (primary key); created implicitly on first write.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: String,
    pub led: bool,
    pub updated_at: DateTime<Utc>,
}

/// One immutable telemetry sample. `recorded_at` is assigned by the
/// database at insert time, never by the client.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: Uuid,
    pub device_id: String,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity percentage
    pub humidity: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}
