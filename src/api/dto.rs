use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Wire field names are camelCase throughout: the device firmware and
// existing clients speak `deviceId`/`deletedCount`, not snake_case.

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStateDto {
    pub device_id: String,
    pub led: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetDeviceStateRequest {
    pub device_id: String,
    pub led: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordReadingRequest {
    pub device_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingDto {
    pub id: Uuid,
    pub device_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Shape of `GET /sensor-data/{deviceId}/latest`. A device with no data
/// yet gets this with every value null — a deliberate "no data" response,
/// never a 404.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LatestReadingDto {
    pub device_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl LatestReadingDto {
    /// The "no data yet" placeholder carrying the requested id.
    pub fn placeholder(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_owned(),
            temperature: None,
            humidity: None,
            timestamp: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReadingsResponse {
    pub message: String,
    pub deleted_count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetLocalResponse {
    pub action: String,
    pub message: String,
}

impl From<crate::db::models::DeviceState> for DeviceStateDto {
    fn from(s: crate::db::models::DeviceState) -> Self {
        Self {
            device_id: s.device_id,
            led: s.led,
            updated_at: s.updated_at,
        }
    }
}

impl From<crate::db::models::SensorReading> for SensorReadingDto {
    fn from(r: crate::db::models::SensorReading) -> Self {
        Self {
            id: r.id,
            device_id: r.device_id,
            temperature: r.temperature,
            humidity: r.humidity,
            timestamp: r.recorded_at,
        }
    }
}

impl From<crate::db::models::SensorReading> for LatestReadingDto {
    fn from(r: crate::db::models::SensorReading) -> Self {
        Self {
            device_id: r.device_id,
            temperature: r.temperature,
            humidity: r.humidity,
            timestamp: Some(r.recorded_at),
        }
    }
}
