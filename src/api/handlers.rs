use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::OpenApi;

use super::{
    dto::{
        DeleteReadingsResponse, DeviceStateDto, LatestReadingDto, MessageResponse,
        RecordReadingRequest, ResetLocalResponse, SensorReadingDto, SetDeviceStateRequest,
    },
    errors::AppError,
    AppState,
};
use crate::readings::service::DEFAULT_HISTORY_LIMIT;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Raw string so a junk value falls back to the default instead of
    /// producing a 4xx the wire contract does not have.
    pub limit: Option<String>,
}

fn parse_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
}

// ---------------------------------------------------------------------------
// Device state
// ---------------------------------------------------------------------------

/// Fetch the current LED state for a device. Returns `null` when the
/// device has never been written — absence is not an error.
#[utoipa::path(
    get,
    path = "/device-state/{id}",
    params(
        ("id" = String, Path, description = "Device ID"),
    ),
    responses(
        (status = 200, description = "Current state, or null if none exists", body = DeviceStateDto),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-state"
)]
pub async fn get_device_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<DeviceStateDto>>, AppError> {
    let row = state.devices.get(&id).await?;
    Ok(Json(row.map(Into::into)))
}

/// Upsert the LED state for a device; creates the record on first write.
#[utoipa::path(
    post,
    path = "/device-state",
    request_body = SetDeviceStateRequest,
    responses(
        (status = 200, description = "State after the write", body = DeviceStateDto),
        (status = 500, description = "Internal server error"),
    ),
    tag = "device-state"
)]
pub async fn set_device_state(
    State(state): State<AppState>,
    Json(req): Json<SetDeviceStateRequest>,
) -> Result<Json<DeviceStateDto>, AppError> {
    let row = state.devices.set(&req.device_id, req.led).await?;
    Ok(Json(row.into()))
}

// ---------------------------------------------------------------------------
// Sensor data
// ---------------------------------------------------------------------------

/// Ingest one reading. The timestamp is assigned server-side; the stored
/// record is not echoed back.
#[utoipa::path(
    post,
    path = "/sensor-data",
    request_body = RecordReadingRequest,
    responses(
        (status = 200, description = "Confirmation", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensor-data"
)]
pub async fn record_reading(
    State(state): State<AppState>,
    Json(req): Json<RecordReadingRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .readings
        .record(&req.device_id, req.temperature, req.humidity)
        .await?;

    Ok(Json(MessageResponse {
        message: "Sensor data recorded".to_owned(),
    }))
}

/// Fetch the most recent reading for a device. A device with no data gets
/// an all-null placeholder, never a 404.
#[utoipa::path(
    get,
    path = "/sensor-data/{device_id}/latest",
    params(
        ("device_id" = String, Path, description = "Device ID"),
    ),
    responses(
        (status = 200, description = "Latest reading or placeholder", body = LatestReadingDto),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensor-data"
)]
pub async fn get_latest_reading(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<LatestReadingDto>, AppError> {
    let row = state.readings.latest(&device_id).await?;
    Ok(Json(match row {
        Some(r) => r.into(),
        None => LatestReadingDto::placeholder(&device_id),
    }))
}

/// Fetch the N most recent readings for a device, newest first.
/// `limit` defaults to 100 when absent or not a valid positive integer.
#[utoipa::path(
    get,
    path = "/sensor-data/{device_id}",
    params(
        ("device_id" = String, Path, description = "Device ID"),
        ("limit" = Option<String>, Query, description = "Max readings to return (default 100)"),
    ),
    responses(
        (status = 200, description = "Readings, newest first", body = Vec<SensorReadingDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensor-data"
)]
pub async fn get_device_history(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SensorReadingDto>>, AppError> {
    let limit = parse_limit(params.limit.as_deref());
    let rows = state.readings.history(&device_id, limit).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Delete all readings for one device.
#[utoipa::path(
    delete,
    path = "/sensor-data/{device_id}",
    params(
        ("device_id" = String, Path, description = "Device ID"),
    ),
    responses(
        (status = 200, description = "Deletion summary", body = DeleteReadingsResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensor-data"
)]
pub async fn delete_device_readings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeleteReadingsResponse>, AppError> {
    let deleted_count = state.readings.delete_for_device(&device_id).await?;
    Ok(Json(DeleteReadingsResponse {
        message: format!("Sensor data deleted for device {device_id}"),
        deleted_count,
    }))
}

// ---------------------------------------------------------------------------
// Dev / administrative
// ---------------------------------------------------------------------------

/// Export every reading across all devices, newest first. Unbounded.
#[utoipa::path(
    get,
    path = "/dev/dataset",
    responses(
        (status = 200, description = "All readings", body = Vec<SensorReadingDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "dev"
)]
pub async fn get_dataset(
    State(state): State<AppState>,
) -> Result<Json<Vec<SensorReadingDto>>, AppError> {
    let rows = state.readings.dataset().await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Delete every reading globally.
#[utoipa::path(
    delete,
    path = "/dev/reset-server",
    responses(
        (status = 200, description = "Confirmation", body = MessageResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "dev"
)]
pub async fn reset_server(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let deleted = state.readings.delete_all().await?;
    Ok(Json(MessageResponse {
        message: format!("Server reset: {deleted} readings deleted"),
    }))
}

/// Pure acknowledgement for clients resetting their local state; touches
/// no storage.
#[utoipa::path(
    post,
    path = "/dev/reset-local",
    responses(
        (status = 200, description = "Acknowledgement", body = ResetLocalResponse),
    ),
    tag = "dev"
)]
pub async fn reset_local() -> Json<ResetLocalResponse> {
    Json(ResetLocalResponse {
        action: "reset-local".to_owned(),
        message: "Local reset acknowledged".to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        get_device_state,
        set_device_state,
        record_reading,
        get_latest_reading,
        get_device_history,
        delete_device_readings,
        get_dataset,
        reset_server,
        reset_local,
        health,
    ),
    components(schemas(
        DeviceStateDto,
        SetDeviceStateRequest,
        RecordReadingRequest,
        SensorReadingDto,
        LatestReadingDto,
        MessageResponse,
        DeleteReadingsResponse,
        ResetLocalResponse,
    )),
    tags(
        (name = "device-state", description = "Per-device LED state"),
        (name = "sensor-data",  description = "Telemetry ingestion and retrieval"),
        (name = "dev",          description = "Administrative endpoints"),
        (name = "system",       description = "System endpoints"),
    ),
    info(
        title = "Device Telemetry API",
        version = "0.1.0",
        description = "REST API for IoT device state and sensor telemetry"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use sqlx::PgPool;

    use super::parse_limit;
    use crate::{
        api::{router, AppState},
        devices::DeviceStateService,
        readings::ReadingService,
    };

    fn test_server(pool: PgPool) -> TestServer {
        let state = AppState {
            devices: DeviceStateService::new(pool.clone()),
            readings: ReadingService::new(pool),
        };
        TestServer::new(router(state)).unwrap()
    }

    async fn insert_reading(
        pool: &PgPool,
        device_id: &str,
        temperature: f64,
        recorded_at: chrono::DateTime<Utc>,
    ) {
        sqlx::query(
            "INSERT INTO sensor_readings (device_id, temperature, humidity, recorded_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(device_id)
        .bind(temperature)
        .bind(55.0_f64)
        .bind(recorded_at)
        .execute(pool)
        .await
        .unwrap();
    }

    // -----------------------------------------------------------------------
    // parse_limit
    // -----------------------------------------------------------------------

    #[test]
    fn limit_absent_defaults_to_100() {
        assert_eq!(parse_limit(None), 100);
    }

    #[test]
    fn limit_valid_is_used() {
        assert_eq!(parse_limit(Some("5")), 5);
    }

    #[test]
    fn limit_junk_or_nonpositive_defaults_to_100() {
        assert_eq!(parse_limit(Some("abc")), 100);
        assert_eq!(parse_limit(Some("0")), 100);
        assert_eq!(parse_limit(Some("-3")), 100);
    }

    // -----------------------------------------------------------------------
    // GET /device-state/{id}
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn device_state_absent_returns_null(pool: PgPool) {
        let server = test_server(pool);
        let resp = server.get("/device-state/unknown").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert!(body.is_null());
    }

    // -----------------------------------------------------------------------
    // POST /device-state
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn device_state_upsert_then_read(pool: PgPool) {
        let server = test_server(pool);

        let resp = server
            .post("/device-state")
            .json(&json!({ "deviceId": "d1", "led": true }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["deviceId"], "d1");
        assert_eq!(body["led"], true);
        assert!(body["updatedAt"].is_string());

        let resp = server.get("/device-state/d1").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["led"], true);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn device_state_second_write_wins_and_keeps_one_row(pool: PgPool) {
        let server = test_server(pool.clone());

        server
            .post("/device-state")
            .json(&json!({ "deviceId": "d1", "led": true }))
            .await
            .assert_status_ok();
        server
            .post("/device-state")
            .json(&json!({ "deviceId": "d1", "led": false }))
            .await
            .assert_status_ok();

        let resp = server.get("/device-state/d1").await;
        let body: Value = resp.json();
        assert_eq!(body["led"], false);

        let (count,): (i64,) =
            sqlx::query_as("SELECT count(*) FROM device_states WHERE device_id = $1")
                .bind("d1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn device_state_updated_at_does_not_decrease(pool: PgPool) {
        let server = test_server(pool);

        let first: Value = server
            .post("/device-state")
            .json(&json!({ "deviceId": "d1", "led": true }))
            .await
            .json();
        let second: Value = server
            .post("/device-state")
            .json(&json!({ "deviceId": "d1", "led": false }))
            .await
            .json();

        let a = chrono::DateTime::parse_from_rfc3339(first["updatedAt"].as_str().unwrap()).unwrap();
        let b = chrono::DateTime::parse_from_rfc3339(second["updatedAt"].as_str().unwrap()).unwrap();
        assert!(b >= a);
    }

    // -----------------------------------------------------------------------
    // POST /sensor-data + GET /sensor-data/{device_id}/latest
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn record_then_latest_returns_the_reading(pool: PgPool) {
        let server = test_server(pool);

        let resp = server
            .post("/sensor-data")
            .json(&json!({ "deviceId": "d1", "temperature": 21.5, "humidity": 60 }))
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert!(body["message"].is_string());

        let resp = server.get("/sensor-data/d1/latest").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["deviceId"], "d1");
        assert_eq!(body["temperature"], 21.5);
        assert_eq!(body["humidity"], 60.0);
        assert!(body["timestamp"].is_string());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn latest_without_readings_returns_placeholder(pool: PgPool) {
        let server = test_server(pool);
        let resp = server.get("/sensor-data/ghost/latest").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["deviceId"], "ghost");
        assert!(body["temperature"].is_null());
        assert!(body["humidity"].is_null());
        assert!(body["timestamp"].is_null());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reading_without_values_is_accepted(pool: PgPool) {
        let server = test_server(pool);

        server
            .post("/sensor-data")
            .json(&json!({ "deviceId": "d1" }))
            .await
            .assert_status_ok();

        let body: Value = server.get("/sensor-data/d1/latest").await.json();
        assert!(body["temperature"].is_null());
        assert!(body["humidity"].is_null());
        assert!(body["timestamp"].is_string());
    }

    // -----------------------------------------------------------------------
    // GET /sensor-data/{device_id}
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn history_empty_returns_empty_array(pool: PgPool) {
        let server = test_server(pool);
        let resp = server.get("/sensor-data/unknown").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!([]));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn history_respects_limit_newest_first(pool: PgPool) {
        let base = Utc::now() - Duration::minutes(10);
        for i in 0..5 {
            insert_reading(&pool, "d1", 20.0 + i as f64, base + Duration::minutes(i)).await;
        }

        let server = test_server(pool);
        let resp = server.get("/sensor-data/d1?limit=2").await;
        resp.assert_status_ok();

        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0]["temperature"], 24.0);
        assert_eq!(body[1]["temperature"], 23.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn history_invalid_limit_falls_back_to_default(pool: PgPool) {
        let base = Utc::now() - Duration::minutes(10);
        for i in 0..3 {
            insert_reading(&pool, "d1", 20.0, base + Duration::minutes(i)).await;
        }

        let server = test_server(pool);
        let resp = server.get("/sensor-data/d1?limit=abc").await;
        resp.assert_status_ok();
        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 3);
    }

    // -----------------------------------------------------------------------
    // DELETE /sensor-data/{device_id}
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn delete_is_scoped_to_one_device(pool: PgPool) {
        let now = Utc::now();
        insert_reading(&pool, "d1", 20.0, now - Duration::minutes(2)).await;
        insert_reading(&pool, "d1", 21.0, now - Duration::minutes(1)).await;
        insert_reading(&pool, "d2", 22.0, now).await;

        let server = test_server(pool);
        let resp = server.delete("/sensor-data/d1").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["deletedCount"], 2);

        let d1: Vec<Value> = server.get("/sensor-data/d1").await.json();
        assert!(d1.is_empty());
        let d2: Vec<Value> = server.get("/sensor-data/d2").await.json();
        assert_eq!(d2.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Dev endpoints
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn dataset_returns_all_devices_newest_first(pool: PgPool) {
        let now = Utc::now();
        insert_reading(&pool, "d1", 20.0, now - Duration::minutes(2)).await;
        insert_reading(&pool, "d2", 21.0, now - Duration::minutes(1)).await;
        insert_reading(&pool, "d1", 22.0, now).await;

        let server = test_server(pool);
        let body: Vec<Value> = server.get("/dev/dataset").await.json();
        assert_eq!(body.len(), 3);
        assert_eq!(body[0]["temperature"], 22.0);
        assert_eq!(body[2]["temperature"], 20.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_server_deletes_everything(pool: PgPool) {
        let now = Utc::now();
        insert_reading(&pool, "d1", 20.0, now).await;
        insert_reading(&pool, "d2", 21.0, now).await;

        let server = test_server(pool);
        let resp = server.delete("/dev/reset-server").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert!(body["message"].is_string());

        let all: Vec<Value> = server.get("/dev/dataset").await.json();
        assert!(all.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_local_is_a_pure_ack(pool: PgPool) {
        insert_reading(&pool, "d1", 20.0, Utc::now()).await;

        let server = test_server(pool);
        let resp = server.post("/dev/reset-local").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["action"], "reset-local");
        assert!(body["message"].is_string());

        // No storage effect.
        let all: Vec<Value> = server.get("/dev/dataset").await.json();
        assert_eq!(all.len(), 1);
    }

    // -----------------------------------------------------------------------
    // System endpoints
    // -----------------------------------------------------------------------

    #[sqlx::test(migrations = "./migrations")]
    async fn health_returns_ok(pool: PgPool) {
        let server = test_server(pool);
        let resp = server.get("/health").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "ok");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn openapi_spec_is_served(pool: PgPool) {
        let server = test_server(pool);
        let resp = server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["info"]["title"], "Device Telemetry API");
    }
}
