pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{devices::DeviceStateService, readings::ReadingService};

/// Shared handler state. Both services are cheap clones around the same
/// `PgPool`; there is no other cross-request state.
#[derive(Clone)]
pub struct AppState {
    pub devices: DeviceStateService,
    pub readings: ReadingService,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/device-state/{id}", get(handlers::get_device_state))
        .route("/device-state", post(handlers::set_device_state))
        .route("/sensor-data", post(handlers::record_reading))
        .route(
            "/sensor-data/{device_id}/latest",
            get(handlers::get_latest_reading),
        )
        .route(
            "/sensor-data/{device_id}",
            get(handlers::get_device_history).delete(handlers::delete_device_readings),
        )
        .route("/dev/dataset", get(handlers::get_dataset))
        .route("/dev/reset-server", delete(handlers::reset_server))
        .route("/dev/reset-local", post(handlers::reset_local))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
