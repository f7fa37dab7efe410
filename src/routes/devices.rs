use crate::{
    error::Result,
    models::device::RegisterDeviceRequest,
    services::auth::AuthUser,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_devices).post(register_device))
        .route("/:id", axum::routing::delete(delete_device))
        .route("/:id/deactivate", post(deactivate_device))
}

/// Register (or re-assign) a push device for the caller.
/// POST /api/v1/fcm/devices
pub async fn register_device(
    AuthUser(user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let device = app_state
        .device_service
        .register_device(user.id, &request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": device.to_response(),
        })),
    ))
}

/// The caller's registered devices, newest first.
/// GET /api/v1/fcm/devices
pub async fn list_devices(
    AuthUser(user): AuthUser,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Value>> {
    let devices = app_state.device_service.get_user_devices(user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": devices.iter().map(|d| d.to_response()).collect::<Vec<_>>(),
    })))
}

/// Keep the registration but stop delivering to it.
/// POST /api/v1/fcm/devices/:id/deactivate
pub async fn deactivate_device(
    AuthUser(user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Path(device_id): Path<Uuid>,
) -> Result<Json<Value>> {
    app_state
        .device_service
        .deactivate_device(user.id, device_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Device deactivated",
    })))
}

/// DELETE /api/v1/fcm/devices/:id
pub async fn delete_device(
    AuthUser(user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Path(device_id): Path<Uuid>,
) -> Result<Json<Value>> {
    app_state
        .device_service
        .delete_device(user.id, device_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Device deleted",
    })))
}
