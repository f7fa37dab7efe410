use crate::{
    error::{AppError, Result},
    models::notification::{
        AdminSendRequest, BroadcastRequest, NotificationCategory, SendTestRequest,
        SendToUserRequest, UserDevicesRequest,
    },
    services::auth::{AdminUser, AuthUser},
    services::notification::{
        build_data_payload, data_object, parse_operator_category, DispatchReport, DispatchTarget,
    },
    state::AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_TEST_TITLE: &str = "🧪 Notificación de Prueba";
const DEFAULT_TEST_BODY: &str = "Esta es una notificación de prueba";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/test/", post(send_test))
        .route("/send-to-user/", post(send_to_user))
        .route("/broadcast/", post(broadcast))
        .route("/admin/send/", post(admin_send))
        .route("/admin/user-devices/", post(admin_user_devices))
        .route("/history/", get(history))
        .route("/stats/", get(stats))
}

/// Send a test notification to the caller's own devices.
/// POST /api/v1/notifications/test/
pub async fn send_test(
    AuthUser(user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SendTestRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let title = request
        .title
        .unwrap_or_else(|| DEFAULT_TEST_TITLE.to_string());
    let body = request.body.unwrap_or_else(|| DEFAULT_TEST_BODY.to_string());
    let mut data = data_object(request.data)?;
    data.entry("type".to_string())
        .or_insert_with(|| Value::String("test".to_string()));

    let result = app_state
        .notification_service
        .dispatch(
            &user,
            NotificationCategory::Test,
            DispatchTarget::UserId(user.id),
            &title,
            &body,
            data,
        )
        .await;

    dispatch_response(result)
}

/// Send to one user's active devices, identified by id or username.
/// POST /api/v1/notifications/send-to-user/
pub async fn send_to_user(
    AdminUser(admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SendToUserRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let target = match (request.user_id, request.username) {
        (Some(user_id), _) => DispatchTarget::UserId(user_id),
        (None, Some(username)) => DispatchTarget::Username(username),
        (None, None) => {
            return Err(AppError::Validation(
                "Debes proporcionar user_id o username".to_string(),
            ))
        }
    };

    let data = data_object(request.data)?;
    let result = app_state
        .notification_service
        .dispatch(
            &admin,
            NotificationCategory::User,
            target,
            &request.title,
            &request.body,
            data,
        )
        .await;

    dispatch_response(result)
}

/// Send to every active device in the system.
/// POST /api/v1/notifications/broadcast/
pub async fn broadcast(
    AdminUser(admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<BroadcastRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let data = data_object(request.data)?;
    let result = app_state
        .notification_service
        .dispatch(
            &admin,
            NotificationCategory::Broadcast,
            DispatchTarget::Broadcast,
            &request.title,
            &request.body,
            data,
        )
        .await;

    dispatch_response(result)
}

/// Operator send flow with explicit category and the
/// action/url/custom-JSON payload fields.
/// POST /api/v1/notifications/admin/send/
pub async fn admin_send(
    AdminUser(admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<AdminSendRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let category = parse_operator_category(&request.notification_type)?;

    let target = match category {
        NotificationCategory::Broadcast => DispatchTarget::Broadcast,
        _ => {
            let user_id = request.target_user_id.ok_or_else(|| {
                AppError::Validation(
                    "Debes seleccionar un usuario para este tipo de notificación".to_string(),
                )
            })?;
            DispatchTarget::UserId(user_id)
        }
    };

    let data = build_data_payload(
        request.data_action.as_deref(),
        request.data_url.as_deref(),
        request.data_custom.as_deref(),
    )?;

    let result = app_state
        .notification_service
        .dispatch(&admin, category, target, &request.title, &request.body, data)
        .await;

    dispatch_response(result)
}

/// A user's active devices, for operator target preview.
/// POST /api/v1/notifications/admin/user-devices/
pub async fn admin_user_devices(
    AdminUser(_admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<UserDevicesRequest>,
) -> Result<Json<Value>> {
    let user = app_state
        .user_service
        .get_by_id(request.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

    let devices = app_state
        .device_service
        .get_active_user_devices(user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "username": user.username,
            "devices": devices.iter().map(|d| d.to_response()).collect::<Vec<_>>(),
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Recent audit records, newest first.
/// GET /api/v1/notifications/history/
pub async fn history(
    AdminUser(_admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let records = app_state.notification_service.get_history(limit).await?;

    Ok(Json(json!({
        "success": true,
        "data": records.iter().map(|r| r.to_response()).collect::<Vec<_>>(),
    })))
}

/// Operator dashboard numbers.
/// GET /api/v1/notifications/stats/
pub async fn stats(
    AdminUser(_admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Value>> {
    let stats = app_state.notification_service.get_stats().await?;

    Ok(Json(json!({
        "success": true,
        "data": stats,
    })))
}

/// Translate a dispatch outcome into the wire shape the frontend
/// expects: `{success, message, devices_count}` on success,
/// `{success: false, error}` with a matching status on failure.
fn dispatch_response(
    result: Result<DispatchReport>,
) -> Result<(StatusCode, Json<Value>)> {
    match result {
        Ok(report) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": report.message,
                "devices_count": report.devices_count,
            })),
        )),
        Err(AppError::NotFound(msg)) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": msg })),
        )),
        Err(AppError::Validation(msg)) | Err(AppError::BadRequest(msg)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": msg })),
        )),
        Err(AppError::ExternalService(msg)) => Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": msg })),
        )),
        Err(e) => Err(e),
    }
}
