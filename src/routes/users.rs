use crate::{
    error::{AppError, Result},
    models::user::{DocumentType, RegisterUserRequest, UpdateUserRequest},
    services::auth::{AdminUser, AuthUser},
    services::user::UserListFilter,
    state::AppState,
    utils::validation,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/profile", get(get_profile).patch(update_profile))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub search: Option<String>,
    pub document_type: Option<String>,
    pub is_active: Option<bool>,
}

/// List accounts with optional search and identity filters.
/// GET /api/v1/users
pub async fn list_users(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Value>> {
    let document_type = query
        .document_type
        .as_deref()
        .map(DocumentType::from_str)
        .transpose()
        .map_err(AppError::Validation)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let result = app_state
        .user_service
        .get_users(
            page,
            per_page,
            UserListFilter {
                search: query.search,
                document_type,
                is_active: query.is_active,
            },
        )
        .await?;

    debug!("Listed {} users", result.data.len());

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": result.data.iter().map(|u| u.to_response()).collect::<Vec<_>>(),
            "pagination": {
                "current_page": result.page,
                "total_pages": result.total_pages,
                "total_items": result.total,
                "items_per_page": result.per_page,
            }
        }
    })))
}

/// Create an account on behalf of someone else.
/// POST /api/v1/users
pub async fn create_user(
    AdminUser(_admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    request.validate()?;
    validation::validate_username(&request.username)?;
    validation::validate_password_pair(&request.password, &request.password_confirm)?;
    if let (Some(tipo), Some(numero)) = (request.document_type, &request.document_number) {
        validation::validate_document(tipo, numero)?;
    }

    let password_hash = app_state.auth_service.hash_password(&request.password)?;
    let user = app_state
        .user_service
        .create_user(&request, password_hash)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": user.to_response(),
        })),
    ))
}

/// The caller's own account.
/// GET /api/v1/users/profile
pub async fn get_profile(AuthUser(user): AuthUser) -> Result<Json<Value>> {
    Ok(Json(json!({
        "success": true,
        "data": user.to_profile_response(),
    })))
}

/// Partial update of the caller's own account.
/// PATCH /api/v1/users/profile
pub async fn update_profile(
    AuthUser(user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>> {
    let updated = apply_update(&app_state, user.id, request).await?;
    Ok(Json(json!({
        "success": true,
        "data": updated,
    })))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    AuthUser(_user): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let user = app_state
        .user_service
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(json!({
        "success": true,
        "data": user.to_response(),
    })))
}

/// Update an account. Staff can edit anyone; others only themselves.
/// PATCH /api/v1/users/:id
pub async fn update_user(
    AuthUser(caller): AuthUser,
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>> {
    if caller.id != user_id && !caller.is_staff {
        return Err(AppError::Authorization(
            "You can only edit your own account".to_string(),
        ));
    }

    let updated = apply_update(&app_state, user_id, request).await?;
    Ok(Json(json!({
        "success": true,
        "data": updated,
    })))
}

/// DELETE /api/v1/users/:id (staff only)
pub async fn delete_user(
    AdminUser(_admin): AdminUser,
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>> {
    app_state.user_service.delete_user(user_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User deleted",
    })))
}

async fn apply_update(
    app_state: &AppState,
    user_id: Uuid,
    request: UpdateUserRequest,
) -> Result<crate::models::user::UserResponse> {
    request.validate()?;
    if let (Some(tipo), Some(numero)) = (request.document_type, &request.document_number) {
        validation::validate_document(tipo, numero)?;
    }

    let password_hash = request
        .password
        .as_deref()
        .map(|p| app_state.auth_service.hash_password(p))
        .transpose()?;

    let user = app_state
        .user_service
        .update_user(user_id, &request, password_hash)
        .await?;
    Ok(user.to_response())
}
