use crate::{
    error::{AppError, Result},
    models::user::{LoginRequest, RegisterUserRequest},
    services::auth::AuthUser,
    state::AppState,
    utils::validation,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify_token))
}

/// Register a new account.
/// POST /api/v1/auth/register
pub async fn register(
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
    let token = app_state.auth_service.issue_token(&user)?;

    info!("Registered user {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "access": token,
                "user": user.to_response(),
            }
        })),
    ))
}

/// Authenticate and obtain an access token.
/// POST /api/v1/auth/login
pub async fn login(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let (token, user) = app_state
        .auth_service
        .login(&request.username, &request.password)
        .await?;

    debug!("User {} logged in", user.username);

    Ok(Json(json!({
        "success": true,
        "data": {
            "access": token,
            "user": user.to_response(),
        }
    })))
}

/// Validate the caller's token and echo the account it belongs to.
/// GET /api/v1/auth/verify
pub async fn verify_token(AuthUser(user): AuthUser) -> Result<Json<Value>> {
    Ok(Json(json!({
        "success": true,
        "data": {
            "valid": true,
            "user": user.to_response(),
        }
    })))
}
