use crate::{error::AppError, state::AppState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Authentication middleware.
///
/// Makes the auth service available to the extractors through request
/// extensions, and eagerly resolves the current user when a valid
/// Bearer token is present. Requests without (or with invalid)
/// credentials continue unauthenticated; protected handlers reject
/// them through their extractors.
pub async fn auth_middleware(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next<Body>,
) -> Result<Response, AppError> {
    request
        .extensions_mut()
        .insert(app_state.auth_service.clone());

    if let Some(auth_header) = headers.get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                match app_state.auth_service.verify_jwt(token) {
                    Ok(claims) => {
                        if let Ok(user_id) = Uuid::from_str(&claims.sub) {
                            match app_state.auth_service.get_user(user_id).await {
                                Ok(user) => {
                                    debug!("Authenticated user {} ({})", user.username, user.id);
                                    request.extensions_mut().insert(user);
                                }
                                Err(e) => {
                                    debug!("Token subject no longer resolves to a user: {}", e);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        debug!("JWT verification failed: {}", e);
                    }
                }
            }
        }
    }

    Ok(next.run(request).await)
}
