use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::User,
    services::database::Database,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    Extension, RequestPartsExt, TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AuthService {
    db: Arc<Database>,
    jwt_secret: String,
    jwt_expiry_hours: i64,
}

/// JWT claims, including the portal's custom identity fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub is_staff: bool,
    pub exp: i64,
    pub iat: i64,
}

impl AuthService {
    pub fn new(db: Arc<Database>, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiry_hours: config.jwt_expiry_hours,
        })
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Issue an access token carrying the user's identity claims.
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            document: user.full_document(),
            is_staff: user.is_staff,
            exp: (now + Duration::hours(self.jwt_expiry_hours)).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?;
        Ok(token)
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::Authentication("Invalid token".to_string()))
            }
        }
    }

    /// Authenticate with username/password, returning the token and user.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User)> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| {
                AppError::Authentication(
                    "No active account found with the given credentials".to_string(),
                )
            })?;

        if !user.is_active || !self.verify_password(password, &user.password_hash)? {
            return Err(AppError::Authentication(
                "No active account found with the given credentials".to_string(),
            ));
        }

        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db.pool)
            .await?;

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }
}

/// Authenticated user extractor: Bearer token verified against the
/// local user store.
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing authorization header".to_string()))?;

        let Extension(auth_service): Extension<AuthService> = parts
            .extract::<Extension<AuthService>>()
            .await
            .map_err(|_| AppError::Internal("Auth service not found in request extensions".to_string()))?;

        let claims = auth_service.verify_jwt(bearer.token())?;
        let user_id = Uuid::from_str(&claims.sub)
            .map_err(|_| AppError::Authentication("Invalid token subject".to_string()))?;

        let user = auth_service.get_user(user_id).await?;
        if !user.is_active {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }

        Ok(AuthUser(user))
    }
}

/// Elevated-privilege extractor: authenticated user with staff flag.
pub struct AdminUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(AppError::Authorization(
                "Staff privileges required".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}
