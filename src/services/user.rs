use crate::{
    error::{AppError, Result},
    models::user::{normalize_document, DocumentType, RegisterUserRequest, UpdateUserRequest, User},
    services::database::{Database, PaginatedResult},
};
use sqlx::{Postgres, QueryBuilder, Row};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserListFilter {
    pub search: Option<String>,
    pub document_type: Option<DocumentType>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new account. The password is already hashed by the caller.
    pub async fn create_user(&self, request: &RegisterUserRequest, password_hash: String) -> Result<User> {
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
                .bind(&request.username)
                .bind(&request.email)
                .fetch_optional(&self.db.pool)
                .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "A user with that username or email already exists".to_string(),
            ));
        }

        let document_number = request.document_number.as_deref().map(normalize_document);

        if let (Some(tipo), Some(numero)) = (&request.document_type, &document_number) {
            let duplicate: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM users WHERE document_type = $1 AND document_number = $2",
            )
            .bind(tipo.as_str())
            .bind(numero)
            .fetch_optional(&self.db.pool)
            .await?;
            if duplicate.is_some() {
                return Err(AppError::Conflict(
                    "That document is already registered".to_string(),
                ));
            }
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name,
                               address, document_type, document_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.address)
        .bind(request.document_type.map(|t| t.as_str()))
        .bind(&document_number)
        .fetch_one(&self.db.pool)
        .await?;

        info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// List users with optional search and filters.
    pub async fn get_users(
        &self,
        page: usize,
        per_page: usize,
        filter: UserListFilter,
    ) -> Result<PaginatedResult<User>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");

        for builder in [&mut query, &mut count_query] {
            if let Some(search) = &filter.search {
                let pattern = format!("%{}%", search);
                builder
                    .push(" AND (username ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR first_name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR last_name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR document_number ILIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            if let Some(tipo) = filter.document_type {
                builder.push(" AND document_type = ").push_bind(tipo.as_str());
            }
            if let Some(is_active) = filter.is_active {
                builder.push(" AND is_active = ").push_bind(is_active);
            }
        }

        let total: i64 = count_query
            .build()
            .fetch_one(&self.db.pool)
            .await?
            .try_get(0)?;

        let offset = (page.saturating_sub(1)) * per_page;
        query
            .push(" ORDER BY username ASC LIMIT ")
            .push_bind(per_page as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let users = query
            .build_query_as::<User>()
            .fetch_all(&self.db.pool)
            .await?;

        debug!("Fetched {} of {} users", users.len(), total);
        Ok(PaginatedResult::new(users, total as usize, page, per_page))
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    /// Partial update; `password_hash` is set by the caller when the
    /// password changes.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: &UpdateUserRequest,
        password_hash: Option<String>,
    ) -> Result<User> {
        let current = self
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let document_number = request
            .document_number
            .as_deref()
            .map(normalize_document)
            .or(current.document_number);
        let document_type = request.document_type.or(current.document_type);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2,
                password_hash = $3,
                first_name = $4,
                last_name = $5,
                address = $6,
                document_type = $7,
                document_number = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(request.email.as_ref().unwrap_or(&current.email))
        .bind(password_hash.unwrap_or(current.password_hash))
        .bind(request.first_name.as_ref().unwrap_or(&current.first_name))
        .bind(request.last_name.as_ref().unwrap_or(&current.last_name))
        .bind(request.address.clone().or(current.address.clone()))
        .bind(document_type.map(|t| t.as_str()))
        .bind(&document_number)
        .fetch_one(&self.db.pool)
        .await?;

        info!("Updated user {}", user_id);
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        info!("Deleted user {}", user_id);
        Ok(())
    }
}
