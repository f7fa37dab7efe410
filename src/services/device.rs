use crate::{
    error::{AppError, Result},
    models::device::{Device, RegisterDeviceRequest},
    services::database::Database,
};
use sqlx::Row;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Push device registry: one row per client installation.
#[derive(Clone)]
pub struct DeviceService {
    db: Arc<Database>,
}

impl DeviceService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a device, re-assigning the token if it already exists
    /// (a reinstalled app keeps its token but may change owner).
    pub async fn register_device(
        &self,
        user_id: Uuid,
        request: &RegisterDeviceRequest,
    ) -> Result<Device> {
        let token = request.registration_token.trim();
        if token.is_empty() {
            return Err(AppError::Validation(
                "registration_token cannot be empty".to_string(),
            ));
        }

        let device = sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices (user_id, registration_token, name, device_type, active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (registration_token)
            DO UPDATE SET user_id = $1, name = $3, device_type = $4, active = $5
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(&request.name)
        .bind(request.device_type.as_str())
        .bind(request.active.unwrap_or(true))
        .fetch_one(&self.db.pool)
        .await?;

        info!("Registered device {} for user {}", device.id, user_id);
        Ok(device)
    }

    pub async fn get_user_devices(&self, user_id: Uuid) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(devices)
    }

    /// Active registrations owned by one user.
    pub async fn get_active_user_devices(&self, user_id: Uuid) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices WHERE user_id = $1 AND active = TRUE ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;
        debug!("User {} has {} active devices", user_id, devices.len());
        Ok(devices)
    }

    /// All active registrations system-wide (broadcast target set).
    pub async fn get_all_active_devices(&self) -> Result<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(
            "SELECT * FROM devices WHERE active = TRUE ORDER BY created_at DESC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(devices)
    }

    pub async fn count_active_devices(&self) -> Result<i64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM devices WHERE active = TRUE")
            .fetch_one(&self.db.pool)
            .await?
            .try_get(0)?;
        Ok(count)
    }

    /// Distinct users owning at least one active device.
    pub async fn count_users_with_devices(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query("SELECT COUNT(DISTINCT user_id) FROM devices WHERE active = TRUE")
                .fetch_one(&self.db.pool)
                .await?
                .try_get(0)?;
        Ok(count)
    }

    pub async fn deactivate_device(&self, user_id: Uuid, device_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE devices SET active = FALSE WHERE id = $1 AND user_id = $2",
        )
        .bind(device_id)
        .bind(user_id)
        .execute(&self.db.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Device"));
        }
        info!("Deactivated device {} for user {}", device_id, user_id);
        Ok(())
    }

    pub async fn delete_device(&self, user_id: Uuid, device_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1 AND user_id = $2")
            .bind(device_id)
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Device"));
        }
        info!("Deleted device {} for user {}", device_id, user_id);
        Ok(())
    }
}
