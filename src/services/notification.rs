use crate::{
    error::{AppError, Result},
    models::{
        device::Device,
        notification::{NotificationCategory, NotificationRecord, NotificationStats},
        user::User,
    },
    services::{
        database::Database,
        device::DeviceService,
        push::{PushGateway, PushMessage},
    },
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Target of a dispatch: a specific user (by id or username) or every
/// active device in the system.
#[derive(Debug, Clone)]
pub enum DispatchTarget {
    Broadcast,
    UserId(Uuid),
    Username(String),
}

/// Outcome of a completed dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub record: NotificationRecord,
    pub devices_count: usize,
    pub message: String,
}

/// Persistence collaborator of the dispatcher: the audit-record
/// lifecycle plus target resolution reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DispatchStore: Send + Sync {
    async fn create_record(
        &self,
        title: String,
        body: String,
        category: NotificationCategory,
        target_user_id: Option<Uuid>,
        sent_by: Uuid,
        data: Value,
    ) -> Result<NotificationRecord>;
    async fn set_target_user(&self, record_id: Uuid, target_user_id: Uuid) -> Result<()>;
    async fn mark_sent(&self, record_id: Uuid, devices_count: i32) -> Result<NotificationRecord>;
    async fn mark_failed(&self, record_id: Uuid, error_message: String)
        -> Result<NotificationRecord>;
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: String) -> Result<Option<User>>;
    async fn active_user_devices(&self, user_id: Uuid) -> Result<Vec<Device>>;
    async fn all_active_devices(&self) -> Result<Vec<Device>>;
    async fn recent_records(&self, limit: i64) -> Result<Vec<NotificationRecord>>;
    async fn stats(&self) -> Result<NotificationStats>;
}

/// Postgres-backed store used in production.
pub struct PgDispatchStore {
    db: Arc<Database>,
    devices: DeviceService,
}

#[async_trait]
impl DispatchStore for PgDispatchStore {
    async fn create_record(
        &self,
        title: String,
        body: String,
        category: NotificationCategory,
        target_user_id: Option<Uuid>,
        sent_by: Uuid,
        data: Value,
    ) -> Result<NotificationRecord> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            INSERT INTO notification_records
                (title, body, category, target_user_id, sent_by, data_payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(body)
        .bind(category.as_str())
        .bind(target_user_id)
        .bind(sent_by)
        .bind(data)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(record)
    }

    async fn set_target_user(&self, record_id: Uuid, target_user_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE notification_records SET target_user_id = $2 WHERE id = $1")
            .bind(record_id)
            .bind(target_user_id)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn mark_sent(&self, record_id: Uuid, devices_count: i32) -> Result<NotificationRecord> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            UPDATE notification_records
            SET status = 'sent', devices_count = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(devices_count)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(record)
    }

    async fn mark_failed(
        &self,
        record_id: Uuid,
        error_message: String,
    ) -> Result<NotificationRecord> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            r#"
            UPDATE notification_records
            SET status = 'failed', error_message = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(error_message)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(record)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: String) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    async fn active_user_devices(&self, user_id: Uuid) -> Result<Vec<Device>> {
        self.devices.get_active_user_devices(user_id).await
    }

    async fn all_active_devices(&self) -> Result<Vec<Device>> {
        self.devices.get_all_active_devices().await
    }

    async fn recent_records(&self, limit: i64) -> Result<Vec<NotificationRecord>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            "SELECT * FROM notification_records ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(records)
    }

    async fn stats(&self) -> Result<NotificationStats> {
        let total: i64 = sqlx::query("SELECT COUNT(*) FROM notification_records")
            .fetch_one(&self.db.pool)
            .await?
            .try_get(0)?;

        let sent_today: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) FROM notification_records
            WHERE status = 'sent' AND created_at >= date_trunc('day', NOW())
            "#,
        )
        .fetch_one(&self.db.pool)
        .await?
        .try_get(0)?;

        Ok(NotificationStats {
            total_notifications: total,
            sent_today,
            active_devices: self.devices.count_active_devices().await?,
            users_with_devices: self.devices.count_users_with_devices().await?,
        })
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn DispatchStore>,
    gateway: Arc<dyn PushGateway>,
}

impl NotificationService {
    pub fn new(db: Arc<Database>, devices: DeviceService, gateway: Arc<dyn PushGateway>) -> Self {
        Self {
            store: Arc::new(PgDispatchStore { db, devices }),
            gateway,
        }
    }

    #[cfg(test)]
    fn with_store(store: Arc<dyn DispatchStore>, gateway: Arc<dyn PushGateway>) -> Self {
        Self { store, gateway }
    }

    /// Run one send attempt end to end: validate, create the audit
    /// record, resolve targets, deliver, record the outcome.
    ///
    /// The record is created after input validation and before target
    /// resolution, so every resolution or delivery failure leaves a
    /// `failed` row behind, while invalid input leaves none.
    pub async fn dispatch(
        &self,
        sent_by: &User,
        category: NotificationCategory,
        target: DispatchTarget,
        title: &str,
        body: &str,
        data: Map<String, Value>,
    ) -> Result<DispatchReport> {
        let (title, body) = validate_message(title, body)?;

        // Category/target mismatch is invalid input: rejected before
        // any record exists.
        if !matches!(target, DispatchTarget::Broadcast)
            && matches!(
                category,
                NotificationCategory::Broadcast | NotificationCategory::Admin
            )
        {
            return Err(AppError::BadRequest(
                "Tipo de notificación inválido".to_string(),
            ));
        }

        let known_target_id = match &target {
            DispatchTarget::UserId(id) => Some(*id),
            _ => None,
        };

        let record = self
            .store
            .create_record(
                title.clone(),
                body.clone(),
                category,
                known_target_id,
                sent_by.id,
                Value::Object(data.clone()),
            )
            .await?;

        match self
            .resolve_and_send(&record, &target, &title, &body, data)
            .await
        {
            Ok((devices_count, message)) => {
                let record = self.store.mark_sent(record.id, devices_count as i32).await?;
                info!(
                    "Notification {} sent to {} devices ({})",
                    record.id, devices_count, category.as_str()
                );
                Ok(DispatchReport {
                    record,
                    devices_count,
                    message,
                })
            }
            Err(e) => {
                warn!("Notification {} failed: {}", record.id, e);
                if let Err(mark_err) = self.store.mark_failed(record.id, e.to_string()).await {
                    error!("Failed to record notification outcome: {}", mark_err);
                }
                Err(e)
            }
        }
    }

    /// Resolution plus the external delivery call; every error path here
    /// leaves the audit record marked failed by the caller.
    async fn resolve_and_send(
        &self,
        record: &NotificationRecord,
        target: &DispatchTarget,
        title: &str,
        body: &str,
        data: Map<String, Value>,
    ) -> Result<(usize, String)> {
        let (devices, success_message) = match target {
            DispatchTarget::Broadcast => {
                let devices = self.store.all_active_devices().await?;
                (
                    devices,
                    "Notificación broadcast enviada a todos los usuarios".to_string(),
                )
            }
            DispatchTarget::UserId(_) | DispatchTarget::Username(_) => {
                let user = self.resolve_target_user(target).await?;
                if record.target_user_id != Some(user.id) {
                    self.store.set_target_user(record.id, user.id).await?;
                }
                let devices = self.store.active_user_devices(user.id).await?;
                (devices, format!("Notificación enviada a {}", user.username))
            }
        };

        if devices.is_empty() {
            return Err(AppError::NotFound(
                "No hay dispositivos activos para el objetivo seleccionado".to_string(),
            ));
        }

        let tokens: Vec<String> = devices
            .iter()
            .map(|d: &Device| d.registration_token.clone())
            .collect();

        let message = PushMessage {
            title: title.to_string(),
            body: body.to_string(),
            data,
        };

        // Single synchronous batch call; any error is an aggregate
        // failure for the whole target set.
        self.gateway.send(&tokens, &message).await?;

        Ok((devices.len(), success_message))
    }

    async fn resolve_target_user(&self, target: &DispatchTarget) -> Result<User> {
        let user = match target {
            DispatchTarget::UserId(id) => self.store.find_user_by_id(*id).await?,
            DispatchTarget::Username(username) => {
                self.store.find_user_by_username(username.clone()).await?
            }
            DispatchTarget::Broadcast => None,
        };
        user.ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))
    }

    /// Most recent audit records, newest first.
    pub async fn get_history(&self, limit: i64) -> Result<Vec<NotificationRecord>> {
        self.store.recent_records(limit).await
    }

    /// Operator dashboard numbers.
    pub async fn get_stats(&self) -> Result<NotificationStats> {
        self.store.stats().await
    }
}

/// Title and body must be non-empty after trimming; checked before any
/// record is written or any external call is made.
pub fn validate_message(title: &str, body: &str) -> Result<(String, String)> {
    let title = title.trim();
    let body = body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(AppError::Validation(
            "El título y el mensaje son obligatorios".to_string(),
        ));
    }
    Ok((title.to_string(), body.to_string()))
}

/// Operator-flow payload assembly: `action` and `url` first, then the
/// free-form JSON blob merged on top (it may overwrite both).
pub fn build_data_payload(
    action: Option<&str>,
    url: Option<&str>,
    custom_json: Option<&str>,
) -> Result<Map<String, Value>> {
    let mut payload = Map::new();

    if let Some(action) = action {
        if !action.is_empty() {
            payload.insert("action".to_string(), Value::String(action.to_string()));
        }
    }
    if let Some(url) = url {
        if !url.is_empty() {
            payload.insert("url".to_string(), Value::String(url.to_string()));
        }
    }

    if let Some(raw) = custom_json {
        if !raw.trim().is_empty() {
            let custom: Value = serde_json::from_str(raw).map_err(|_| {
                AppError::Validation(
                    "Los datos personalizados deben ser JSON válido".to_string(),
                )
            })?;
            let custom = custom.as_object().cloned().ok_or_else(|| {
                AppError::Validation(
                    "Los datos personalizados deben ser un objeto JSON".to_string(),
                )
            })?;
            for (key, value) in custom {
                payload.insert(key, value);
            }
        }
    }

    Ok(payload)
}

/// Coerce an optional request `data` value into the payload map.
pub fn data_object(data: Option<Value>) -> Result<Map<String, Value>> {
    match data {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(AppError::Validation(
            "data must be a JSON object".to_string(),
        )),
    }
}

/// Parse the operator-supplied category; only the explicit send
/// categories are accepted here.
pub fn parse_operator_category(raw: &str) -> Result<NotificationCategory> {
    match NotificationCategory::from_str(raw) {
        Ok(NotificationCategory::User) => Ok(NotificationCategory::User),
        Ok(NotificationCategory::Broadcast) => Ok(NotificationCategory::Broadcast),
        _ => Err(AppError::Validation(
            "Tipo de notificación inválido".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::DeviceType;
    use crate::models::notification::NotificationStatus;
    use crate::services::push::MockPushGateway;
    use chrono::Utc;
    use mockall::predicate::eq;
    use serde_json::json;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "jperez".to_string(),
            email: "jperez@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Juan".to_string(),
            last_name: "Pérez".to_string(),
            address: None,
            document_type: None,
            document_number: None,
            is_active: true,
            is_staff: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    fn pending_record(
        sent_by: &User,
        category: NotificationCategory,
        target_user_id: Option<Uuid>,
    ) -> NotificationRecord {
        NotificationRecord {
            id: Uuid::new_v4(),
            title: "Aviso".to_string(),
            body: "Cuerpo".to_string(),
            category,
            target_user_id,
            sent_by: sent_by.id,
            devices_count: 0,
            status: NotificationStatus::Pending,
            error_message: String::new(),
            created_at: Utc::now(),
            data_payload: json!({}),
        }
    }

    fn sample_device(user_id: Uuid, token: &str) -> Device {
        Device {
            id: Uuid::new_v4(),
            user_id,
            registration_token: token.to_string(),
            name: None,
            device_type: DeviceType::Android,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_marks_record_sent_with_resolved_device_count() {
        let user = sample_user();
        let record = pending_record(&user, NotificationCategory::User, Some(user.id));
        let record_id = record.id;

        let mut store = MockDispatchStore::new();
        {
            let record = record.clone();
            store
                .expect_create_record()
                .times(1)
                .returning(move |_, _, _, _, _, _| Ok(record.clone()));
        }
        {
            let resolved = user.clone();
            store
                .expect_find_user_by_id()
                .with(eq(user.id))
                .times(1)
                .returning(move |_| Ok(Some(resolved.clone())));
        }
        {
            let devices = vec![
                sample_device(user.id, "tok-1"),
                sample_device(user.id, "tok-2"),
            ];
            store
                .expect_active_user_devices()
                .with(eq(user.id))
                .times(1)
                .returning(move |_| Ok(devices.clone()));
        }
        {
            let mut sent = record.clone();
            sent.status = NotificationStatus::Sent;
            sent.devices_count = 2;
            store
                .expect_mark_sent()
                .with(eq(record_id), eq(2))
                .times(1)
                .returning(move |_, _| Ok(sent.clone()));
        }
        store.expect_mark_failed().times(0);

        let mut gateway = MockPushGateway::new();
        gateway
            .expect_send()
            .withf(|tokens, message| {
                tokens.len() == 2
                    && tokens[0] == "tok-1"
                    && tokens[1] == "tok-2"
                    && message.title == "Aviso"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = NotificationService::with_store(Arc::new(store), Arc::new(gateway));
        let report = service
            .dispatch(
                &user,
                NotificationCategory::User,
                DispatchTarget::UserId(user.id),
                "Aviso",
                "Cuerpo",
                Map::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.devices_count, 2);
        assert_eq!(report.record.status, NotificationStatus::Sent);
        assert_eq!(report.record.devices_count, 2);
        assert_eq!(report.message, "Notificación enviada a jperez");
    }

    #[tokio::test]
    async fn test_dispatch_empty_target_set_fails_record_without_sending() {
        let user = sample_user();
        let record = pending_record(&user, NotificationCategory::User, Some(user.id));
        let record_id = record.id;

        let mut store = MockDispatchStore::new();
        {
            let record = record.clone();
            store
                .expect_create_record()
                .times(1)
                .returning(move |_, _, _, _, _, _| Ok(record.clone()));
        }
        {
            let resolved = user.clone();
            store
                .expect_find_user_by_id()
                .times(1)
                .returning(move |_| Ok(Some(resolved.clone())));
        }
        store
            .expect_active_user_devices()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        {
            let mut failed = record.clone();
            failed.status = NotificationStatus::Failed;
            store
                .expect_mark_failed()
                .withf(move |id, message| {
                    *id == record_id && message.contains("dispositivos activos")
                })
                .times(1)
                .returning(move |_, _| Ok(failed.clone()));
        }

        let mut gateway = MockPushGateway::new();
        gateway.expect_send().times(0);

        let service = NotificationService::with_store(Arc::new(store), Arc::new(gateway));
        let err = service
            .dispatch(
                &user,
                NotificationCategory::User,
                DispatchTarget::UserId(user.id),
                "Aviso",
                "Cuerpo",
                Map::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dispatch_gateway_failure_fails_record() {
        let user = sample_user();
        let record = pending_record(&user, NotificationCategory::Broadcast, None);

        let mut store = MockDispatchStore::new();
        {
            let record = record.clone();
            store
                .expect_create_record()
                .times(1)
                .returning(move |_, _, _, _, _, _| Ok(record.clone()));
        }
        {
            let devices = vec![sample_device(Uuid::new_v4(), "tok-1")];
            store
                .expect_all_active_devices()
                .times(1)
                .returning(move || Ok(devices.clone()));
        }
        {
            let mut failed = record.clone();
            failed.status = NotificationStatus::Failed;
            store
                .expect_mark_failed()
                .withf(|_, message| message.contains("provider down"))
                .times(1)
                .returning(move |_, _| Ok(failed.clone()));
        }
        store.expect_mark_sent().times(0);

        let mut gateway = MockPushGateway::new();
        gateway
            .expect_send()
            .times(1)
            .returning(|_, _| Err(AppError::ExternalService("provider down".to_string())));

        let service = NotificationService::with_store(Arc::new(store), Arc::new(gateway));
        let err = service
            .dispatch(
                &user,
                NotificationCategory::Broadcast,
                DispatchTarget::Broadcast,
                "Aviso",
                "Cuerpo",
                Map::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_username_fails_record() {
        let user = sample_user();
        let record = pending_record(&user, NotificationCategory::User, None);

        let mut store = MockDispatchStore::new();
        {
            let record = record.clone();
            store
                .expect_create_record()
                .times(1)
                .returning(move |_, _, _, _, _, _| Ok(record.clone()));
        }
        store
            .expect_find_user_by_username()
            .with(eq("ghost".to_string()))
            .times(1)
            .returning(|_| Ok(None));
        {
            let mut failed = record.clone();
            failed.status = NotificationStatus::Failed;
            store
                .expect_mark_failed()
                .withf(|_, message| message.contains("Usuario no encontrado"))
                .times(1)
                .returning(move |_, _| Ok(failed.clone()));
        }
        store.expect_set_target_user().times(0);
        store.expect_active_user_devices().times(0);

        let mut gateway = MockPushGateway::new();
        gateway.expect_send().times(0);

        let service = NotificationService::with_store(Arc::new(store), Arc::new(gateway));
        let err = service
            .dispatch(
                &user,
                NotificationCategory::User,
                DispatchTarget::Username("ghost".to_string()),
                "Aviso",
                "Cuerpo",
                Map::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dispatch_category_target_mismatch_leaves_no_record() {
        let user = sample_user();

        let mut store = MockDispatchStore::new();
        store.expect_create_record().times(0);
        store.expect_mark_failed().times(0);

        let mut gateway = MockPushGateway::new();
        gateway.expect_send().times(0);

        let service = NotificationService::with_store(Arc::new(store), Arc::new(gateway));
        let err = service
            .dispatch(
                &user,
                NotificationCategory::Broadcast,
                DispatchTarget::UserId(user.id),
                "Aviso",
                "Cuerpo",
                Map::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_validate_message_trims() {
        let (title, body) = validate_message("  Hello ", " World  ").unwrap();
        assert_eq!(title, "Hello");
        assert_eq!(body, "World");
    }

    #[test]
    fn test_validate_message_rejects_whitespace_only() {
        assert!(validate_message("   ", "body").is_err());
        assert!(validate_message("title", "").is_err());
        assert!(validate_message("", "").is_err());
    }

    #[test]
    fn test_payload_merge_order() {
        let payload = build_data_payload(
            Some("open_app"),
            Some("https://portal.example.com"),
            Some(r#"{"url": "https://override.example.com", "promo": "n82"}"#),
        )
        .unwrap();

        // the custom blob silently overwrites url, action survives
        assert_eq!(payload["action"], json!("open_app"));
        assert_eq!(payload["url"], json!("https://override.example.com"));
        assert_eq!(payload["promo"], json!("n82"));
    }

    #[test]
    fn test_payload_malformed_json_aborts_whole_merge() {
        let result = build_data_payload(Some("open_app"), None, Some("{not json"));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_payload_rejects_non_object_custom_json() {
        let result = build_data_payload(None, None, Some("[1, 2, 3]"));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_payload_empty_fields_are_omitted() {
        let payload = build_data_payload(Some(""), None, None).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_data_object_accepts_object_only() {
        assert!(data_object(Some(json!({"type": "test"}))).is_ok());
        assert!(data_object(None).unwrap().is_empty());
        assert!(data_object(Some(json!("string"))).is_err());
    }

    #[test]
    fn test_operator_category_rejects_internal_categories() {
        assert_eq!(parse_operator_category("user").unwrap(), NotificationCategory::User);
        assert_eq!(parse_operator_category("broadcast").unwrap(), NotificationCategory::Broadcast);
        assert!(parse_operator_category("test").is_err());
        assert!(parse_operator_category("admin").is_err());
        assert!(parse_operator_category("invalid-value").is_err());
    }
}
