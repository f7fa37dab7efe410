use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Test,
    User,
    Broadcast,
    Admin,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Test => "test",
            NotificationCategory::User => "user",
            NotificationCategory::Broadcast => "broadcast",
            NotificationCategory::Admin => "admin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NotificationCategory::Test => "Prueba",
            NotificationCategory::User => "Usuario Específico",
            NotificationCategory::Broadcast => "Broadcast",
            NotificationCategory::Admin => "Administrador",
        }
    }
}

impl FromStr for NotificationCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "test" => Ok(NotificationCategory::Test),
            "user" => Ok(NotificationCategory::User),
            "broadcast" => Ok(NotificationCategory::Broadcast),
            "admin" => Ok(NotificationCategory::Admin),
            other => Err(format!("invalid notification category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "Pendiente",
            NotificationStatus::Sent => "Enviado",
            NotificationStatus::Failed => "Fallido",
        }
    }

    /// Badge color used by the operator frontend.
    pub fn color(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "#ffc107",
            NotificationStatus::Sent => "#28a745",
            NotificationStatus::Failed => "#dc3545",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            other => Err(format!("invalid notification status: {}", other)),
        }
    }
}

/// Append-only audit row describing one send attempt and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub target_user_id: Option<Uuid>,
    pub sent_by: Uuid,
    pub devices_count: i32,
    pub status: NotificationStatus,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
    pub data_payload: serde_json::Value,
}

impl NotificationRecord {
    pub fn to_response(&self) -> NotificationRecordResponse {
        NotificationRecordResponse {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            category: self.category,
            category_display: self.category.label().to_string(),
            target_user_id: self.target_user_id,
            sent_by: self.sent_by,
            devices_count: self.devices_count,
            status: self.status,
            status_display: self.status.label().to_string(),
            status_color: self.status.color().to_string(),
            error_message: self.error_message.clone(),
            created_at: self.created_at,
            data_payload: self.data_payload.clone(),
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for NotificationRecord {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        let category: String = row.try_get("category")?;
        let status: String = row.try_get("status")?;

        Ok(NotificationRecord {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            category: category
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            target_user_id: row.try_get("target_user_id")?,
            sent_by: row.try_get("sent_by")?,
            devices_count: row.try_get("devices_count")?,
            status: status
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            data_payload: row.try_get("data_payload")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecordResponse {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub category_display: String,
    pub target_user_id: Option<Uuid>,
    pub sent_by: Uuid,
    pub devices_count: i32,
    pub status: NotificationStatus,
    pub status_display: String,
    pub status_color: String,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
    pub data_payload: serde_json::Value,
}

/// Self-test send; title/body default when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct SendTestRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendToUserRequest {
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

/// Operator send flow (replaces the legacy admin form): explicit category
/// plus the action/url/custom-JSON payload fields.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSendRequest {
    pub notification_type: String,
    pub target_user_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub data_action: Option<String>,
    pub data_url: Option<String>,
    pub data_custom: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDevicesRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationStats {
    pub total_notifications: i64,
    pub sent_today: i64,
    pub active_devices: i64,
    pub users_with_devices: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("broadcast".parse(), Ok(NotificationCategory::Broadcast));
        assert_eq!("user".parse(), Ok(NotificationCategory::User));
        assert!("invalid-value".parse::<NotificationCategory>().is_err());
    }

    #[test]
    fn test_status_badge_colors() {
        assert_eq!(NotificationStatus::Pending.color(), "#ffc107");
        assert_eq!(NotificationStatus::Sent.color(), "#28a745");
        assert_eq!(NotificationStatus::Failed.color(), "#dc3545");
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(NotificationCategory::Test.label(), "Prueba");
        assert_eq!(NotificationCategory::Broadcast.label(), "Broadcast");
    }
}
