use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Android,
    Ios,
    Web,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Android => "android",
            DeviceType::Ios => "ios",
            DeviceType::Web => "web",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::Android => "Android",
            DeviceType::Ios => "iOS",
            DeviceType::Web => "Web",
        }
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "android" => Ok(DeviceType::Android),
            "ios" => Ok(DeviceType::Ios),
            "web" => Ok(DeviceType::Web),
            other => Err(format!("invalid device type: {}", other)),
        }
    }
}

/// One push-capable client installation owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub user_id: Uuid,
    pub registration_token: String,
    pub name: Option<String>,
    pub device_type: DeviceType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn to_response(&self) -> DeviceResponse {
        DeviceResponse {
            id: self.id,
            name: self.name.clone().unwrap_or_else(|| "Sin nombre".to_string()),
            device_type: self.device_type,
            device_type_display: self.device_type.label().to_string(),
            active: self.active,
            created_at: self.created_at,
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for Device {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        let device_type: String = row.try_get("device_type")?;

        Ok(Device {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            registration_token: row.try_get("registration_token")?,
            name: row.try_get("name")?,
            device_type: device_type
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceResponse {
    pub id: Uuid,
    pub name: String,
    pub device_type: DeviceType,
    pub device_type_display: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDeviceRequest {
    pub registration_token: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_labels() {
        assert_eq!(DeviceType::Android.label(), "Android");
        assert_eq!(DeviceType::Ios.label(), "iOS");
        assert_eq!(DeviceType::Web.label(), "Web");
    }

    #[test]
    fn test_unnamed_device_display() {
        let device = Device {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            registration_token: "tok".to_string(),
            name: None,
            device_type: DeviceType::Android,
            active: true,
            created_at: Utc::now(),
        };
        assert_eq!(device.to_response().name, "Sin nombre");
    }
}
