use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Identity document types valid in Venezuela.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    V,
    E,
    P,
    J,
    G,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::V => "V",
            DocumentType::E => "E",
            DocumentType::P => "P",
            DocumentType::J => "J",
            DocumentType::G => "G",
        }
    }

    /// Human-readable label shown to frontend clients.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::V => "Cédula de Identidad Venezolana",
            DocumentType::E => "Cédula de Extranjero",
            DocumentType::P => "Pasaporte",
            DocumentType::J => "RIF Jurídico",
            DocumentType::G => "RIF Gubernamental",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "V" => Ok(DocumentType::V),
            "E" => Ok(DocumentType::E),
            "P" => Ok(DocumentType::P),
            "J" => Ok(DocumentType::J),
            "G" => Ok(DocumentType::G),
            other => Err(format!("invalid document type: {}", other)),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Document with its type prefix (e.g. "V-12345678"), or `None`
    /// unless both parts are present.
    pub fn full_document(&self) -> Option<String> {
        match (&self.document_type, &self.document_number) {
            (Some(tipo), Some(numero)) => Some(format!("{}-{}", tipo.as_str(), numero)),
            _ => None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            address: self.address.clone(),
            document_type: self.document_type,
            document_type_display: self.document_type.map(|t| t.label().to_string()),
            document_number: self.document_number.clone(),
            full_document: self.full_document(),
            is_active: self.is_active,
            is_staff: self.is_staff,
            date_joined: self.date_joined,
        }
    }

    pub fn to_profile_response(&self) -> UserProfileResponse {
        UserProfileResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name(),
            address: self.address.clone(),
            document_type: self.document_type,
            document_number: self.document_number.clone(),
            full_document: self.full_document(),
            is_active: self.is_active,
            is_staff: self.is_staff,
            date_joined: self.date_joined,
            last_login: self.last_login,
        }
    }
}

impl<'r> sqlx::FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        let document_type: Option<String> = row.try_get("document_type")?;
        let document_type = document_type
            .map(|s| DocumentType::from_str(&s))
            .transpose()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            address: row.try_get("address")?,
            document_type,
            document_number: row.try_get("document_number")?,
            is_active: row.try_get("is_active")?,
            is_staff: row.try_get("is_staff")?,
            date_joined: row.try_get("date_joined")?,
            last_login: row.try_get("last_login")?,
        })
    }
}

/// Strip spaces and dashes so the stored number is digits-and-letters only.
pub fn normalize_document(raw: &str) -> String {
    raw.chars().filter(|c| *c != ' ' && *c != '-').collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_type_display: Option<String>,
    pub document_number: Option<String>,
    pub full_document: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub address: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub full_document: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 3, max = 30, message = "username must be 3-30 characters"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
    #[validate(length(max = 500, message = "address is too long"))]
    pub address: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(length(max = 500, message = "address is too long"))]
    pub address: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "jperez".to_string(),
            email: "jperez@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Juan".to_string(),
            last_name: "Pérez".to_string(),
            address: None,
            document_type: Some(DocumentType::V),
            document_number: Some("12345678".to_string()),
            is_active: true,
            is_staff: false,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_full_document_format() {
        let user = sample_user();
        assert_eq!(user.full_document(), Some("V-12345678".to_string()));
    }

    #[test]
    fn test_full_document_requires_both_parts() {
        let mut user = sample_user();
        user.document_number = None;
        assert_eq!(user.full_document(), None);

        user.document_number = Some("12345678".to_string());
        user.document_type = None;
        assert_eq!(user.full_document(), None);
    }

    #[test]
    fn test_normalize_document() {
        assert_eq!(normalize_document("12 345-678"), "12345678");
        assert_eq!(normalize_document("V-12345678"), "V12345678");
        assert_eq!(normalize_document("12345678"), "12345678");
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!(DocumentType::from_str("V"), Ok(DocumentType::V));
        assert_eq!(DocumentType::from_str("G"), Ok(DocumentType::G));
        assert!(DocumentType::from_str("X").is_err());
    }
}
