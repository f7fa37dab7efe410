use crate::{
    error::{AppError, Result},
    models::user::{normalize_document, DocumentType},
};
use regex::Regex;
use std::sync::OnceLock;

/// Validate a Venezuelan identity document number against its type.
///
/// Cédulas (V/E) and RIF-style documents (J/G) are numeric; passports
/// may carry letters. Numbers are normalized (spaces and dashes
/// stripped) before checking.
pub fn validate_document(document_type: DocumentType, number: &str) -> Result<String> {
    let normalized = normalize_document(number);
    if normalized.is_empty() {
        return Err(AppError::Validation(
            "El número de documento no puede estar vacío".to_string(),
        ));
    }
    if normalized.len() > 20 {
        return Err(AppError::Validation(
            "El número de documento es demasiado largo".to_string(),
        ));
    }

    let valid = match document_type {
        DocumentType::P => passport_regex().is_match(&normalized),
        _ => numeric_regex().is_match(&normalized),
    };

    if !valid {
        return Err(AppError::Validation(format!(
            "Número de documento inválido para el tipo {}",
            document_type.label()
        )));
    }

    Ok(normalized)
}

fn numeric_regex() -> &'static Regex {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    NUMERIC.get_or_init(|| Regex::new(r"^\d{1,20}$").unwrap())
}

fn passport_regex() -> &'static Regex {
    static PASSPORT: OnceLock<Regex> = OnceLock::new();
    PASSPORT.get_or_init(|| Regex::new(r"^[A-Za-z0-9]{1,20}$").unwrap())
}

/// Username restricted to letters, digits, underscore and hyphen.
pub fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation(
            "El nombre de usuario no puede estar vacío".to_string(),
        ));
    }
    if username.len() < 3 {
        return Err(AppError::Validation(
            "El nombre de usuario debe tener al menos 3 caracteres".to_string(),
        ));
    }
    if username.len() > 30 {
        return Err(AppError::Validation(
            "El nombre de usuario no puede superar 30 caracteres".to_string(),
        ));
    }

    static USERNAME: OnceLock<Regex> = OnceLock::new();
    let pattern = USERNAME.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());
    if !pattern.is_match(username) {
        return Err(AppError::Validation(
            "El nombre de usuario solo puede contener letras, números, guiones y guiones bajos"
                .to_string(),
        ));
    }

    Ok(())
}

/// Passwords must match and satisfy the minimum length.
pub fn validate_password_pair(password: &str, password_confirm: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "La contraseña debe tener al menos 8 caracteres".to_string(),
        ));
    }
    if password != password_confirm {
        return Err(AppError::Validation(
            "Las contraseñas no coinciden".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cedula_is_numeric_only() {
        assert_eq!(
            validate_document(DocumentType::V, "12 345 678").unwrap(),
            "12345678"
        );
        assert!(validate_document(DocumentType::V, "A123").is_err());
        assert!(validate_document(DocumentType::E, "  ").is_err());
    }

    #[test]
    fn test_passport_allows_letters() {
        assert_eq!(
            validate_document(DocumentType::P, "AB-123456").unwrap(),
            "AB123456"
        );
        assert!(validate_document(DocumentType::P, "AB 1234!").is_err());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("maria_p-23").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("con espacios").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn test_password_pair() {
        assert!(validate_password_pair("segura123", "segura123").is_ok());
        assert!(validate_password_pair("corta", "corta").is_err());
        assert!(validate_password_pair("segura123", "distinta123").is_err());
    }
}
