use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::UserRole;

/// Self-registration body. Absent and `null` fields both default to empty so
/// that they surface as a single "Missing required fields" error.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(max = 64, message = "username must be at most 64 characters"))]
    pub(crate) username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub(crate) password: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(max = 100, message = "first_name must be at most 100 characters"))]
    pub(crate) first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(max = 100, message = "last_name must be at most 100 characters"))]
    pub(crate) last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub(crate) role: String,
}

impl RegisterRequest {
    pub(crate) fn has_blank_field(&self) -> bool {
        [&self.username, &self.password, &self.first_name, &self.last_name, &self.email, &self.role]
            .iter()
            .any(|value| value.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub(crate) username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminUserCreate {
    #[validate(length(min = 1, max = 64, message = "username must be 1-64 characters"))]
    pub(crate) username: String,
    pub(crate) password: String,
    #[validate(length(min = 1, max = 100, message = "first_name must not be empty"))]
    pub(crate) first_name: String,
    #[validate(length(min = 1, max = 100, message = "last_name must not be empty"))]
    pub(crate) last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    pub(crate) role: UserRole,
    #[serde(default = "default_true")]
    pub(crate) active: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct AdminUserUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "first_name must not be empty"))]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "last_name must not be empty"))]
    pub(crate) last_name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    pub(crate) active: Option<bool>,
    #[serde(default)]
    pub(crate) password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) role: UserRole,
    pub(crate) active: bool,
    pub(crate) created_at: String,
    pub(crate) last_login: Option<String>,
}

impl UserResponse {
    pub(crate) fn from_db(user: crate::db::models::User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            active: user.active,
            created_at: format_primitive(user.created_at),
            last_login: user.last_login.map(format_primitive),
        }
    }
}

fn default_true() -> bool {
    true
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_detects_blank_fields() {
        let payload: RegisterRequest =
            serde_json::from_str(r#"{"username":"ann","password":"secret123"}"#).unwrap();
        assert!(payload.has_blank_field());

        let payload = RegisterRequest {
            username: "ann".into(),
            password: "secret123".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: "ann@example.edu".into(),
            role: "   ".into(),
        };
        assert!(payload.has_blank_field());
    }

    #[test]
    fn null_fields_count_as_missing() {
        let payload: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": null,
            "password": "secret123",
            "first_name": "Ann",
            "last_name": "Lee",
            "email": "ann@example.edu",
            "role": "student",
        }))
        .unwrap();
        assert_eq!(payload.username, "");
        assert!(payload.has_blank_field());

        let login: LoginRequest =
            serde_json::from_str(r#"{"username":"ann","password":null}"#).unwrap();
        assert!(login.password.is_empty());
    }

    #[test]
    fn register_request_rejects_invalid_email() {
        let payload = RegisterRequest {
            username: "ann".into(),
            password: "secret123".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: "not-an-email".into(),
            role: "student".into(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn admin_update_validates_present_fields_only() {
        let payload: AdminUserUpdate = serde_json::from_str(r#"{"active":false}"#).unwrap();
        assert!(payload.validate().is_ok());

        let payload: AdminUserUpdate = serde_json::from_str(r#"{"email":"nope"}"#).unwrap();
        assert!(payload.validate().is_err());
    }
}
