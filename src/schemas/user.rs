use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserCreate {
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8..128 characters long"))]
    pub(crate) password: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name must be 1..100 characters long"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserLogin {
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name must be 1..100 characters long"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Password must be 8..128 characters long"))]
    pub(crate) password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) role: UserRole,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: format_primitive(user.created_at),
            updated_at: format_primitive(user.updated_at),
        }
    }
}

/// Display name used when signup omits one: the local part of the email.
pub(crate) fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_rejects_bad_email_and_short_password() {
        let payload: UserCreate =
            serde_json::from_value(serde_json::json!({"email": "nope", "password": "short"}))
                .expect("payload");
        let errors = payload.validate().expect_err("invalid");
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn signup_accepts_minimal_payload() {
        let payload: UserCreate = serde_json::from_value(serde_json::json!({
            "email": "ada@example.com",
            "password": "long-enough"
        }))
        .expect("payload");
        assert!(payload.validate().is_ok());
        assert!(payload.name.is_none());
        assert!(payload.role.is_none());
    }

    #[test]
    fn default_name_uses_local_part() {
        assert_eq!(default_name("ada@example.com"), "ada");
        assert_eq!(default_name("plain"), "plain");
    }
}
