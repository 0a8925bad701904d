use validator::Validate;

use crate::api::errors::ApiError;

/// Runs the derived validators, reporting every failing field in one message.
pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|errors| {
        let mut messages = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value for {field}"),
                })
            })
            .collect::<Vec<_>>();
        messages.sort();

        if messages.is_empty() {
            ApiError::BadRequest(errors.to_string())
        } else {
            ApiError::BadRequest(messages.join("; "))
        }
    })
}

/// Emails are compared and stored lower-cased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn require_text(value: &str, message: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::BadRequest(message.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::skill::SkillCreate;

    #[test]
    fn validate_payload_reports_field_messages() {
        let payload = SkillCreate { name: String::new(), category: "Backend".to_string() };
        match validate_payload(&payload) {
            Err(ApiError::BadRequest(message)) => {
                assert_eq!(message, "Skill name must be 1..100 characters long");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn require_text_rejects_blank() {
        assert!(require_text("   ", "Name is required").is_err());
        assert!(require_text("Redis", "Name is required").is_ok());
    }
}
