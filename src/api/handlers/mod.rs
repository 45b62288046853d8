//! Route handlers and the validation helpers they share.

pub mod health;
pub use self::health::health;

pub mod user_register;
pub use self::user_register::register;

pub mod user_login;
pub use self::user_login::login;

pub mod profile;
pub use self::profile::{names, profile, update_elo};


use crate::api::error::ApiError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use utoipa::ToSchema;
use uuid::Uuid;

pub const MAX_EMAIL_LENGTH: usize = 254;

/// Body used by every endpoint that only reports an outcome.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

    email.chars().count() <= MAX_EMAIL_LENGTH
        && EMAIL
            .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(email))
}

/// Returns the value when it is present and not empty.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub(crate) fn parse_uuid(uuid: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(uuid.trim()).map_err(|_| ApiError::bad_request("Invalid UUID"))
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("first.last+tag@sub.example.org"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("a b@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn valid_email_rejects_overlong() {
        let local = "a".repeat(MAX_EMAIL_LENGTH);
        assert!(!valid_email(&format!("{local}@example.com")));

        let at_limit = format!("{}@example.com", "a".repeat(MAX_EMAIL_LENGTH - 12));
        assert_eq!(at_limit.chars().count(), MAX_EMAIL_LENGTH);
        assert!(valid_email(&at_limit));
    }

    #[test]
    fn required_filters_empty() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some(String::new())), None);
        assert_eq!(required(Some("x".into())), Some("x".to_string()));
    }

    #[test]
    fn parse_uuid_rejects_garbage() {
        assert!(parse_uuid("not-a-uuid").is_err());
        assert!(parse_uuid("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
    }
}
