//! User Model

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const MIN_EMAIL_LENGTH: u64 = 5;
pub const MAX_EMAIL_LENGTH: u64 = 255;
pub const MIN_DISPLAY_NAME_LENGTH: u64 = 3;
pub const MAX_DISPLAY_NAME_LENGTH: u64 = 20;
pub const MIN_FIRST_NAME_LENGTH: u64 = 1;
pub const MAX_FIRST_NAME_LENGTH: u64 = 255;
pub const MIN_LAST_NAME_LENGTH: u64 = 1;
pub const MAX_LAST_NAME_LENGTH: u64 = 255;
pub const MIN_MOBILE_LENGTH: u64 = 5;
pub const MAX_MOBILE_LENGTH: u64 = 32;

/// User identity row
///
/// `root` users pass every authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    pub verified: bool,
    pub deleted: bool,
    pub root: bool,
    pub created_at: i64,
}

/// Per-user profile, created once during account setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserConfig {
    pub id: i64,
    pub user_id: i64,
    pub displayname: String,
    pub firstname: String,
    pub lastname: Option<String>,
    pub mobile: Option<String>,
}

/// Create user payload (credentials are handled by the identity provider)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email, length(min = MIN_EMAIL_LENGTH, max = MAX_EMAIL_LENGTH))]
    pub email: String,
    #[serde(default)]
    pub verified: bool,
}

/// Account setup payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserConfigCreate {
    #[validate(length(min = MIN_DISPLAY_NAME_LENGTH, max = MAX_DISPLAY_NAME_LENGTH))]
    pub displayname: String,
    #[validate(length(min = MIN_FIRST_NAME_LENGTH, max = MAX_FIRST_NAME_LENGTH))]
    pub firstname: String,
    #[validate(length(min = MIN_LAST_NAME_LENGTH, max = MAX_LAST_NAME_LENGTH))]
    pub lastname: Option<String>,
    #[validate(
        length(min = MIN_MOBILE_LENGTH, max = MAX_MOBILE_LENGTH),
        custom(function = "validate_mobile")
    )]
    pub mobile: Option<String>,
}

/// Profile update payload (None = unchanged)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserConfigUpdate {
    #[validate(length(min = MIN_DISPLAY_NAME_LENGTH, max = MAX_DISPLAY_NAME_LENGTH))]
    pub displayname: Option<String>,
    #[validate(length(min = MIN_FIRST_NAME_LENGTH, max = MAX_FIRST_NAME_LENGTH))]
    pub firstname: Option<String>,
    #[validate(length(min = MIN_LAST_NAME_LENGTH, max = MAX_LAST_NAME_LENGTH))]
    pub lastname: Option<String>,
    #[validate(
        length(min = MIN_MOBILE_LENGTH, max = MAX_MOBILE_LENGTH),
        custom(function = "validate_mobile")
    )]
    pub mobile: Option<String>,
}

/// Loose phone number check: optional leading `+`, digits with common
/// separators, at least five digits.
fn validate_mobile(mobile: &str) -> Result<(), ValidationError> {
    let trimmed = mobile.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.'));
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if allowed && digits >= MIN_MOBILE_LENGTH as usize {
        Ok(())
    } else {
        Err(ValidationError::new("mobile"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UserConfigCreate {
        UserConfigCreate {
            displayname: "cici".into(),
            firstname: "Cecilia".into(),
            lastname: None,
            mobile: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());

        let mut with_mobile = config();
        with_mobile.mobile = Some("+36 (30) 123-4567".into());
        assert!(with_mobile.validate().is_ok());
    }

    #[test]
    fn short_display_name_is_rejected_per_field() {
        let mut c = config();
        c.displayname = "ab".into();
        let errors = c.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("displayname"));
    }

    #[test]
    fn malformed_mobile_is_rejected() {
        let mut c = config();
        c.mobile = Some("call me maybe".into());
        let errors = c.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("mobile"));
    }

    #[test]
    fn email_must_look_like_an_email() {
        let bad = UserCreate {
            email: "not-an-email".into(),
            verified: false,
        };
        assert!(bad.validate().is_err());

        let good = UserCreate {
            email: "admin@example.com".into(),
            verified: true,
        };
        assert!(good.validate().is_ok());
    }
}
