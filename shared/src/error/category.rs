//! Error categories, derived from the thousands digit of a code

use serde::{Deserialize, Serialize};

use super::codes::ErrorCode;

/// `System` errors are logged when rendered; the rest are caller mistakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Account,
    Permission,
    User,
    Role,
    Group,
    /// 6xxx and up
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Account,
            2000..3000 => Self::Permission,
            3000..4000 => Self::User,
            4000..5000 => Self::Role,
            5000..6000 => Self::Group,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
