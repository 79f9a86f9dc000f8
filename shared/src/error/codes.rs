//! Unified error codes for the admin panel
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Account state errors
//! - 2xxx: Permission errors
//! - 3xxx: User errors
//! - 4xxx: Role errors
//! - 5xxx: Group errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 1xxx: Account ====================
    /// Account setup (user config) not completed
    SetupRequired = 1009,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Role is protected against permission changes and deletion
    RoleProtected = 2006,

    // ==================== 3xxx: User ====================
    /// User not found
    UserNotFound = 3001,
    /// Email already registered
    EmailExists = 3002,
    /// User has already completed setup
    UserAlreadyConfigured = 3003,
    /// User must be soft-deleted before permanent removal
    UserNotDeleted = 3004,

    // ==================== 4xxx: Role ====================
    /// Role not found
    RoleNotFound = 4001,
    /// Role name already exists
    RoleNameExists = 4002,
    /// Role must be soft-deleted before permanent removal
    RoleNotDeleted = 4003,

    // ==================== 5xxx: Group ====================
    /// Group not found
    GroupNotFound = 5001,
    /// Group must be soft-deleted before permanent removal
    GroupNotDeleted = 5003,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this code represents success
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            Self::Success => "Success",
            Self::ValidationFailed => "Validation failed",

            // Account
            Self::SetupRequired => "Account setup required",

            // Permission
            Self::PermissionDenied => "Permission denied",
            Self::RoleProtected => "Role is protected",

            // User
            Self::UserNotFound => "User not found",
            Self::EmailExists => "Email already exists",
            Self::UserAlreadyConfigured => "User setup already completed",
            Self::UserNotDeleted => "User must be deleted first",

            // Role
            Self::RoleNotFound => "Role not found",
            Self::RoleNameExists => "Role name already exists",
            Self::RoleNotDeleted => "Role must be deleted first",

            // Group
            Self::GroupNotFound => "Group not found",
            Self::GroupNotDeleted => "Group must be deleted first",

            // System
            Self::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),

            // Account
            1009 => Ok(ErrorCode::SetupRequired),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2006 => Ok(ErrorCode::RoleProtected),

            // User
            3001 => Ok(ErrorCode::UserNotFound),
            3002 => Ok(ErrorCode::EmailExists),
            3003 => Ok(ErrorCode::UserAlreadyConfigured),
            3004 => Ok(ErrorCode::UserNotDeleted),

            // Role
            4001 => Ok(ErrorCode::RoleNotFound),
            4002 => Ok(ErrorCode::RoleNameExists),
            4003 => Ok(ErrorCode::RoleNotDeleted),

            // Group
            5001 => Ok(ErrorCode::GroupNotFound),
            5003 => Ok(ErrorCode::GroupNotDeleted),

            // System
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
