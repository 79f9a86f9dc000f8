//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::UserNotFound | Self::RoleNotFound | Self::GroupNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::EmailExists
            | Self::UserAlreadyConfigured
            | Self::RoleNameExists
            | Self::RoleProtected
            | Self::UserNotDeleted
            | Self::RoleNotDeleted
            | Self::GroupNotDeleted => StatusCode::CONFLICT,

            // 403 Forbidden
            Self::PermissionDenied | Self::SetupRequired => StatusCode::FORBIDDEN,

            // 500 Internal Server Error
            Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::UserNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::RoleNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::GroupNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::EmailExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::UserAlreadyConfigured.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::RoleNameExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::RoleProtected.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::RoleNotDeleted.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_forbidden_status() {
        assert_eq!(
            ErrorCode::PermissionDenied.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ErrorCode::SetupRequired.http_status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_error_status() {
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
