//! `AppError` and the JSON envelope it is rendered into

use std::collections::HashMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::category::ErrorCategory;
use super::codes::ErrorCode;

/// Error as seen by a caller of the engine: a stable code, a message and
/// optional structured context (offending ids, per-field validation codes).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error carrying the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Response envelope: `code` is 0 on success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: ErrorCode::Success.code(),
            message: ErrorCode::Success.message().to_string(),
            data: Some(data),
            details: None,
        }
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.code.category() == ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "System error");
        }
        let status = self.http_status();
        (status, axum::Json(ApiResponse::<()>::from(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn new_uses_default_message() {
        let err = AppError::new(ErrorCode::RoleNotFound);
        assert_eq!(err.message, ErrorCode::RoleNotFound.message());
        assert!(err.details.is_none());
    }

    #[test]
    fn details_accumulate() {
        let err = AppError::new(ErrorCode::ValidationFailed)
            .with_detail("displayname", vec!["length"])
            .with_detail("mobile", vec!["mobile"]);
        let details = err.details.unwrap();
        assert_eq!(details["displayname"], serde_json::json!(["length"]));
        assert_eq!(details.len(), 2);
    }

    #[test]
    fn envelope_shapes() {
        let ok = serde_json::to_value(ApiResponse::success(7)).unwrap();
        assert_eq!(ok["code"], 0);
        assert_eq!(ok["data"], 7);
        assert!(ok.get("details").is_none());

        let err: ApiResponse<()> = AppError::new(ErrorCode::GroupNotFound)
            .with_detail("id", 9)
            .into();
        assert_eq!(err.code, ErrorCode::GroupNotFound.code());
        assert!(err.data.is_none());
    }

    #[test]
    fn renders_with_mapped_status() {
        let response = AppError::new(ErrorCode::GroupNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::permission_denied("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
