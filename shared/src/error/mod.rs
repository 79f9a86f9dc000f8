//! Error vocabulary shared by the engine and whatever web layer hosts it
//!
//! Code ranges:
//!
//! | range | area |
//! |-------|------|
//! | 0xxx  | general |
//! | 1xxx  | account state |
//! | 2xxx  | authorization |
//! | 3xxx  | users |
//! | 4xxx  | roles |
//! | 5xxx  | groups |
//! | 9xxx  | system |
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::ValidationFailed).with_detail("displayname", "length");
//! let body: ApiResponse<()> = err.into();
//! assert_eq!(body.code, 2);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
