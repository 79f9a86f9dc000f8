//! Shared types for the admin panel
//!
//! Common types used across crates: the error system, entity rows,
//! write payloads, permission view models and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};
