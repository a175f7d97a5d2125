//! Unified error system for the certificate lifecycle engine
//!
//! - [`ErrorCode`]: standardized error codes, grouped by decimal range
//! - [`ErrorCategory`]: classification of a code by its range
//! - [`AppError`]: rich error type with a code, message, and details
//! - [`ApiResponse`]: unified API response envelope
//!
//! # Error code ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Auth errors
//! - 2xxx: Tenant errors
//! - 3xxx: Template errors
//! - 4xxx: Certificate errors
//! - 5xxx: Storage errors
//! - 6xxx: Queue errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::NotFound);
//! let err = AppError::with_message(ErrorCode::ValidationFailed, "missing field: name");
//! let response = ApiResponse::<()>::error(&err);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::ErrorCode;
pub use types::{ApiResponse, AppError, AppResult};
