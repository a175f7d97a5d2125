//! Unified error codes for the certificate lifecycle engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Auth errors
//! - 2xxx: Tenant errors
//! - 3xxx: Template errors
//! - 4xxx: Certificate errors
//! - 5xxx: Storage errors
//! - 6xxx: Queue errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum.
///
/// Represented as `u16` for compact serialization and stable wire
/// compatibility with API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Token is invalid
    TokenInvalid = 1002,
    /// Token has expired
    TokenExpired = 1003,

    // ==================== 2xxx: Tenant ====================
    /// Operation attempted without a bound tenant schema
    MissingTenant = 2001,
    /// Tenant schema string fails the naming pattern
    InvalidTenant = 2002,
    /// No customer resolves to the given header/id
    TenantNotFound = 2003,
    /// Customer onboarding failed after the row was created
    TenantSchemaCreationFailed = 2004,

    // ==================== 3xxx: Template ====================
    /// Template or template version not found
    TemplateNotFound = 3001,
    /// Template version is immutable in its current status
    TemplateVersionImmutable = 3002,
    /// Forbidden template-version status transition
    TemplateIllegalTransition = 3003,
    /// Recipient data failed field-schema validation
    FieldValidationFailed = 3004,

    // ==================== 4xxx: Certificate ====================
    /// Certificate not found
    CertificateNotFound = 4001,
    /// Certificate state transition is not allowed from the current state
    IllegalTransition = 4002,
    /// Tenant has exhausted its monthly certificate quota
    QuotaExceeded = 4003,
    /// Rendering the certificate PDF failed
    RenderFailed = 4004,

    // ==================== 5xxx: Storage ====================
    /// Requested object does not exist in the store
    StorageNotFound = 5001,
    /// Transient storage I/O or network failure
    StorageTransient = 5002,

    // ==================== 6xxx: Queue ====================
    /// Publishing a generation message failed
    QueuePublishFailed = 6001,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9001,
    /// Internal server error
    InternalError = 9002,
}

impl ErrorCode {
    /// Numeric wire value.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message for this code.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::NotAuthenticated => "Authentication required",
            Self::TokenInvalid => "Invalid token",
            Self::TokenExpired => "Token expired",
            Self::MissingTenant => "No tenant bound to this operation",
            Self::InvalidTenant => "Tenant schema name is invalid",
            Self::TenantNotFound => "Tenant not found",
            Self::TenantSchemaCreationFailed => "Tenant schema provisioning failed",
            Self::TemplateNotFound => "Template not found",
            Self::TemplateVersionImmutable => "Template version is immutable once published",
            Self::TemplateIllegalTransition => "Illegal template version status transition",
            Self::FieldValidationFailed => "Recipient data failed field-schema validation",
            Self::CertificateNotFound => "Certificate not found",
            Self::IllegalTransition => "Illegal certificate state transition",
            Self::QuotaExceeded => "Monthly certificate quota exceeded",
            Self::RenderFailed => "Certificate rendering failed",
            Self::StorageNotFound => "Object not found in store",
            Self::StorageTransient => "Transient storage error",
            Self::QueuePublishFailed => "Failed to publish generation message",
            Self::DatabaseError => "Database error",
            Self::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(c: ErrorCode) -> Self {
        c.code()
    }
}

/// A `u16` that does not correspond to any [`ErrorCode`] variant.
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
        Ok(match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            1001 => Self::NotAuthenticated,
            1002 => Self::TokenInvalid,
            1003 => Self::TokenExpired,
            2001 => Self::MissingTenant,
            2002 => Self::InvalidTenant,
            2003 => Self::TenantNotFound,
            2004 => Self::TenantSchemaCreationFailed,
            3001 => Self::TemplateNotFound,
            3002 => Self::TemplateVersionImmutable,
            3003 => Self::TemplateIllegalTransition,
            3004 => Self::FieldValidationFailed,
            4001 => Self::CertificateNotFound,
            4002 => Self::IllegalTransition,
            4003 => Self::QuotaExceeded,
            4004 => Self::RenderFailed,
            5001 => Self::StorageNotFound,
            5002 => Self::StorageTransient,
            6001 => Self::QueuePublishFailed,
            9001 => Self::DatabaseError,
            9002 => Self::InternalError,
            _ => return Err(InvalidErrorCode(value)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant_through_u16() {
        let all = [
            ErrorCode::Success,
            ErrorCode::Unknown,
            ErrorCode::ValidationFailed,
            ErrorCode::NotFound,
            ErrorCode::AlreadyExists,
            ErrorCode::InvalidRequest,
            ErrorCode::NotAuthenticated,
            ErrorCode::TokenInvalid,
            ErrorCode::TokenExpired,
            ErrorCode::MissingTenant,
            ErrorCode::InvalidTenant,
            ErrorCode::TenantNotFound,
            ErrorCode::TenantSchemaCreationFailed,
            ErrorCode::TemplateNotFound,
            ErrorCode::TemplateVersionImmutable,
            ErrorCode::TemplateIllegalTransition,
            ErrorCode::FieldValidationFailed,
            ErrorCode::CertificateNotFound,
            ErrorCode::IllegalTransition,
            ErrorCode::QuotaExceeded,
            ErrorCode::RenderFailed,
            ErrorCode::StorageNotFound,
            ErrorCode::StorageTransient,
            ErrorCode::QueuePublishFailed,
            ErrorCode::DatabaseError,
            ErrorCode::InternalError,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn rejects_unknown_codes() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn display_formats_as_e_prefixed_code() {
        assert_eq!(ErrorCode::QuotaExceeded.to_string(), "E4003");
    }
}
