//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// HTTP status this error code maps to at the API boundary.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::TenantNotFound
            | Self::TemplateNotFound
            | Self::CertificateNotFound
            | Self::StorageNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::IllegalTransition
            | Self::TemplateIllegalTransition
            | Self::TemplateVersionImmutable => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenInvalid | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            // 400 Bad Request
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::MissingTenant
            | Self::InvalidTenant
            | Self::FieldValidationFailed
            | Self::QuotaExceeded => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            Self::Unknown
            | Self::TenantSchemaCreationFailed
            | Self::RenderFailed
            | Self::StorageTransient
            | Self::QueuePublishFailed
            | Self::DatabaseError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_tenant_and_certificate_not_found_to_404() {
        assert_eq!(ErrorCode::TenantNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::CertificateNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn maps_missing_tenant_to_400_and_quota_to_400() {
        assert_eq!(ErrorCode::MissingTenant.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::QuotaExceeded.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn maps_illegal_transition_to_409() {
        assert_eq!(ErrorCode::IllegalTransition.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn maps_storage_and_queue_failures_to_500() {
        assert_eq!(
            ErrorCode::QueuePublishFailed.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::StorageTransient.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
