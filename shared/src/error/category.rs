//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category, determined by the leading digit of the error code:
/// - 0xxx: General
/// - 1xxx: Auth
/// - 2xxx: Tenant
/// - 3xxx: Template
/// - 4xxx: Certificate
/// - 5xxx: Storage
/// - 6xxx: Queue
/// - 9xxx: System
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Tenant,
    Template,
    Certificate,
    Storage,
    Queue,
    System,
}

impl ErrorCategory {
    /// Determine category from an error code's numeric value.
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Tenant,
            3000..4000 => Self::Template,
            4000..5000 => Self::Certificate,
            5000..6000 => Self::Storage,
            6000..7000 => Self::Queue,
            _ => Self::System,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Tenant => "tenant",
            Self::Template => "template",
            Self::Certificate => "certificate",
            Self::Storage => "storage",
            Self::Queue => "queue",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// The category this code falls into.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_by_leading_digit() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(2003), ErrorCategory::Tenant);
        assert_eq!(ErrorCategory::from_code(4002), ErrorCategory::Certificate);
        assert_eq!(ErrorCategory::from_code(9002), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(12345), ErrorCategory::System);
    }

    #[test]
    fn error_code_category_matches_table() {
        assert_eq!(
            ErrorCode::QuotaExceeded.category(),
            ErrorCategory::Certificate
        );
        assert_eq!(ErrorCode::MissingTenant.category(), ErrorCategory::Tenant);
        assert_eq!(ErrorCode::InternalError.category(), ErrorCategory::System);
    }
}
