//! Certificate and CertificateHash entities.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CertificateStatus {
    Pending,
    Processing,
    Issued,
    Failed,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Issued => "ISSUED",
            Self::Failed => "FAILED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::str::FromStr for CertificateStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "ISSUED" => Ok(Self::Issued),
            "FAILED" => Ok(Self::Failed),
            "REVOKED" => Ok(Self::Revoked),
            other => Err(format!("unknown certificate status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub id: i64,
    pub certificate_number: String,
    pub template_id: i64,
    pub template_version: i32,
    pub status: String,
    pub recipient_data: Value,
    pub metadata: Value,
    pub storage_key: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub issued_at: Option<chrono::DateTime<chrono::Utc>>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Certificate {
    pub fn status(&self) -> CertificateStatus {
        self.status.parse().unwrap_or(CertificateStatus::Failed)
    }

    pub fn preview_generated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.metadata
            .get("previewGeneratedAt")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&chrono::Utc))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CertificateHash {
    pub id: i64,
    pub certificate_id: i64,
    pub hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Caller-supplied fields for [`crate::engine::CertificateEngine::generate`].
pub struct GenerateRequest {
    pub template_id: i64,
    pub template_version: Option<i32>,
    pub recipient_data: Value,
    pub certificate_number: Option<String>,
    pub preview: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Sync,
    Async,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            CertificateStatus::Pending,
            CertificateStatus::Processing,
            CertificateStatus::Issued,
            CertificateStatus::Failed,
            CertificateStatus::Revoked,
        ] {
            assert_eq!(s.as_str().parse::<CertificateStatus>().unwrap(), s);
        }
    }
}
