//! Template and TemplateVersion entities.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemplateStatus {
    Draft,
    Published,
    Archived,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl std::str::FromStr for TemplateStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(format!("unknown template status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Template {
    pub id: i64,
    pub name: String,
    /// Unique within the tenant, `[A-Za-z0-9_-]{1,100}`. Used as the
    /// `{TEMPLATE_CODE}` prefix in generated certificate numbers.
    pub code: String,
    pub description: Option<String>,
    pub status: String,
    pub current_version: Option<i32>,
    pub metadata: Value,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Template {
    pub fn status(&self) -> TemplateStatus {
        self.status.parse().unwrap_or(TemplateStatus::Draft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionStatus {
    Draft,
    Published,
    Archived,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl std::str::FromStr for VersionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "ARCHIVED" => Ok(Self::Archived),
            other => Err(format!("unknown version status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TemplateVersion {
    pub id: i64,
    pub template_id: i64,
    pub version: i32,
    pub html: String,
    pub css: Option<String>,
    pub field_schema: Value,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl TemplateVersion {
    pub fn status(&self) -> VersionStatus {
        self.status.parse().unwrap_or(VersionStatus::Draft)
    }
}

/// Fields supplied by the caller when drafting a new version, validated by
/// [`crate::store::TemplateStore::validate`] before persistence.
pub struct DraftVersion {
    pub html: String,
    pub css: Option<String>,
    pub field_schema: Value,
    pub created_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_status_round_trips() {
        for s in [TemplateStatus::Draft, TemplateStatus::Published, TemplateStatus::Archived] {
            assert_eq!(s.as_str().parse::<TemplateStatus>().unwrap(), s);
        }
    }

    #[test]
    fn version_status_round_trips() {
        for s in [VersionStatus::Draft, VersionStatus::Published, VersionStatus::Archived] {
            assert_eq!(s.as_str().parse::<VersionStatus>().unwrap(), s);
        }
    }
}
