//! The variables exposed to a template during Pass 1 (and, unchanged, to
//! the footer-augmentation step of Pass 2).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Page layout settings carried from the template version, injected as
/// `@page` CSS rules.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct PageSettings {
    pub size: Option<String>,
    pub orientation: Option<String>,
    pub margin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CertificateFields {
    pub id: i64,
    pub number: String,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct TemplateFields {
    pub code: String,
    pub name: String,
}

/// Everything the renderer needs for one certificate. Built by the caller
/// (the certificate engine) from persisted rows — never from wall-clock
/// state, so Pass 1's output stays deterministic.
#[derive(Debug, Clone)]
pub struct RenderInput {
    pub html: String,
    pub css: Option<String>,
    pub settings: PageSettings,
    pub recipient: Value,
    pub metadata: Value,
    pub certificate: CertificateFields,
    pub template: TemplateFields,
    pub template_version: i32,
    pub base_url: String,
}
