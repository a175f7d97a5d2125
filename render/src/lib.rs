//! C6 — PDF Renderer
//!
//! Resolves the hash-vs-footer circularity with a two-pass protocol: Pass
//! 1 renders the certificate without the verification footer and hashes
//! the resulting PDF; Pass 2 re-appends a footer that *references* that
//! hash (QR code + verification URL) to the exact HTML Pass 1 produced,
//! without re-running any nondeterministic step. See `render()` below.

pub mod context;
mod css;
mod footer;
mod pdf;
mod qr;
mod template;

pub use context::{CertificateFields, PageSettings, RenderInput, TemplateFields};

use base64::Engine;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use shared::error::AppError;
use template::Scope;

pub struct RenderOutput {
    /// `base64(SHA-256(P1))` — persisted as the certificate's hash before
    /// Pass 2 runs.
    pub hash: String,
    /// The final PDF bytes (`P2`), the artifact that gets stored.
    pub pdf: Vec<u8>,
}

/// Runs both passes.
pub async fn render(input: RenderInput) -> Result<RenderOutput, AppError> {
    let certificate_value = certificate_context(&input.certificate);
    let template_value = json!({ "code": input.template.code, "name": input.template.name });

    let scope = Scope {
        recipient: &input.recipient,
        metadata: &input.metadata,
        certificate: &certificate_value,
        template: &template_value,
        template_version: input.template_version,
    };

    // Pass 1: render without the footer, no verificationUrl/qrCodeImage/certificateHash in scope.
    let body = if template::has_expression_markers(&input.html) {
        template::render_expressions(&input.html, &scope)
    } else {
        template::render_literal(&input.html, &scope)
    };
    let pass1_html = css::inject(&body, input.css.as_deref(), &input.settings);

    let p1 = pdf::html_to_pdf(pass1_html.clone()).await?;
    let hash = base64::engine::general_purpose::STANDARD.encode(Sha256::digest(&p1));

    // Pass 2: append the footer referencing that hash to the *same* HTML, then re-convert.
    let footer_data = footer::FooterData {
        certificate_number: &input.certificate.number,
        issued_at: input.certificate.issued_at,
        hash: &hash,
        base_url: &input.base_url,
    };
    let pass2_html = footer::append(&pass1_html, &footer_data)?;
    let p2 = pdf::html_to_pdf(pass2_html).await?;

    Ok(RenderOutput { hash, pdf: p2 })
}

pub fn verification_url(base_url: &str, hash: &str) -> String {
    footer::verification_url(base_url, hash)
}

fn certificate_context(fields: &CertificateFields) -> Value {
    json!({
        "id": fields.id,
        "number": fields.number,
        "issuedAt": fields.issued_at,
        "expiresAt": fields.expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use context::{CertificateFields, TemplateFields};
    use serde_json::json;

    fn sample_input(html: &str) -> RenderInput {
        RenderInput {
            html: html.to_string(),
            css: None,
            settings: PageSettings::default(),
            recipient: json!({"name": "Ada Lovelace"}),
            metadata: json!({"course": "Analytical Engines"}),
            certificate: CertificateFields {
                id: 1,
                number: "CERT-1".to_string(),
                issued_at: None,
                expires_at: None,
            },
            template: TemplateFields { code: "CRS".to_string(), name: "Course Completion".to_string() },
            template_version: 1,
            base_url: "https://certs.example.com".to_string(),
        }
    }

    #[test]
    fn certificate_context_carries_expected_fields() {
        let fields = CertificateFields { id: 7, number: "X-1".into(), issued_at: None, expires_at: None };
        let value = certificate_context(&fields);
        assert_eq!(value["id"], 7);
        assert_eq!(value["number"], "X-1");
    }

    #[test]
    fn pass1_html_excludes_verification_fields() {
        let input = sample_input("<html><body>{{name}}</body></html>");
        let scope = Scope {
            recipient: &input.recipient,
            metadata: &input.metadata,
            certificate: &json!({}),
            template: &json!({}),
            template_version: input.template_version,
        };
        let body = template::render_literal(&input.html, &scope);
        assert!(!body.contains("verificationUrl"));
        assert!(!body.contains("qrCodeImage"));
        assert!(!body.contains("certificateHash"));
        assert!(body.contains("Ada Lovelace"));
    }
}
