//! Builds and splices in the Pass 2 verification footer.

use crate::qr::qr_data_uri;
use chrono::{DateTime, Utc};
use shared::error::AppError;
use urlencoding::encode;

pub struct FooterData<'a> {
    pub certificate_number: &'a str,
    pub issued_at: Option<DateTime<Utc>>,
    pub hash: &'a str,
    pub base_url: &'a str,
}

pub fn verification_url(base_url: &str, hash: &str) -> String {
    format!("{base_url}/api/certificates/verify?hash={}", encode(hash))
}

fn build(data: &FooterData) -> Result<String, AppError> {
    let url = verification_url(data.base_url, data.hash);
    let qr = qr_data_uri(&url)?;
    let issued = data
        .issued_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    Ok(format!(
        r#"<div class="certificate-verification-footer">
  <p>Certificate No. {number}</p>
  <p>Issued {issued}</p>
  <img src="{qr}" alt="verification QR code" />
  <p>{url}</p>
</div>"#,
        number = data.certificate_number,
        issued = issued,
        qr = qr,
        url = url,
    ))
}

/// Splices the footer into `html` immediately before the last `</div>`
/// preceding `</body>` (when only whitespace separates them), otherwise
/// before `</body>`, otherwise before `</html>`, otherwise at the end.
pub fn append(html: &str, data: &FooterData) -> Result<String, AppError> {
    let footer = build(data)?;
    let insertion = find_insertion_point(html);
    let mut out = String::with_capacity(html.len() + footer.len());
    out.push_str(&html[..insertion]);
    out.push_str(&footer);
    out.push_str(&html[insertion..]);
    Ok(out)
}

fn find_insertion_point(html: &str) -> usize {
    if let Some(body_idx) = html.rfind("</body>") {
        if let Some(div_idx) = html[..body_idx].rfind("</div>") {
            let between = &html[div_idx + "</div>".len()..body_idx];
            if between.trim().is_empty() {
                return div_idx;
            }
        }
        return body_idx;
    }
    if let Some(html_idx) = html.rfind("</html>") {
        return html_idx;
    }
    html.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data<'a>(hash: &'a str, base_url: &'a str) -> FooterData<'a> {
        FooterData {
            certificate_number: "CERT-1",
            issued_at: None,
            hash,
            base_url,
        }
    }

    #[test]
    fn inserts_before_trailing_div_when_only_whitespace_follows() {
        let html = "<html><body><div id=\"wrap\"></div>\n  \n</body></html>";
        let out = append(html, &data("h", "https://x")).unwrap();
        let div_close = out.find("</div>").unwrap();
        let footer_start = out.find("certificate-verification-footer").unwrap();
        assert!(footer_start < div_close || out[..div_close].contains("certificate-verification-footer"));
    }

    #[test]
    fn inserts_before_body_when_div_has_trailing_content() {
        let html = "<html><body><div></div>trailing text</body></html>";
        let out = append(html, &data("h", "https://x")).unwrap();
        let footer_idx = out.find("certificate-verification-footer").unwrap();
        let body_close = out.find("</body>").unwrap();
        assert!(footer_idx < body_close);
        assert!(out.contains("trailing text"));
    }

    #[test]
    fn falls_back_to_before_html_close_without_body() {
        let html = "<html><p>content</p></html>";
        let out = append(html, &data("h", "https://x")).unwrap();
        let footer_idx = out.find("certificate-verification-footer").unwrap();
        let html_close = out.find("</html>").unwrap();
        assert!(footer_idx < html_close);
    }

    #[test]
    fn appends_at_end_with_no_structural_tags() {
        let html = "just text";
        let out = append(html, &data("h", "https://x")).unwrap();
        assert!(out.starts_with("just text"));
    }

    #[test]
    fn verification_url_percent_encodes_the_hash() {
        let url = verification_url("https://example.com", "a+b/c=");
        assert!(url.contains("a%2Bb%2Fc%3D"));
    }
}
