//! HTML → PDF conversion. `wkhtmltopdf`'s application handle is not
//! `Send`, so every conversion runs on a blocking thread via
//! `spawn_blocking` — the same pattern SPEC_FULL.md's worker uses for
//! CPU-bound render calls, applied one layer down since the renderer is
//! where the actual blocking call lives.

use shared::error::AppError;
use std::io::Read;

pub async fn html_to_pdf(html: String) -> Result<Vec<u8>, AppError> {
    tokio::task::spawn_blocking(move || html_to_pdf_blocking(&html))
        .await
        .map_err(|e| AppError::internal(format!("PDF render task panicked: {e}")))?
}

fn html_to_pdf_blocking(html: &str) -> Result<Vec<u8>, AppError> {
    let mut pdf_app = wkhtmltopdf::PdfApplication::new()
        .map_err(|e| AppError::internal(format!("failed to start PDF application: {e}")))?;

    let mut pdf = pdf_app
        .builder()
        .build_from_html(html)
        .map_err(|e| AppError::internal(format!("failed to render PDF: {e}")))?;

    let mut bytes = Vec::new();
    pdf.read_to_end(&mut bytes)
        .map_err(|e| AppError::internal(format!("failed to read rendered PDF: {e}")))?;
    Ok(bytes)
}
