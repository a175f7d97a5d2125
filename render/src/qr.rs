//! QR code generation for the verification footer, invoked only in Pass
//! 2 — nondeterminism here is explicitly allowed by the renderer's
//! determinism requirement.

use image::{ImageEncoder, Luma};
use qrcode::QrCode;
use shared::error::AppError;

/// Renders `data` as a QR code and returns it as a `data:image/png;base64,`
/// URI suitable for inlining directly in an `<img src="...">`.
pub fn qr_data_uri(data: &str) -> Result<String, AppError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::internal(format!("failed to build QR code: {e}")))?;

    let image = code.render::<Luma<u8>>().build();

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::L8)
        .map_err(|e| AppError::internal(format!("failed to encode QR code as PNG: {e}")))?;

    Ok(format!(
        "data:image/png;base64,{}",
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, png_bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_a_png_data_uri() {
        let uri = qr_data_uri("https://example.com/verify?hash=abc").unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
