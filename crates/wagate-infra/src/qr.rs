//! Pairing-challenge QR rendering.
//!
//! Renders the opaque pairing challenge held by a connecting session as an
//! SVG QR image, returned as a `data:` URL the API layer can hand straight
//! to a browser.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use qrcode::QrCode;
use qrcode::render::svg;
use thiserror::Error;

/// Error rendering a pairing challenge.
#[derive(Debug, Error)]
pub enum QrRenderError {
    #[error("QR encoding failed: {0}")]
    Encode(String),
}

/// Render a pairing challenge as a base64 SVG data URL.
pub fn render_challenge_data_url(challenge: &str) -> Result<String, QrRenderError> {
    let code = QrCode::new(challenge.as_bytes())
        .map_err(|e| QrRenderError::Encode(e.to_string()))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(format!("data:image/svg+xml;base64,{}", BASE64.encode(image)))
}
