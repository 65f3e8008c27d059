use qrcode::QrCode;
use qrcode::render::svg;

use crate::error::ServiceError;

/// QR content: `ATTEND:<user_id>`
const TOKEN_PREFIX: &str = "ATTEND:";

pub fn token_for(user_id: i64) -> String {
    format!("{TOKEN_PREFIX}{user_id}")
}

/// Parse a scanned payload back into a user id. Anything that is not
/// `ATTEND:` followed by an integer is rejected.
pub fn parse_token(raw: &str) -> Result<i64, ServiceError> {
    let rest = raw
        .trim()
        .strip_prefix(TOKEN_PREFIX)
        .ok_or(ServiceError::InvalidToken)?;
    rest.parse::<i64>().map_err(|_| ServiceError::InvalidToken)
}

/// Render a badge token as an SVG document.
pub fn render_svg(token: &str) -> Result<String, ServiceError> {
    let code = QrCode::new(token.as_bytes()).map_err(|e| {
        tracing::error!(error = %e, "QR encoding failed");
        ServiceError::Internal
    })?;

    let image: String = code
        .render()
        .min_dimensions(240, 240)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(image)
}
