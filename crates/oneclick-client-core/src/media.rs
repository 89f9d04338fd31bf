use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Encodes a screenshot or avatar as a self-contained Data URI. The result is
/// stored inline in the owning row, not uploaded anywhere.
pub fn screenshot_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
