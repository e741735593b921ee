//! Inline image encoding.
//!
//! Every image the pipeline handles is carried as a
//! `data:<mime>;base64,<payload>` URI. That string is what gets stored and
//! what gets decoded again when the image is sent to a vision model.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// MIME type for an image file extension. Unknown extensions map to
/// `image/png`.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

/// MIME type for an archive entry or file path, by its extension.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    mime_for_extension(ext)
}

/// Encode raw bytes as a data URI.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// True for `data:image/...` URIs, the only payloads the describer accepts.
pub fn is_image_data_uri(payload: &str) -> bool {
    payload.starts_with("data:image")
}

/// An image decoded from a data URI, ready to send inline to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload, still encoded.
    pub data: String,
}

impl InlineImage {
    /// Split a `data:<mime>;base64,<data>` URI. Returns `None` for anything
    /// else.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        if mime_type.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}
