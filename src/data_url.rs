//! Inline `data:` URL decoding for embedded image assets.
//!
//! Unlike image sniffing, which degrades to fallback dimensions, a broken
//! data URL is surfaced as an explicit error: there is no safe substitute
//! content for an asset the document references inline.

use base64::Engine;

/// Errors produced while decoding a `data:` URL.
#[derive(Debug, thiserror::Error)]
pub enum DataUrlError {
    /// The string is not a `data:` URL at all.
    #[error("not a data URL")]
    NotDataUrl,

    /// The URL has no comma separating the header from the payload.
    #[error("malformed data URL: missing payload separator")]
    MissingPayload,

    /// The payload encoding is not base64.
    #[error("unsupported data URL encoding: {0:?}")]
    UnsupportedEncoding(String),

    /// The base64 payload failed to decode.
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
}

/// A decoded `data:` URL: declared media type plus raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Declared media type, e.g. `image/png`. Empty when the URL omits it.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Parse and decode a `data:` URL with a base64 payload.
///
/// # Errors
///
/// Returns [`DataUrlError`] for non-`data:` input, a missing payload
/// separator, a non-base64 encoding marker, or an undecodable payload.
pub fn decode(url: &str) -> Result<DataUrl, DataUrlError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or(DataUrlError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;

    let mut parts = header.split(';');
    let media_type = parts.next().unwrap_or("").trim().to_ascii_lowercase();
    let encoding = parts.next_back().map(|p| p.trim().to_ascii_lowercase());
    match encoding.as_deref() {
        Some("base64") => {}
        // `data:,...` and `data:text/plain,...` carry percent-encoded text,
        // which this pipeline does not accept for binary assets.
        other => {
            return Err(DataUrlError::UnsupportedEncoding(
                other.unwrap_or("").to_string(),
            ));
        }
    }

    // Whitespace is legal inside the payload of inline documents.
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact.as_bytes())?;

    Ok(DataUrl { media_type, bytes })
}
