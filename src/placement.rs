//! Render-result adapter: raster bytes in, document-ready primitive out.
//!
//! The render bridge hands back an opaque raster (bytes, whatever dimensions
//! it measured, a content type if it knows one). `adapt` composes format
//! sniffing and display fitting into the image placement primitive the
//! document assembler consumes. Inline `data:` assets take the same path
//! after decoding.

use serde::{Deserialize, Serialize};

use crate::data_url::{self, DataUrlError};
use crate::image::{self, BoundingBox, ImageDimensions, ImageFormat};

/// What the render bridge returned for one render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub bytes: Vec<u8>,
    /// Dimensions as reported by the renderer, if it measured any. Used only
    /// when the bytes themselves cannot be sniffed.
    pub reported: Option<ImageDimensions>,
    /// Content type declared by the renderer, advisory only.
    pub content_type: Option<String>,
}

impl RenderOutput {
    pub fn new(bytes: Vec<u8>) -> Self {
        RenderOutput {
            bytes,
            reported: None,
            content_type: None,
        }
    }
}

/// Image placement primitive: the normalized form the assembler consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePrimitive {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// Dimensions parsed from the bytes (or reported by the renderer).
    pub natural: ImageDimensions,
    /// Page-fit display dimensions: aspect-preserving, never upscaled.
    pub display: ImageDimensions,
}

/// Convert a render result into an image placement primitive.
///
/// Dimensions sniffed from the bytes win; the renderer's reported dimensions
/// are trusted only when sniffing recognized nothing. Either way the result
/// is fitted into `bounds`.
pub fn adapt(output: RenderOutput, bounds: BoundingBox) -> ImagePrimitive {
    let probe = image::introspect(&output.bytes, output.content_type.as_deref());
    let natural = if probe.format == ImageFormat::Unknown {
        output.reported.unwrap_or(probe.dimensions)
    } else {
        probe.dimensions
    };
    ImagePrimitive {
        bytes: output.bytes,
        format: probe.format,
        natural,
        display: image::fit(natural, bounds),
    }
}

/// Decode an inline `data:` image asset into a placement primitive.
///
/// # Errors
///
/// Returns [`DataUrlError`] when the URL is malformed or uses an unsupported
/// encoding. Unrecognized image bytes are not an error: they degrade to
/// fallback dimensions like any other asset.
pub fn adapt_data_url(url: &str, bounds: BoundingBox) -> Result<ImagePrimitive, DataUrlError> {
    let decoded = data_url::decode(url)?;
    let output = RenderOutput {
        bytes: decoded.bytes,
        reported: None,
        content_type: (!decoded.media_type.is_empty()).then_some(decoded.media_type),
    };
    Ok(adapt(output, bounds))
}
