//! Image introspection and display fitting.
//!
//! `introspect` sniffs an image buffer's container format from byte
//! signatures and pulls pixel dimensions straight out of the header, without
//! a decoding library. `fit` scales those dimensions into a page bounding box
//! while preserving aspect ratio. Layout must proceed even for unrecognized
//! assets, so neither operation can fail: malformed input degrades to
//! [`ImageDimensions::FALLBACK`].

use serde::{Deserialize, Serialize};

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Safe default used when format sniffing fails.
    pub const FALLBACK: ImageDimensions = ImageDimensions {
        width: 96,
        height: 96,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        ImageDimensions { width, height }
    }
}

/// Container format recognized by signature sniffing.
///
/// Determined purely from byte prefixes. A declared content type never
/// overrides a structural match; it only classifies buffers whose bytes match
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Gif,
    Bmp,
    Jpeg,
    Webp,
    Unknown,
}

impl ImageFormat {
    /// MIME type for this format, used when handing primitives to the
    /// document assembler. `Unknown` maps to the generic octet-stream type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Unknown => "application/octet-stream",
        }
    }

    /// Classify from a declared MIME type string (advisory only).
    fn from_content_type(content_type: &str) -> ImageFormat {
        let mime = content_type
            .split(';')
            .next()
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match mime.as_str() {
            "image/png" => ImageFormat::Png,
            "image/gif" => ImageFormat::Gif,
            "image/bmp" | "image/x-ms-bmp" => ImageFormat::Bmp,
            "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
            "image/webp" => ImageFormat::Webp,
            _ => ImageFormat::Unknown,
        }
    }
}

/// Result of sniffing an image buffer: the recognized format plus the
/// dimensions parsed from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageProbe {
    pub format: ImageFormat,
    pub dimensions: ImageDimensions,
}

/// Sniff an image buffer's format and extract its pixel dimensions.
///
/// Signatures are checked in a fixed priority order (PNG, GIF, BMP, JPEG,
/// WEBP); they are mutually exclusive, so the first structural match wins.
/// The optional `declared_content_type` is consulted only when no signature
/// matches, and only to tag the format — never for dimension parsing.
///
/// This function does not fail. Any unrecognized or malformed buffer yields
/// [`ImageDimensions::FALLBACK`].
pub fn introspect(bytes: &[u8], declared_content_type: Option<&str>) -> ImageProbe {
    let (format, parsed) = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        (ImageFormat::Png, png_dimensions(bytes))
    } else if bytes.starts_with(b"GIF") {
        (ImageFormat::Gif, gif_dimensions(bytes))
    } else if bytes.starts_with(b"BM") {
        (ImageFormat::Bmp, bmp_dimensions(bytes))
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        (ImageFormat::Jpeg, jpeg_dimensions(bytes))
    } else if is_webp(bytes) {
        (ImageFormat::Webp, webp_dimensions(bytes))
    } else {
        let tagged = declared_content_type
            .map(ImageFormat::from_content_type)
            .unwrap_or(ImageFormat::Unknown);
        (tagged, None)
    };

    let dimensions = parsed
        .filter(|d| d.width > 0 && d.height > 0)
        .unwrap_or(ImageDimensions::FALLBACK);

    ImageProbe { format, dimensions }
}

fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_i32_le(bytes: &[u8], offset: usize) -> Option<i32> {
    let b = bytes.get(offset..offset + 4)?;
    Some(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u24_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset + 3)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], 0]))
}

/// PNG: IHDR is always the first chunk, so width/height sit at fixed offsets
/// 16 and 20 as 32-bit big-endian integers.
fn png_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    let width = read_u32_be(bytes, 16)?;
    let height = read_u32_be(bytes, 20)?;
    Some(ImageDimensions { width, height })
}

/// GIF: logical screen descriptor follows the 6-byte header; width/height are
/// 16-bit little-endian at offsets 6 and 8.
fn gif_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    let width = read_u16_le(bytes, 6)?;
    let height = read_u16_le(bytes, 8)?;
    Some(ImageDimensions {
        width: width.into(),
        height: height.into(),
    })
}

/// BMP: BITMAPINFOHEADER width at offset 18, height at 22, both 32-bit
/// little-endian. The height field is signed; a negative value marks a
/// top-down bitmap, and only the magnitude is meaningful for layout.
fn bmp_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    let width = read_i32_le(bytes, 18)?;
    let height = read_i32_le(bytes, 22)?;
    Some(ImageDimensions {
        width: width.unsigned_abs(),
        height: height.unsigned_abs(),
    })
}

/// JPEG Start-Of-Frame marker codes: C0–C3, C5–C7, C9–CB, CD–CF.
fn is_sof_marker(code: u8) -> bool {
    matches!(code, 0xC0..=0xCF) && !matches!(code, 0xC4 | 0xC8 | 0xCC)
}

/// JPEG: walk marker segments until a Start-Of-Frame segment. The SOF payload
/// is `[precision, height:u16be, width:u16be, ...]`, so height sits 3 bytes
/// and width 5 bytes past the segment length field. Scanning stops at
/// start-of-scan or end-of-image without a match.
fn jpeg_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    let mut pos = 2;
    loop {
        // Skip fill bytes; a marker is 0xFF followed by a non-fill code.
        while *bytes.get(pos)? == 0xFF {
            pos += 1;
        }
        let code = *bytes.get(pos)?;
        match code {
            _ if is_sof_marker(code) => {
                let height = read_u16_be(bytes, pos + 4)?;
                let width = read_u16_be(bytes, pos + 6)?;
                return Some(ImageDimensions {
                    width: width.into(),
                    height: height.into(),
                });
            }
            // End-of-image or start-of-scan: no frame header found.
            0xD9 | 0xDA => return None,
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD7 => pos += 1,
            _ => {
                let len = read_u16_be(bytes, pos + 1)? as usize;
                if len < 2 {
                    return None;
                }
                pos += 1 + len;
            }
        }
    }
}

fn is_webp(bytes: &[u8]) -> bool {
    bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP")
}

/// WEBP: the first chunk after the RIFF header decides the layout. Extended
/// (`VP8X`) stores width/height as 24-bit little-endian minus-one fields;
/// lossless (`VP8L`) packs two 14-bit minus-one fields into a 32-bit
/// little-endian bitfield after its 0x2F signature byte.
fn webp_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    match bytes.get(12..16)? {
        b"VP8X" => {
            let width = read_u24_le(bytes, 24)? + 1;
            let height = read_u24_le(bytes, 27)? + 1;
            Some(ImageDimensions { width, height })
        }
        b"VP8L" => {
            if *bytes.get(20)? != 0x2F {
                return None;
            }
            let b = bytes.get(21..25)?;
            let bits = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            let width = (bits & 0x3FFF) + 1;
            let height = ((bits >> 14) & 0x3FFF) + 1;
            Some(ImageDimensions { width, height })
        }
        _ => None,
    }
}

// ------------------------------------------------------------------
// Display fitting
// ------------------------------------------------------------------

/// Maximum display area for an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub max_width: u32,
    pub max_height: u32,
}

impl BoundingBox {
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        BoundingBox {
            max_width,
            max_height,
        }
    }

    /// Convert a physical page area to pixels at the given resolution.
    pub fn from_inches(width_in: f64, height_in: f64, ppi: u32) -> Self {
        BoundingBox {
            max_width: (width_in * f64::from(ppi)).round() as u32,
            max_height: (height_in * f64::from(ppi)).round() as u32,
        }
    }
}

/// Scale `original` to fit inside `bounds`, preserving aspect ratio.
///
/// Images that already fit are returned unchanged — there is no upscaling.
/// Oversized images are scaled by the tighter of the two axis ratios, then
/// each axis is rounded to the nearest pixel independently. The sub-pixel
/// aspect drift from independent rounding is accepted.
pub fn fit(original: ImageDimensions, bounds: BoundingBox) -> ImageDimensions {
    if original.width <= bounds.max_width && original.height <= bounds.max_height {
        return original;
    }
    let ratio = f64::min(
        f64::from(bounds.max_width) / f64::from(original.width),
        f64::from(bounds.max_height) / f64::from(original.height),
    );
    ImageDimensions {
        width: (f64::from(original.width) * ratio).round() as u32,
        height: (f64::from(original.height) * ratio).round() as u32,
    }
}
