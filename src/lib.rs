//! `markpage` — content normalization for Markdown → paged-document
//! conversion.
//!
//! A paged-document converter spends most of its code on orchestration; the
//! hard part is turning untrusted, loosely-structured inputs into well-typed,
//! safe, page-fit primitives. That part lives here:
//!
//! - [`introspect`] sniffs image bytes for container format and pixel
//!   dimensions across PNG, GIF, BMP, JPEG and WEBP, with no image library.
//! - [`fit`] scales dimensions into a page bounding box, preserving aspect
//!   ratio and never upscaling.
//! - [`sanitize`] reduces arbitrary embedded HTML to a safe subset;
//!   [`has_visible_content`] decides whether a fragment renders anything.
//! - [`build_runs`] converts highlighting-engine markup into ordered,
//!   per-scope-colored text runs.
//! - [`extract_primitives`] walks a Markdown document and yields the
//!   normalized primitives a document assembler consumes.
//!
//! # Quick start
//!
//! ```
//! use markpage::{BoundingBox, ImageDimensions};
//!
//! // Unrecognized bytes degrade to fallback dimensions; layout never aborts.
//! let probe = markpage::introspect(b"not an image", None);
//! assert_eq!(probe.dimensions, ImageDimensions::FALLBACK);
//!
//! // Oversized images scale down to fit the page, preserving aspect ratio.
//! let fitted = markpage::fit(ImageDimensions::new(2000, 3000), BoundingBox::new(576, 912));
//! assert_eq!(fitted, ImageDimensions::new(576, 864));
//!
//! // Embedded HTML is reduced to a safe subset.
//! let safe = markpage::sanitize("<p onclick=\"x()\">hi</p><script>evil()</script>");
//! assert_eq!(safe, "<p>hi</p>");
//! ```

#[cfg(feature = "bridge")]
pub mod bridge;
pub mod compose;
pub mod data_url;
pub mod highlight;
pub mod image;
pub mod placement;
pub mod sanitize;
pub mod theme;

pub use compose::{PagePrimitive, extract_primitives};
pub use data_url::DataUrlError;
pub use highlight::{Run, TextRun, build_runs, build_runs_tree};
pub use image::{BoundingBox, ImageDimensions, ImageFormat, ImageProbe, fit, introspect};
pub use placement::{ImagePrimitive, RenderOutput, adapt, adapt_data_url};
pub use sanitize::{has_visible_content, sanitize, sanitize_streaming};
pub use theme::Theme;

#[cfg(feature = "bridge")]
pub use bridge::{BridgeConfig, BridgeError, render_fragment};
