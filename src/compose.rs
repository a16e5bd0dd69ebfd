//! Markdown walk yielding normalized page primitives.
//!
//! The document assembler upstream owns layout; this walk owns normalization.
//! It streams pulldown-cmark events and emits the three primitive kinds this
//! crate produces: highlighted code-block run sequences, sanitized embedded
//! HTML, and fitted image placements for inline `data:` assets. Everything
//! else in the event stream is the assembler's business and passes by
//! untouched.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::data_url::DataUrlError;
use crate::highlight::{self, Run};
use crate::image::BoundingBox;
use crate::placement::{self, ImagePrimitive};
use crate::sanitize;
use crate::theme::Theme;

/// A normalized content primitive ready for the document assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum PagePrimitive {
    /// A fenced or indented code block as an ordered run sequence.
    CodeBlock {
        language: Option<String>,
        runs: Vec<Run>,
    },
    /// An embedded HTML fragment, sanitized, with a content-presence flag
    /// computed on the fragment as authored.
    Html { markup: String, visible: bool },
    /// An inline `data:` image, decoded, sniffed and page-fitted.
    InlineImage { primitive: ImagePrimitive, alt: String },
    /// An image referenced by URL; fetching is the caller's concern.
    ExternalImage { url: String, alt: String },
}

/// Walk a Markdown document and collect its normalized primitives.
///
/// `highlight` is the external highlighting engine: given the code text and
/// an optional language identifier it returns engine markup, or `None` to
/// decline. Engine failures therefore degrade to unstyled runs rather than
/// erroring.
///
/// # Errors
///
/// Returns [`DataUrlError`] for a malformed or unsupported inline `data:`
/// image — the one input with no safe fallback content.
pub fn extract_primitives<H>(
    markdown: &str,
    theme: &Theme,
    bounds: BoundingBox,
    highlight: H,
) -> Result<Vec<PagePrimitive>, DataUrlError>
where
    H: Fn(&str, Option<&str>) -> Option<String>,
{
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut primitives = Vec::new();
    let mut html_buffer = String::new();
    let mut code: Option<(Option<String>, String)> = None;
    let mut image: Option<(String, String)> = None;

    for event in Parser::new_ext(markdown, options) {
        // Consecutive HTML events form one fragment; anything else ends it.
        if !matches!(event, Event::Html(_) | Event::InlineHtml(_)) && !html_buffer.is_empty() {
            primitives.push(html_primitive(&mut html_buffer));
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, text)) = code.take() {
                    let markup = highlight(&text, language.as_deref());
                    let runs = highlight::build_runs(&text, markup.as_deref(), theme);
                    primitives.push(PagePrimitive::CodeBlock { language, runs });
                }
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                image = Some((dest_url.to_string(), String::new()));
            }
            Event::End(TagEnd::Image) => {
                if let Some((url, alt)) = image.take() {
                    primitives.push(image_primitive(url, alt, bounds)?);
                }
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = code.as_mut() {
                    buffer.push_str(&text);
                } else if let Some((_, alt)) = image.as_mut() {
                    alt.push_str(&text);
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                html_buffer.push_str(&html);
            }
            _ => {}
        }
    }

    if !html_buffer.is_empty() {
        primitives.push(html_primitive(&mut html_buffer));
    }

    Ok(primitives)
}

fn html_primitive(buffer: &mut String) -> PagePrimitive {
    let raw = std::mem::take(buffer);
    PagePrimitive::Html {
        visible: sanitize::has_visible_content(&raw),
        markup: sanitize::sanitize(&raw),
    }
}

fn image_primitive(
    url: String,
    alt: String,
    bounds: BoundingBox,
) -> Result<PagePrimitive, DataUrlError> {
    if url.starts_with("data:") {
        let primitive = placement::adapt_data_url(&url, bounds)?;
        Ok(PagePrimitive::InlineImage { primitive, alt })
    } else {
        Ok(PagePrimitive::ExternalImage { url, alt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageDimensions, ImageFormat};

    fn no_engine(_code: &str, _lang: Option<&str>) -> Option<String> {
        None
    }

    #[test]
    fn code_block_without_engine_degrades_to_plain_runs() {
        let theme = Theme::default();
        let md = "```rust\nlet x = 1;\nlet y = 2;\n```\n";
        let prims =
            extract_primitives(md, &theme, BoundingBox::new(576, 912), no_engine).expect("ok");
        assert_eq!(prims.len(), 1);
        match &prims[0] {
            PagePrimitive::CodeBlock { language, runs } => {
                assert_eq!(language.as_deref(), Some("rust"));
                assert_eq!(runs.len(), 4, "two lines, break between, trailing break");
            }
            other => panic!("unexpected primitive: {other:?}"),
        }
    }

    #[test]
    fn code_block_with_engine_markup_gets_scope_colors() {
        let theme = Theme::default();
        let md = "```rust\nfn main() {}\n```\n";
        let engine = |code: &str, lang: Option<&str>| {
            assert_eq!(lang, Some("rust"));
            assert!(code.contains("fn main"));
            Some("<span class=\"hljs-keyword\">fn</span> main() {}".to_string())
        };
        let prims = extract_primitives(md, &theme, BoundingBox::new(576, 912), engine).expect("ok");
        match &prims[0] {
            PagePrimitive::CodeBlock { runs, .. } => match &runs[0] {
                Run::Text(t) => assert_eq!(t.color, "D73A49"),
                other => panic!("unexpected run: {other:?}"),
            },
            other => panic!("unexpected primitive: {other:?}"),
        }
    }

    #[test]
    fn html_block_is_sanitized_and_flagged() {
        let theme = Theme::default();
        let md = "before\n\n<div onclick=\"x()\">content<script>bad()</script></div>\n\nafter\n";
        let prims =
            extract_primitives(md, &theme, BoundingBox::new(576, 912), no_engine).expect("ok");
        assert_eq!(prims.len(), 1);
        match &prims[0] {
            PagePrimitive::Html { markup, visible } => {
                assert!(*visible);
                assert!(!markup.contains("script"));
                assert!(!markup.contains("onclick"));
                assert!(markup.contains("content"));
            }
            other => panic!("unexpected primitive: {other:?}"),
        }
    }

    #[test]
    fn break_only_html_is_flagged_invisible() {
        let theme = Theme::default();
        let prims = extract_primitives(
            "<br><br>\n",
            &theme,
            BoundingBox::new(576, 912),
            no_engine,
        )
        .expect("ok");
        match &prims[0] {
            PagePrimitive::Html { visible, .. } => assert!(!visible),
            other => panic!("unexpected primitive: {other:?}"),
        }
    }

    #[test]
    fn data_url_image_becomes_inline_primitive() {
        use base64::Engine;
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&13u32.to_be_bytes());
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&2000u32.to_be_bytes());
        png.extend_from_slice(&3000u32.to_be_bytes());
        png.extend_from_slice(&[8, 6, 0, 0, 0]);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&png);

        let theme = Theme::default();
        let md = format!("![diagram](data:image/png;base64,{encoded})\n");
        let prims = extract_primitives(&md, &theme, BoundingBox::new(576, 912), no_engine)
            .expect("ok");
        match &prims[0] {
            PagePrimitive::InlineImage { primitive, alt } => {
                assert_eq!(alt, "diagram");
                assert_eq!(primitive.format, ImageFormat::Png);
                assert_eq!(primitive.display, ImageDimensions::new(576, 864));
            }
            other => panic!("unexpected primitive: {other:?}"),
        }
    }

    #[test]
    fn malformed_data_url_surfaces_an_error() {
        let theme = Theme::default();
        let md = "![x](data:image/png;base64)\n";
        let result = extract_primitives(md, &theme, BoundingBox::new(576, 912), no_engine);
        assert!(result.is_err());
    }

    #[test]
    fn external_image_is_passed_through() {
        let theme = Theme::default();
        let md = "![logo](https://example.com/logo.png)\n";
        let prims =
            extract_primitives(md, &theme, BoundingBox::new(576, 912), no_engine).expect("ok");
        match &prims[0] {
            PagePrimitive::ExternalImage { url, alt } => {
                assert_eq!(url, "https://example.com/logo.png");
                assert_eq!(alt, "logo");
            }
            other => panic!("unexpected primitive: {other:?}"),
        }
    }

    #[test]
    fn plain_markdown_yields_no_primitives() {
        let theme = Theme::default();
        let md = "# Title\n\nJust a paragraph with **bold** text.\n";
        let prims =
            extract_primitives(md, &theme, BoundingBox::new(576, 912), no_engine).expect("ok");
        assert!(prims.is_empty());
    }
}
