//! HTML fragment sanitizer.
//!
//! Reduces untrusted embedded HTML to a safe subset: active-content elements
//! and their subtrees are removed, comment nodes are dropped, `on*` event
//! handler attributes are stripped, and `javascript:` hrefs are neutralized.
//! Dangerous constructs are always stripped, never reported as errors.
//!
//! Two interchangeable strategies back the same guarantees: a tree walk over
//! a parsed DOM, and a regex pass for callers that want zero DOM allocation.
//! Output is not byte-identical across strategies, but both are idempotent
//! and both uphold every invariant above.

use std::sync::OnceLock;

use regex::Regex;

/// Elements whose entire subtree is removed.
const BLOCKED_TAGS: [&str; 6] = ["script", "iframe", "object", "embed", "audio", "video"];

/// Elements that render something on their own, without text content.
/// The blocked embedding tags are included: when checking *unsanitized*
/// input, their presence still signals intended visible content.
const SELF_RENDERING_TAGS: [&str; 14] = [
    "img", "svg", "table", "pre", "code", "hr", "br", "math", "canvas", "video", "audio",
    "iframe", "object", "embed",
];

/// HTML void elements, serialized without a closing tag.
const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Sanitize an HTML fragment.
///
/// Parses to a detached tree, removes blocked subtrees and comments, strips
/// dangerous attributes, and serializes back. Falls back to
/// [`sanitize_streaming`] if the fragment cannot be parsed at all.
/// Sanitization is idempotent: running it on already-clean markup is a no-op.
pub fn sanitize(html: &str) -> String {
    match tl::parse(html, tl::ParserOptions::default()) {
        Ok(dom) => {
            let parser = dom.parser();
            let mut out = String::with_capacity(html.len());
            for handle in dom.children() {
                serialize_sanitized(*handle, parser, &mut out);
            }
            out
        }
        Err(_) => sanitize_streaming(html),
    }
}

/// Serialize one node, skipping blocked subtrees and comments and stripping
/// dangerous attributes from everything kept.
fn serialize_sanitized(handle: tl::NodeHandle, parser: &tl::Parser<'_>, out: &mut String) {
    let Some(node) = handle.get(parser) else {
        return;
    };

    match node {
        tl::Node::Tag(tag) => {
            let name = tag.name().as_utf8_str().to_lowercase();
            if BLOCKED_TAGS.contains(&name.as_str()) {
                return;
            }

            out.push('<');
            out.push_str(&name);
            for (key, value) in tag.attributes().iter() {
                let key = key.as_ref().to_lowercase();
                if key.starts_with("on") {
                    continue;
                }
                match value {
                    Some(value) => {
                        let value = value.to_string();
                        if key == "href"
                            && value.trim_start().to_lowercase().starts_with("javascript:")
                        {
                            out.push_str(" href=\"#\"");
                        } else {
                            out.push(' ');
                            out.push_str(&key);
                            out.push_str("=\"");
                            out.push_str(&value.replace('"', "&quot;"));
                            out.push('"');
                        }
                    }
                    None => {
                        out.push(' ');
                        out.push_str(&key);
                    }
                }
            }
            out.push('>');

            if VOID_TAGS.contains(&name.as_str()) {
                return;
            }
            for child in tag.children().top().iter() {
                serialize_sanitized(*child, parser, out);
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        tl::Node::Raw(bytes) => out.push_str(&bytes.as_utf8_str()),
        tl::Node::Comment(_) => {}
    }
}

fn comment_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?(-->|$)").expect("static pattern"))
}

fn blocked_span_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pairs: Vec<String> = BLOCKED_TAGS
            .iter()
            .map(|t| format!("<{t}\\b[^>]*>.*?</{t}\\s*>"))
            .collect();
        Regex::new(&format!("(?is){}", pairs.join("|"))).expect("static pattern")
    })
}

fn blocked_orphan_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("(?i)</?({})\\b[^>]*>", BLOCKED_TAGS.join("|"))).expect("static pattern")
    })
}

fn event_attr_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\s+on[a-z0-9_]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]*)"#)
            .expect("static pattern")
    })
}

fn javascript_href_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)href\s*=\s*("\s*javascript:[^"]*"|'\s*javascript:[^']*'|javascript:[^\s>]*)"#)
            .expect("static pattern")
    })
}

/// Sanitize without building a document tree.
///
/// Removes blocked-tag spans (content included) by paired-tag matching, drops
/// any orphan blocked tags left over, strips comments and `on*` attributes,
/// and replaces `javascript:` href values with a harmless placeholder.
pub fn sanitize_streaming(html: &str) -> String {
    // Repeat paired removal so spans revealed by an outer removal are also
    // caught, e.g. `<script><script></script></script>`.
    let mut current = html.to_string();
    loop {
        let next = blocked_span_pattern().replace_all(&current, "").to_string();
        if next == current {
            break;
        }
        current = next;
    }
    let html = blocked_orphan_pattern().replace_all(&current, "");
    let html = comment_pattern().replace_all(&html, "");
    let html = event_attr_pattern().replace_all(&html, "");
    javascript_href_pattern()
        .replace_all(&html, "href=\"#\"")
        .to_string()
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static pattern"))
}

fn line_break_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("static pattern"))
}

fn self_rendering_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("(?i)<({})\\b", SELF_RENDERING_TAGS.join("|"))).expect("static pattern")
    })
}

/// Decide whether a fragment would render anything visible.
///
/// Line breaks alone do not count: an input consisting solely of `<br>`
/// elements and whitespace (including `&nbsp;`) has no content. Otherwise a
/// fragment is visible if its stripped text content is non-empty or it
/// contains a self-rendering element.
pub fn has_visible_content(html: &str) -> bool {
    let html = comment_pattern().replace_all(html, "");

    let breaks_removed = line_break_pattern().replace_all(&html, "");
    let residue = breaks_removed.replace("&nbsp;", "");
    if residue.trim().is_empty() {
        return false;
    }

    let text = tag_pattern().replace_all(&html, "");
    let text = text.replace("&nbsp;", " ");
    if !text.trim().is_empty() {
        return true;
    }

    self_rendering_pattern().is_match(&html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Invariant checks shared by both strategies.
    fn assert_safe(output: &str) {
        let lower = output.to_lowercase();
        for tag in BLOCKED_TAGS {
            assert!(
                !lower.contains(&format!("<{tag}")),
                "blocked tag <{tag}> survived: {output}"
            );
        }
        assert!(!lower.contains("<!--"), "comment survived: {output}");
        assert!(
            !event_attr_pattern().is_match(output),
            "on* attribute survived: {output}"
        );
        assert!(
            !lower.contains("javascript:"),
            "javascript: href survived: {output}"
        );
    }

    #[test]
    fn removes_script_and_its_content() {
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy("<p>before</p><script>alert(1)</script><p>after</p>");
            assert_safe(&out);
            assert!(!out.contains("alert(1)"), "script body survived: {out}");
            assert!(out.contains("before"));
            assert!(out.contains("after"));
        }
    }

    #[test]
    fn removes_every_blocked_tag() {
        let input = "<video src=x></video><audio></audio><iframe src=y></iframe>\
                     <object data=z></object><embed src=w><div>keep</div>";
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy(input);
            assert_safe(&out);
            assert!(out.contains("keep"));
        }
    }

    #[test]
    fn removes_nested_blocked_subtrees() {
        let input = "<div><iframe><p>inner</p><script>x()</script></iframe><b>ok</b></div>";
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy(input);
            assert_safe(&out);
            assert!(out.contains("ok"));
        }
    }

    #[test]
    fn blocked_tags_are_case_insensitive() {
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy("<SCRIPT>alert(1)</SCRIPT><P>text</P>");
            assert_safe(&out);
            assert!(out.to_lowercase().contains("text"));
        }
    }

    #[test]
    fn strips_event_handler_attributes() {
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy(r#"<img src="a.png" onerror="alert(1)" onload='x()'>"#);
            assert_safe(&out);
            assert!(out.contains("a.png"), "legit attribute dropped: {out}");
        }
    }

    #[test]
    fn neutralizes_javascript_hrefs() {
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy(r#"<a href="javascript:alert(1)">link</a>"#);
            assert_safe(&out);
            assert!(out.contains("href=\"#\""), "placeholder missing: {out}");
            assert!(out.contains("link"));
        }
    }

    #[test]
    fn keeps_ordinary_hrefs() {
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy(r#"<a href="https://example.com/page">link</a>"#);
            assert!(out.contains("https://example.com/page"));
        }
    }

    #[test]
    fn drops_comments() {
        for strategy in [sanitize, sanitize_streaming] {
            let out = strategy("<p>a</p><!-- secret --><p>b</p>");
            assert_safe(&out);
            assert!(!out.contains("secret"));
        }
    }

    #[test]
    fn streaming_drops_unterminated_comment() {
        let out = sanitize_streaming("<p>a</p><!-- runs to the end");
        assert!(!out.contains("runs"));
        assert!(out.contains("<p>a</p>"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "<p>plain</p>",
            r#"<div class="x"><a href="javascript:x()">l</a><script>s</script></div>"#,
            "<ul><li>one</li><li>two</li></ul><!-- c -->",
            r#"<img src="a.png" onerror="x"><br><table><tr><td>t</td></tr></table>"#,
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "tree strategy not idempotent");
            let once = sanitize_streaming(input);
            assert_eq!(
                sanitize_streaming(&once),
                once,
                "streaming strategy not idempotent"
            );
        }
    }

    #[test]
    fn streaming_handles_doubled_script_spans() {
        let out = sanitize_streaming("<script><script>evil()</script></script>");
        assert_safe(&out);
        assert!(!out.contains("evil"));
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize("just text"), "just text");
        assert_eq!(sanitize_streaming("just text"), "just text");
    }

    #[test]
    fn line_breaks_alone_are_not_visible() {
        assert!(!has_visible_content("<br><br>"));
        assert!(!has_visible_content("<br> \n &nbsp; <BR/>"));
        assert!(!has_visible_content(""));
        assert!(!has_visible_content("   \n  "));
    }

    #[test]
    fn text_content_is_visible() {
        assert!(has_visible_content("<p>hi</p>"));
        assert!(has_visible_content("bare text"));
        assert!(has_visible_content("<br>text after break"));
    }

    #[test]
    fn self_rendering_tags_are_visible_without_text() {
        assert!(has_visible_content(r#"<img src="a.png">"#));
        assert!(has_visible_content("<hr>"));
        assert!(has_visible_content("<table></table>"));
        assert!(has_visible_content("<svg viewBox=\"0 0 1 1\"></svg>"));
        // Pre-sanitization check: embedding tags still signal intent.
        assert!(has_visible_content("<video src=\"x.mp4\"></video>"));
    }

    #[test]
    fn empty_wrappers_are_not_visible() {
        assert!(!has_visible_content("<p></p><div><span></span></div>"));
        assert!(!has_visible_content("<p> &nbsp; </p>"));
    }

    #[test]
    fn comments_do_not_count_as_content() {
        assert!(!has_visible_content("<!-- hidden -->"));
        assert!(!has_visible_content("<p><!-- hidden --></p>"));
    }
}
