//! Highlighted-code run builder.
//!
//! An external highlighting engine turns code into a constrained HTML subset:
//! nested `<span class="...">` elements and `<br>`, nothing else. This module
//! converts that markup into the ordered run sequence the document assembler
//! consumes, resolving a color for every piece of text from the innermost
//! style scope that has one configured.
//!
//! Two variants produce the sequence: a hand-rolled streaming scanner that
//! reconstructs the scope stack without a document tree, and a tree walk over
//! a parsed DOM. Both drive the same run emitter and must produce identical
//! sequences for the same input and theme.

use serde::{Deserialize, Serialize};

use crate::theme::Theme;

/// A single styled piece of text. Never contains a line break; lines are
/// separated by explicit [`Run::Break`] markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// RRGGBB hex, no leading `#`.
    pub color: String,
    pub font: String,
    pub size: f32,
}

/// One element of a run sequence: styled text or an explicit line break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Run {
    Text(TextRun),
    Break,
}

/// Build the run sequence for a code block.
///
/// `highlighted` is the engine's markup for `code`, when the engine produced
/// any. Without it (engine declined, or no language matched) the raw code
/// degrades to a single-style sequence split only on line boundaries.
pub fn build_runs(code: &str, highlighted: Option<&str>, theme: &Theme) -> Vec<Run> {
    match highlighted {
        Some(markup) => scan_markup(markup, theme),
        None => plain_runs(code, theme),
    }
}

/// Tree-walking variant of [`build_runs`].
///
/// Derives nesting from a parsed DOM instead of the tag scanner. Falls back
/// to the scanner if the markup cannot be parsed. Output is identical to
/// [`build_runs`] for the same input and theme.
pub fn build_runs_tree(code: &str, highlighted: Option<&str>, theme: &Theme) -> Vec<Run> {
    let Some(markup) = highlighted else {
        return plain_runs(code, theme);
    };
    let Ok(dom) = tl::parse(markup, tl::ParserOptions::default()) else {
        return scan_markup(markup, theme);
    };
    let parser = dom.parser();
    let mut emitter = RunEmitter::new(theme, true);
    for handle in dom.children() {
        walk_node(*handle, parser, &mut emitter);
    }
    emitter.finish()
}

/// Unstyled fallback: every line under the theme default, no entity decoding
/// (the input is raw code, not markup).
fn plain_runs(code: &str, theme: &Theme) -> Vec<Run> {
    let mut emitter = RunEmitter::new(theme, false);
    emitter.text(code);
    emitter.finish()
}

// ------------------------------------------------------------------
// Shared run emitter
// ------------------------------------------------------------------

/// Accumulates text against a stack of open style scopes and emits runs.
///
/// Both markup variants push/pop scopes and feed text through this; the
/// flush-before-mutation discipline lives here so neither can get it wrong.
/// State is per call and discarded with the emitter.
struct RunEmitter<'a> {
    theme: &'a Theme,
    /// Class-token sets of the currently open scopes, outermost first.
    stack: Vec<Vec<String>>,
    buffer: String,
    runs: Vec<Run>,
    decode: bool,
}

impl<'a> RunEmitter<'a> {
    fn new(theme: &'a Theme, decode: bool) -> Self {
        RunEmitter {
            theme,
            stack: Vec::new(),
            buffer: String::new(),
            runs: Vec::new(),
            decode,
        }
    }

    /// Open a style scope. Buffered text is flushed first: it belongs to the
    /// styling in effect before the tag.
    fn open_scope(&mut self, classes: Vec<String>) {
        self.flush();
        self.stack.push(classes);
    }

    fn close_scope(&mut self) {
        self.flush();
        self.stack.pop();
    }

    fn text(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// A line-break tag appends an explicit newline; the flush turns it into
    /// a [`Run::Break`].
    fn line_break(&mut self) {
        self.buffer.push('\n');
    }

    /// Innermost-to-outermost walk over open scopes; the first class token
    /// with a configured color wins, else the theme default.
    fn current_color(&self) -> &str {
        for frame in self.stack.iter().rev() {
            for token in frame {
                if let Some(color) = self.theme.color_for_token(token) {
                    return color;
                }
            }
        }
        &self.theme.default_color
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = if self.decode {
            decode_entities(&self.buffer)
        } else {
            std::mem::take(&mut self.buffer)
        };
        self.buffer.clear();

        let color = self.current_color().to_string();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.runs.push(Run::Break);
            }
            if !line.is_empty() {
                self.runs.push(Run::Text(TextRun {
                    text: line.to_string(),
                    color: color.clone(),
                    font: self.theme.code_font.clone(),
                    size: self.theme.code_size,
                }));
            }
        }
    }

    fn finish(mut self) -> Vec<Run> {
        self.flush();
        self.runs
    }
}

// ------------------------------------------------------------------
// Streaming scanner
// ------------------------------------------------------------------

/// Scan engine markup without building a tree. Text accumulates into the
/// emitter's buffer; each tag delimiter flushes it under the pre-tag styling,
/// then mutates the scope stack. Only `span` and `br` are semantically
/// recognized; anything else is skipped as a tag but its text still flows.
fn scan_markup(markup: &str, theme: &Theme) -> Vec<Run> {
    let mut emitter = RunEmitter::new(theme, true);
    let mut rest = markup;
    while let Some(open) = rest.find('<') {
        emitter.text(&rest[..open]);
        let after = &rest[open..];
        match after.find('>') {
            Some(close) => {
                apply_tag(&after[1..close], &mut emitter);
                rest = &after[close + 1..];
            }
            None => {
                // Unterminated delimiter: the remainder is plain text.
                emitter.text(after);
                rest = "";
                break;
            }
        }
    }
    emitter.text(rest);
    emitter.finish()
}

fn apply_tag(tag: &str, emitter: &mut RunEmitter<'_>) {
    let tag = tag.trim();
    if let Some(closer) = tag.strip_prefix('/') {
        if closer.trim().eq_ignore_ascii_case("span") {
            emitter.close_scope();
        }
        return;
    }
    let name = tag
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("");
    if name.eq_ignore_ascii_case("span") {
        emitter.open_scope(parse_classes(tag));
    } else if name.eq_ignore_ascii_case("br") {
        emitter.line_break();
    }
}

/// Extract the class-token list from a tag's attribute text.
fn parse_classes(tag: &str) -> Vec<String> {
    let lower = tag.to_lowercase();
    let Some(pos) = lower.find("class") else {
        return Vec::new();
    };
    let rest = tag[pos + "class".len()..].trim_start();
    let Some(rest) = rest.strip_prefix('=') else {
        return Vec::new();
    };
    let rest = rest.trim_start();
    let value = if let Some(quoted) = rest.strip_prefix('"') {
        quoted.split('"').next().unwrap_or("")
    } else if let Some(quoted) = rest.strip_prefix('\'') {
        quoted.split('\'').next().unwrap_or("")
    } else {
        rest.split(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .next()
            .unwrap_or("")
    };
    value.split_whitespace().map(str::to_string).collect()
}

// ------------------------------------------------------------------
// Tree walk
// ------------------------------------------------------------------

fn walk_node(handle: tl::NodeHandle, parser: &tl::Parser<'_>, emitter: &mut RunEmitter<'_>) {
    let Some(node) = handle.get(parser) else {
        return;
    };
    match node {
        tl::Node::Tag(tag) => {
            let name = tag.name().as_utf8_str().to_lowercase();
            match name.as_str() {
                "br" => emitter.line_break(),
                "span" => {
                    let mut classes = Vec::new();
                    for (key, value) in tag.attributes().iter() {
                        if key.as_ref().eq_ignore_ascii_case("class") {
                            let value = value.map(|v| v.to_string()).unwrap_or_default();
                            classes = value.split_whitespace().map(str::to_string).collect();
                        }
                    }
                    emitter.open_scope(classes);
                    for child in tag.children().top().iter() {
                        walk_node(*child, parser, emitter);
                    }
                    emitter.close_scope();
                }
                // Unknown wrappers are transparent: no scope, text flows.
                _ => {
                    for child in tag.children().top().iter() {
                        walk_node(*child, parser, emitter);
                    }
                }
            }
        }
        tl::Node::Raw(bytes) => emitter.text(&bytes.as_utf8_str()),
        tl::Node::Comment(_) => {}
    }
}

// ------------------------------------------------------------------
// Entity decoding
// ------------------------------------------------------------------

/// Decode numeric and common named HTML entities. Unrecognized or malformed
/// entities pass through literally.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail[1..].find(';').filter(|&end| end <= 32) {
            Some(end) => {
                let entity = &tail[1..end + 1];
                match decode_entity(entity) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&tail[..end + 2]),
                }
                rest = &tail[end + 2..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse().ok()?
            } else {
                return None;
            };
            char::from_u32(code)
        }
    }
}
