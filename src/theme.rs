//! Highlight theme: class-token color table plus code typography.
//!
//! Color keys follow highlight.js scope names with hyphens normalized to
//! underscores (`built_in`, `selector_tag`). Values are RRGGBB hex strings
//! without a leading `#`, the form the document assembler consumes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Read-only styling table used by the run builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Scope name → RRGGBB hex color.
    pub colors: HashMap<String, String>,
    /// Foreground used when no scope on the style stack resolves.
    pub default_color: String,
    /// Monospace font family for code runs.
    pub code_font: String,
    /// Code point size.
    pub code_size: f32,
}

impl Default for Theme {
    fn default() -> Self {
        let colors = [
            ("keyword", "D73A49"),
            ("built_in", "E36209"),
            ("type", "D73A49"),
            ("literal", "005CC5"),
            ("number", "005CC5"),
            ("string", "032F62"),
            ("regexp", "032F62"),
            ("comment", "6A737D"),
            ("doctag", "D73A49"),
            ("title", "6F42C1"),
            ("function", "6F42C1"),
            ("class", "6F42C1"),
            ("attr", "005CC5"),
            ("attribute", "005CC5"),
            ("variable", "E36209"),
            ("symbol", "005CC5"),
            ("meta", "005CC5"),
            ("selector_tag", "22863A"),
            ("selector_class", "6F42C1"),
            ("selector_id", "6F42C1"),
            ("addition", "22863A"),
            ("deletion", "B31D28"),
            ("name", "22863A"),
            ("tag", "22863A"),
            ("params", "24292E"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Theme {
            colors,
            default_color: "24292E".to_string(),
            code_font: "Consolas".to_string(),
            code_size: 10.0,
        }
    }
}

impl Theme {
    /// Load a theme from a YAML document. Missing fields take their defaults.
    pub fn from_yaml(source: &str) -> Result<Theme, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    /// Resolve one class token to a configured color.
    ///
    /// The engine prefixes every scope class with its namespace
    /// (`hljs-keyword`); the prefix is stripped before lookup and hyphens are
    /// normalized to the table's underscore form. Returns `None` for tokens
    /// with no configured color, letting the caller fall through to outer
    /// scopes.
    pub fn color_for_token(&self, token: &str) -> Option<&str> {
        let scope = token
            .strip_prefix("hljs-")
            .or_else(|| token.strip_prefix("language-"))
            .unwrap_or(token);
        let key = scope.replace('-', "_");
        self.colors.get(&key).map(String::as_str)
    }
}
