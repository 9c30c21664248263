//! HTML to comparable plain text
//!
//! Strips elements whose content changes on every request without the page
//! itself changing (inline scripts, styles, refresh and viewport meta tags),
//! then extracts the remaining text one non-blank line at a time.

use scraper::{Html, Selector};

/// Elements removed before text extraction
const VOLATILE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "meta[http-equiv=\"refresh\"]",
    "meta[name=\"viewport\"]",
];

/// Content normalizer
pub struct ContentNormalizer {
    /// Pre-compiled volatile element selectors
    volatile: Vec<Selector>,
}

impl ContentNormalizer {
    pub fn new() -> Self {
        let volatile = VOLATILE_SELECTORS
            .iter()
            .filter_map(|s| match Selector::parse(s) {
                Ok(sel) => Some(sel),
                Err(e) => {
                    tracing::warn!("Invalid volatile selector '{}': {}", s, e);
                    None
                }
            })
            .collect();
        Self { volatile }
    }

    /// Normalize an HTML document into line-oriented plain text.
    ///
    /// Parsing is lenient: malformed markup yields whatever text the parser
    /// recovers. Input with no visible text normalizes to an empty string.
    pub fn normalize(&self, html: &str) -> String {
        let mut document = Html::parse_document(html);

        let doomed: Vec<_> = self
            .volatile
            .iter()
            .flat_map(|sel| document.select(sel).map(|el| el.id()).collect::<Vec<_>>())
            .collect();
        for id in doomed {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }

        let mut raw = String::with_capacity(html.len() / 2);
        for node in document.tree.root().descendants() {
            if let Some(text) = node.value().as_text() {
                raw.push_str(text);
            }
        }

        collapse_whitespace(&raw)
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse runs of whitespace within each line and drop blank lines.
fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for line in text.lines() {
        let mut words = line.split_whitespace().peekable();
        if words.peek().is_none() {
            continue;
        }
        if !result.is_empty() {
            result.push('\n');
        }
        for (i, word) in words.enumerate() {
            if i > 0 {
                result.push(' ');
            }
            result.push_str(word);
        }
    }
    result
}
