//! Inline caption styling
//!
//! Captions are sent with HTML parse mode, so bold and italic map to `<b>`
//! and `<i>` tags.

use regex::Regex;
use std::sync::LazyLock;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?[bi]>").expect("markup tag pattern is valid"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("html tag pattern is valid"));

/// Inline style a user can apply to part of the caption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
}

impl Style {
    /// Find the style marker in a reply, ignoring case. Bold wins when both are present.
    pub fn detect(text: &str) -> Option<Style> {
        let text = text.to_ascii_lowercase();
        if text.contains("<b>") {
            Some(Style::Bold)
        } else if text.contains("<i>") {
            Some(Style::Italic)
        } else {
            None
        }
    }

    fn tags(self) -> (&'static str, &'static str) {
        match self {
            Style::Bold => ("<b>", "</b>"),
            Style::Italic => ("<i>", "</i>"),
        }
    }

    pub fn wrap(self, fragment: &str) -> String {
        let (open, close) = self.tags();
        format!("{open}{fragment}{close}")
    }
}

/// Byte offset of the first occurrence of `fragment` in the caption's text,
/// skipping anything inside `<...>` tags
pub fn find_in_text(caption: &str, fragment: &str) -> Option<usize> {
    if fragment.is_empty() {
        return None;
    }
    let mut text_start = 0;
    let tag_spans = HTML_TAG
        .find_iter(caption)
        .map(|tag| (tag.start(), tag.end()))
        .chain(std::iter::once((caption.len(), caption.len())));

    for (tag_start, tag_end) in tag_spans {
        let text = caption.get(text_start..tag_start)?;
        if let Some(offset) = text.find(fragment) {
            return Some(text_start + offset);
        }
        text_start = tag_end;
    }
    None
}

/// Wrap the first occurrence of `fragment` in the caption's text.
///
/// Returns `None` when the fragment is empty or only occurs inside markup.
pub fn apply_style(caption: &str, fragment: &str, style: Style) -> Option<String> {
    let at = find_in_text(caption, fragment)?;
    let before = caption.get(..at)?;
    let after = caption.get(at + fragment.len()..)?;
    Some(format!("{before}{}{after}", style.wrap(fragment)))
}

/// Plain text of a reply such as `<b>hello</b>`
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").trim().to_string()
}
