//! Markdown-lite rich text editing: a plain-text buffer with splice-based
//! formatting, and an ordered regex pass that turns pasted HTML into the same
//! markdown subset.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Inline wrappers applied around the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inline {
    Bold,
    Italic,
    Code,
}

impl Inline {
    fn marker(&self) -> &'static str {
        match self {
            Inline::Bold => "**",
            Inline::Italic => "*",
            Inline::Code => "`",
        }
    }
}

/// Prefixes applied to every line touched by the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Heading,
    BulletList,
    NumberedList,
    Quote,
}

/// RichTextEditor
///
/// Byte offsets are clamped to the buffer and snapped back to the nearest char
/// boundary, so a stale selection never splits a UTF-8 sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichTextEditor {
    text: String,
    selection: Range<usize>,
}

impl RichTextEditor {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            text,
            selection: end..end,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn selected_text(&self) -> &str {
        &self.text[self.selection.clone()]
    }

    pub fn select(&mut self, range: Range<usize>) {
        let start = self.snap(range.start.min(range.end));
        let end = self.snap(range.end.max(range.start));
        self.selection = start..end;
    }

    pub fn set_cursor(&mut self, at: usize) {
        self.select(at..at);
    }

    /// Replaces the selection with `insert`; the cursor lands right after it.
    pub fn insert(&mut self, insert: &str) {
        let Range { start, end } = self.selection.clone();
        self.text.replace_range(start..end, insert);
        let cursor = start + insert.len();
        self.selection = cursor..cursor;
    }

    /// Wraps the selection in the inline marker. An empty selection inserts an empty
    /// pair and leaves the cursor between the markers.
    pub fn wrap(&mut self, style: Inline) {
        let Range { start, end } = self.selection.clone();
        let marker = style.marker();
        let wrapped = format!("{marker}{}{marker}", &self.text[start..end]);
        self.text.replace_range(start..end, &wrapped);
        self.selection = start + marker.len()..end + marker.len();
    }

    /// `[selected](url)`; with nothing selected the url doubles as the label.
    pub fn link(&mut self, url: &str) {
        let Range { start, end } = self.selection.clone();
        let label = if start == end {
            url.to_string()
        } else {
            self.text[start..end].to_string()
        };
        let markup = format!("[{label}]({url})");
        self.text.replace_range(start..end, &markup);
        let cursor = start + markup.len();
        self.selection = cursor..cursor;
    }

    /// Prefixes every line overlapping the selection. Numbered lists count from 1.
    /// A selection ending right after a newline does not reach into the next line.
    pub fn prefix_lines(&mut self, block: Block) {
        let Range { start, mut end } = self.selection.clone();
        if end > start && self.text[..end].ends_with('\n') {
            end -= 1;
        }
        let line_start = self.text[..start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let line_end = self.text[end..]
            .find('\n')
            .map(|i| end + i)
            .unwrap_or(self.text.len());

        let prefixed = self.text[line_start..line_end]
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                let prefix = match block {
                    Block::Heading => "## ".to_string(),
                    Block::BulletList => "- ".to_string(),
                    Block::NumberedList => format!("{}. ", i + 1),
                    Block::Quote => "> ".to_string(),
                };
                format!("{prefix}{line}")
            })
            .collect::<Vec<_>>()
            .join("\n");

        self.text.replace_range(line_start..line_end, &prefixed);
        let end = line_start + prefixed.len();
        self.selection = end..end;
    }

    /// Converts clipboard HTML and inserts the markdown at the selection.
    pub fn paste_html(&mut self, html: &str) {
        let markdown = html_to_markdown(html);
        self.insert(&markdown);
    }

    fn snap(&self, at: usize) -> usize {
        let mut at = at.min(self.text.len());
        while !self.text.is_char_boundary(at) {
            at -= 1;
        }
        at
    }
}

fn re(pattern: &str) -> Regex {
    // Patterns are literals in this file; a typo is a programming error caught by tests.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid editor pattern {pattern}: {e}"))
}

static ANY_TAG: Lazy<Regex> = Lazy::new(|| re(r"(?i)</?[a-z!][^>]*>"));
static SCRIPT_STYLE: Lazy<Regex> =
    Lazy::new(|| re(r"(?is)<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>"));
static COMMENT: Lazy<Regex> = Lazy::new(|| re(r"(?s)<!--.*?-->"));
static HEADING: Lazy<Regex> = Lazy::new(|| re(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]>"));
static STRONG: Lazy<Regex> = Lazy::new(|| re(r"(?is)<(?:strong|b)\b[^>]*>(.*?)</(?:strong|b)>"));
static EMPHASIS: Lazy<Regex> = Lazy::new(|| re(r"(?is)<(?:em|i)\b[^>]*>(.*?)</(?:em|i)>"));
static CODE: Lazy<Regex> = Lazy::new(|| re(r"(?is)<code\b[^>]*>(.*?)</code>"));
static ANCHOR: Lazy<Regex> =
    Lazy::new(|| re(r#"(?is)<a\b[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| re(r"(?i)<li\b[^>]*>"));
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| re(r"(?i)<br\s*/?>"));
static BLOCK_END: Lazy<Regex> = Lazy::new(|| re(r"(?i)</(?:p|div|ul|ol|blockquote)>"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| re(r"\n{3,}"));

/// html_to_markdown
///
/// Ordered substitutions; each step sees the output of the previous one, so the
/// order is part of the contract. Unbalanced markup is left partially converted.
/// Input without any tag is returned untouched.
pub fn html_to_markdown(html: &str) -> String {
    if !ANY_TAG.is_match(html) {
        return html.to_string();
    }

    let mut out = SCRIPT_STYLE.replace_all(html, "").into_owned();
    out = COMMENT.replace_all(&out, "").into_owned();
    out = HEADING
        .replace_all(&out, |caps: &Captures| {
            let level: usize = caps[1].parse().unwrap_or(1);
            format!("\n{} {}\n\n", "#".repeat(level), caps[2].trim())
        })
        .into_owned();
    out = STRONG.replace_all(&out, "**$1**").into_owned();
    out = EMPHASIS.replace_all(&out, "*$1*").into_owned();
    out = CODE.replace_all(&out, "`$1`").into_owned();
    out = ANCHOR.replace_all(&out, "[$2]($1)").into_owned();
    out = LIST_ITEM.replace_all(&out, "\n- ").into_owned();
    out = LINE_BREAK.replace_all(&out, "\n").into_owned();
    out = BLOCK_END.replace_all(&out, "\n\n").into_owned();
    out = ANY_TAG.replace_all(&out, "").into_owned();
    out = decode_entities(&out);
    out = BLANK_RUNS.replace_all(&out, "\n\n").into_owned();
    out.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;" instead of collapsing twice.
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
