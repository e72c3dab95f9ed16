//! Markdown to HTML conversion.
//!
//! Issue bodies and comments are GitHub flavoured Markdown, so tables,
//! strikethrough, autolinks and task lists are enabled. Raw HTML is passed
//! through because GitHub attachments are usually pasted as `<img>` tags,
//! but the GFM tag filter still escapes `<script>`, `<iframe>` and friends.

use comrak::{markdown_to_html as comrak_to_html, Options};

/// Convert Markdown text to an HTML fragment
pub fn markdown_to_html(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options.extension.tagfilter = true;
    options.render.unsafe_ = true;

    comrak_to_html(markdown, &options)
}

/// Convert optional Markdown, treating `None` as empty
pub fn optional_markdown_to_html(markdown: Option<&str>) -> String {
    markdown.map(markdown_to_html).unwrap_or_default()
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
