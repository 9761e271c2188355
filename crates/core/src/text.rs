//! Plain-text rendering of extracted article HTML.
//!
//! Block elements become paragraphs separated by a blank line, `<br>` becomes
//! a newline, and inline whitespace collapses to single spaces. Preformatted
//! blocks keep their whitespace.

use scraper::{ElementRef, Html, Node};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "ol", "p", "pre", "section",
    "summary", "table", "ul",
];

const LINE_TAGS: &[&str] = &["li", "tr"];

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Renders HTML as readable plain text.
///
/// # Example
///
/// ```rust
/// use quire_core::text::html_to_text;
///
/// let text = html_to_text("<h1>Title</h1><p>First   line<br>second line</p>");
/// assert_eq!(text, "Title\n\nFirst line\nsecond line");
/// ```
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    walk(fragment.root_element(), false, &mut out);
    tidy(&out)
}

fn walk(element: ElementRef<'_>, in_pre: bool, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if in_pre {
                    out.push_str(text);
                } else {
                    push_collapsed(out, text);
                }
            }
            Node::Element(el) => {
                let tag = el.name();
                if SKIPPED_TAGS.contains(&tag) {
                    continue;
                }
                if tag == "br" {
                    out.push('\n');
                    continue;
                }

                let Some(child_ref) = ElementRef::wrap(child) else { continue };
                let is_block = BLOCK_TAGS.contains(&tag);
                if is_block {
                    out.push_str("\n\n");
                } else if LINE_TAGS.contains(&tag) {
                    out.push('\n');
                }

                walk(child_ref, in_pre || tag == "pre", out);

                if is_block {
                    out.push_str("\n\n");
                } else if matches!(tag, "td" | "th") {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with([' ', '\n']) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}

/// Trims line ends and keeps at most one blank line between paragraphs.
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for line in raw.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run == 1 && !lines.is_empty() {
                lines.push("");
            }
            continue;
        }
        blank_run = 0;
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Number of whitespace-separated tokens in `text`.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
