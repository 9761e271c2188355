//! HTML parsing into a queryable document.
//!
//! [`Document`] holds two trees built from the same bytes: the preprocessed
//! one that extraction scores, and the untouched source that metadata lookups
//! read from (JSON-LD scripts and hidden `<meta>`-adjacent markup only exist there).
//!
//! # Example
//!
//! ```rust
//! use quire_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let paragraphs = doc.select("p.content").unwrap();
//! assert_eq!(paragraphs.len(), 1);
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{PreprocessConfig, QuireError, Result, preprocess};

/// Number of leading characters inspected by the binary sniff.
const SNIFF_WINDOW: usize = 1024;

/// Represents a parsed HTML document.
///
/// # Example
///
/// ```rust
/// use quire_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html).unwrap();
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    source: Html,
    raw: String,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string without preprocessing.
    ///
    /// # Errors
    ///
    /// Returns [`QuireError::ParseFailed`] for empty or binary input.
    pub fn parse(html: &str) -> Result<Self> {
        sniff(html)?;
        let parsed = Html::parse_document(html);
        Ok(Self { source: parsed.clone(), html: parsed, raw: html.to_string(), base_url: None })
    }

    /// Parses HTML from a string with the default preprocessing.
    ///
    /// `base_url` is used to resolve relative links and media sources.
    ///
    /// # Example
    ///
    /// ```rust
    /// use quire_core::parse::Document;
    ///
    /// let html = "<html><body><article>Content</article></body></html>";
    /// let doc = Document::parse_with_preprocessing(html, None).unwrap();
    /// assert!(doc.text_content().contains("Content"));
    /// ```
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>) -> Result<Self> {
        let config = PreprocessConfig { base_url, ..Default::default() };
        Self::parse_with_config(html, &config)
    }

    /// Parses HTML with an explicit preprocessing configuration.
    pub fn parse_with_config(html: &str, config: &PreprocessConfig) -> Result<Self> {
        sniff(html)?;

        let cleaned = preprocess::preprocess_html(html, config);
        Ok(Self {
            html: Html::parse_document(&cleaned),
            source: Html::parse_document(html),
            raw: html.to_string(),
            base_url: config.base_url.clone(),
        })
    }

    /// Gets the base URL used for preprocessing.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// The preprocessed tree.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The tree parsed from the unmodified input.
    pub fn source(&self) -> &Html {
        &self.source
    }

    /// The unmodified input markup.
    pub fn raw_html(&self) -> &str {
        &self.raw
    }

    /// Selects elements of the preprocessed tree using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`QuireError::ParseFailed`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use quire_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html).unwrap();
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::from).collect())
    }

    /// Same as [`select`](Self::select), against the unmodified source tree.
    pub fn select_source(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.source.select(&sel).map(Element::from).collect())
    }

    /// The `<body>` of the preprocessed tree, or its root when there is none.
    pub fn body(&'_ self) -> Element<'_> {
        Selector::parse("body")
            .ok()
            .and_then(|sel| self.html.select(&sel).next())
            .unwrap_or_else(|| self.html.root_element())
            .into()
    }

    /// Gets the text of the first `<title>` element, trimmed.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.source
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Gets all text content from the preprocessed tree.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| QuireError::ParseFailed(format!("Invalid selector: {e}")))
}

/// Rejects input that cannot be an HTML document.
///
/// Empty bodies, NUL bytes, or a window dominated by control characters or
/// decoding replacement characters indicate a binary payload.
fn sniff(html: &str) -> Result<()> {
    if html.trim().is_empty() {
        return Err(QuireError::ParseFailed("document is empty".to_string()));
    }

    if html.contains('\0') {
        return Err(QuireError::ParseFailed("document contains binary data".to_string()));
    }

    let mut total = 0usize;
    let mut suspicious = 0usize;
    for c in html.chars().take(SNIFF_WINDOW) {
        total += 1;
        if c == '\u{FFFD}' || (c.is_control() && !c.is_whitespace()) {
            suspicious += 1;
        }
    }

    if suspicious * 10 > total {
        return Err(QuireError::ParseFailed("document does not look like text".to_string()));
    }

    Ok(())
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use quire_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html).unwrap();
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> From<ElementRef<'a>> for Element<'a> {
    fn from(element: ElementRef<'a>) -> Self {
        Self { element }
    }
}

impl<'a> Element<'a> {
    /// The underlying scraper reference.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Concatenation of all descendant text nodes.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_ascii_lowercase()
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`QuireError::ParseFailed`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::from).collect())
    }

    /// Whether the element's own text nodes (not its descendants') are all whitespace.
    pub fn own_text_is_blank(&self) -> bool {
        self.element
            .children()
            .filter_map(|child| child.value().as_text())
            .all(|text| text.trim().is_empty())
    }

    /// Direct element children in document order.
    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + use<'a> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page</title>
            <script type="application/ld+json">{"headline":"From JSON-LD"}</script>
        </head>
        <body>
            <h1>Heading</h1>
            <p class="content">Paragraph 1</p>
            <p class="content">Paragraph 2</p>
            <a href="/relative">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        assert_eq!(doc.title(), Some("Test Page".to_string()));
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Paragraph 1");
        assert_eq!(elements[1].text(), "Paragraph 2");
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML).unwrap();
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(QuireError::ParseFailed(_))));
    }

    #[test]
    fn test_preprocessing_keeps_source_tree() {
        let base = Url::parse("https://example.com/posts/").unwrap();
        let doc = Document::parse_with_preprocessing(SAMPLE_HTML, Some(base)).unwrap();

        let link = &doc.select("a").unwrap()[0];
        assert_eq!(link.attr("href"), Some("https://example.com/relative"));

        let source_link = &doc.select_source("a").unwrap()[0];
        assert_eq!(source_link.attr("href"), Some("/relative"));
        assert_eq!(doc.raw_html(), SAMPLE_HTML);
    }

    #[test]
    fn test_body_falls_back_to_root() {
        let doc = Document::parse("<p>Loose paragraph</p>").unwrap();
        assert_eq!(doc.body().tag_name(), "body");
    }

    #[test]
    fn test_children_in_document_order() {
        let doc = Document::parse("<div><p>a</p>text<span>b</span><!-- c --><em>d</em></div>").unwrap();
        let div = doc.select("div").unwrap()[0];
        let tags: Vec<String> = div.children().map(|c| c.tag_name()).collect();
        assert_eq!(tags, vec!["p", "span", "em"]);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(Document::parse(""), Err(QuireError::ParseFailed(_))));
        assert!(matches!(Document::parse("  \n\t "), Err(QuireError::ParseFailed(_))));
    }

    #[test]
    fn test_binary_input_rejected() {
        let png_like = "\u{FFFD}PNG\r\n\u{1A}\n\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}IHDR\u{FFFD}\u{FFFD}";
        assert!(matches!(Document::parse(png_like), Err(QuireError::ParseFailed(_))));
        assert!(matches!(Document::parse("<p>a\0b</p>"), Err(QuireError::ParseFailed(_))));
    }

    #[test]
    fn test_malformed_markup_still_parses() {
        let doc = Document::parse("<div><p>Unclosed paragraph<div>Nested <b>bold").unwrap();
        assert!(doc.text_content().contains("Unclosed paragraph"));
        assert!(doc.text_content().contains("bold"));
    }
}
