//! Main content extraction API.
//!
//! The entry point is [`Readability`], which turns a parsed [`Document`] into
//! an [`Extraction`]: the cleaned article body plus its metadata. Extraction
//! is pure and synchronous; fetching lives in [`crate::fetch`].
//!
//! # Example
//!
//! ```rust
//! use quire_core::readability::parse_with_url;
//!
//! let paragraph = "<p>Rivers cut canyons slowly, grain by grain, over millions of years of patient work.</p>";
//! let html = format!(
//!     "<html><head><title>Canyons</title></head><body><article>{}</article></body></html>",
//!     paragraph.repeat(3)
//! );
//! let extraction = parse_with_url(&html, "https://example.com/canyons").unwrap();
//! assert_eq!(extraction.title.as_deref(), Some("Canyons"));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

use crate::extract::{ExtractConfig, ExtractedContent, extract_content};
use crate::metadata::clean_byline;
use crate::parse::Document;
use crate::postprocess::PostProcessConfig;
use crate::scoring::UNLIKELY_PATTERNS;
use crate::{PreprocessConfig, QuireError, Result};

/// A "By Jane Doe" line at the top of the article text.
static BYLINE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:by)\s+(\p{Lu}[\p{L}'.\-]*(?:\s+\p{Lu}[\p{L}'.\-]*){0,3})\s*$").unwrap());

static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| Regex::new(UNLIKELY_PATTERNS).unwrap());

/// Text length a block needs before it counts towards readability.
const READABLE_MIN_LENGTH: usize = 140;

/// Accumulated score above which a page is probably an article.
const READABLE_MIN_SCORE: f64 = 20.0;

const EXCERPT_MAX_CHARS: usize = 300;

/// Configuration for the Readability extractor.
///
/// # Example
///
/// ```rust
/// use quire_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(25.0)
///     .char_threshold(500)
///     .preserve_images(true)
///     .build();
/// assert_eq!(config.char_threshold, 500);
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score the top candidate needs (default: 10.0).
    pub min_score: f64,

    /// Minimum character count of the extracted text (default: 140).
    pub char_threshold: usize,

    /// Number of top candidates to track (default: 5).
    pub nb_top_candidates: usize,

    /// Maximum elements to parse (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Whether to remove unlikely candidates on the first attempt (default: true).
    pub remove_unlikely: bool,

    /// Whether to preserve class attributes in output HTML (default: false).
    pub keep_classes: bool,

    /// Whether to preserve images in output HTML (default: true).
    pub preserve_images: bool,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 10.0,
            char_threshold: 140,
            nb_top_candidates: 5,
            max_elems_to_parse: 0,
            remove_unlikely: true,
            keep_classes: false,
            preserve_images: true,
        }
    }
}

impl ReadabilityConfig {
    /// Creates a new builder for ReadabilityConfig.
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for ReadabilityConfig.
///
/// # Example
///
/// ```rust
/// use quire_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(30.0)
///     .char_threshold(1000)
///     .keep_classes(true)
///     .build();
/// assert!(config.keep_classes);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    /// Sets the maximum elements to parse.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets whether to remove unlikely candidates.
    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    /// Sets whether to preserve images in output HTML.
    pub fn preserve_images(mut self, value: bool) -> Self {
        self.config.preserve_images = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

/// Article content and metadata pulled out of a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Title from the metadata chain, if any source had one.
    pub title: Option<String>,
    pub byline: Option<String>,
    /// Cleaned article body.
    pub content_html: String,
    /// Plain-text rendering of `content_html`.
    pub text_content: String,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published: Option<OffsetDateTime>,
    /// Score of the container the content was taken from.
    pub top_score: f64,
}

/// Readability-style article extractor.
///
/// # Example
///
/// ```rust
/// use quire_core::Readability;
///
/// let reader = Readability::new();
/// let html = "<html><body><nav><a href=\"/\">Home</a></nav></body></html>";
/// assert!(reader.parse(html).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    /// Creates a new Readability instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new Readability instance with a custom configuration.
    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Parses an HTML string and extracts the article.
    ///
    /// # Errors
    ///
    /// [`QuireError::ParseFailed`] for input that is not HTML and
    /// [`QuireError::ExtractionFailed`] when no article content is found.
    pub fn parse(&self, html: &str) -> Result<Extraction> {
        self.extract(&self.parse_document(html, None)?)
    }

    /// Parses HTML fetched from `url`, resolving relative links against it.
    pub fn parse_with_url(&self, html: &str, url: &Url) -> Result<Extraction> {
        self.extract(&self.parse_document(html, Some(url))?)
    }

    /// Builds the document tree [`extract`](Self::extract) expects, with this
    /// extractor's preprocessing applied.
    pub fn parse_document(&self, html: &str, url: Option<&Url>) -> Result<Document> {
        Document::parse_with_config(html, &self.preprocess_config(self.config.remove_unlikely, url.cloned()))
    }

    /// Extracts the article from an already parsed document.
    ///
    /// When the first pass finds nothing, extraction is retried on a fresh
    /// parse that keeps unlikely candidates, then once more with class
    /// weighting and conditional cleaning turned off. The first failure is
    /// reported if every pass fails.
    pub fn extract(&self, doc: &Document) -> Result<Extraction> {
        let content = self.extract_with_retries(doc)?;
        let metadata = doc.extract_metadata();

        let byline = metadata.byline.or_else(|| byline_from_text(&content.text));
        let excerpt = metadata.excerpt.or_else(|| excerpt_from_text(&content.text));

        Ok(Extraction {
            title: metadata.title,
            byline,
            content_html: content.content,
            text_content: content.text,
            excerpt,
            site_name: metadata.site_name,
            published: metadata.published,
            top_score: content.top_score,
        })
    }

    fn extract_with_retries(&self, doc: &Document) -> Result<ExtractedContent> {
        let strict = self.extract_config(true);
        let first_error = match extract_content(doc, &strict) {
            Ok(content) => return Ok(content),
            Err(err @ QuireError::ExtractionFailed { .. }) => err,
            Err(err) => return Err(err),
        };
        debug!(error = %first_error, "first extraction pass failed, retrying with relaxed settings");

        let relaxed_doc =
            Document::parse_with_config(doc.raw_html(), &self.preprocess_config(false, doc.base_url().cloned()))?;

        for config in [strict, self.extract_config(false)] {
            match extract_content(&relaxed_doc, &config) {
                Ok(content) => return Ok(content),
                Err(QuireError::ExtractionFailed { reason }) => debug!(%reason, "relaxed extraction pass failed"),
                Err(err) => return Err(err),
            }
        }

        Err(first_error)
    }

    fn preprocess_config(&self, remove_unlikely: bool, base_url: Option<Url>) -> PreprocessConfig {
        PreprocessConfig { remove_unlikely, base_url, ..Default::default() }
    }

    fn extract_config(&self, strict: bool) -> ExtractConfig {
        ExtractConfig {
            min_score_threshold: self.config.min_score,
            max_top_candidates: self.config.nb_top_candidates,
            char_threshold: self.config.char_threshold,
            max_elements: self.config.max_elems_to_parse,
            weight_classes: strict,
            clean_conditionally: strict,
            postprocess: PostProcessConfig {
                strip_images: !self.config.preserve_images,
                keep_classes: self.config.keep_classes,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Checks if a page appears to hold an article without full extraction.
    ///
    /// Every `p`, `pre` and `article` with more than 140 characters of text
    /// adds the square root of its excess length; boilerplate-named elements
    /// are ignored. The page qualifies once the total passes 20.
    ///
    /// # Example
    ///
    /// ```rust
    /// use quire_core::Readability;
    ///
    /// let reader = Readability::new();
    /// let long = "A sentence with enough words to matter for the reader. ".repeat(12);
    /// let html_article = format!("<html><body><article><p>{long}</p></article></body></html>");
    /// let html_nav = "<html><body><nav><a href=\"/\">Link</a></nav></body></html>";
    ///
    /// assert!(reader.is_probably_readable(&html_article));
    /// assert!(!reader.is_probably_readable(html_nav));
    /// ```
    pub fn is_probably_readable(&self, html: &str) -> bool {
        let Ok(doc) = Document::parse(html) else { return false };

        let mut score = 0.0;
        for element in doc.select("p, pre, article").unwrap_or_default() {
            let names = format!("{} {}", element.attr("class").unwrap_or_default(), element.attr("id").unwrap_or_default());
            if UNLIKELY.is_match(&names) {
                continue;
            }

            let length = element.text().trim().chars().count();
            if length < READABLE_MIN_LENGTH {
                continue;
            }

            score += ((length - READABLE_MIN_LENGTH) as f64).sqrt();
            if score > READABLE_MIN_SCORE {
                return true;
            }
        }

        false
    }
}

/// A "By Name" line among the first lines of the article text.
fn byline_from_text(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(3)
        .find_map(|line| BYLINE_LINE.captures(line).and_then(|caps| caps.get(1)))
        .and_then(|name| clean_byline(name.as_str()))
}

/// The first substantial paragraph, cut at a character boundary.
fn excerpt_from_text(text: &str) -> Option<String> {
    let paragraph = text.split("\n\n").map(str::trim).find(|p| p.chars().count() > 50)?;
    if paragraph.chars().count() > EXCERPT_MAX_CHARS {
        let cut: String = paragraph.chars().take(EXCERPT_MAX_CHARS).collect();
        Some(format!("{}...", cut.trim_end()))
    } else {
        Some(paragraph.to_string())
    }
}

/// Convenience function for one-liner extraction with defaults.
pub fn parse(html: &str) -> Result<Extraction> {
    Readability::new().parse(html)
}

/// Convenience function for extraction with a source URL.
///
/// # Errors
///
/// Returns [`QuireError::InvalidUrl`] if `url` does not parse.
pub fn parse_with_url(html: &str, url: &str) -> Result<Extraction> {
    let base_url = Url::parse(url).map_err(|e| QuireError::InvalidUrl(e.to_string()))?;
    Readability::new().parse_with_url(html, &base_url)
}

/// Quick readability check with default settings.
pub fn is_probably_readable(html: &str) -> bool {
    Readability::new().is_probably_readable(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_paragraph(topic: &str) -> String {
        format!(
            "<p>{topic} is the subject of this paragraph, which goes on at length, with commas, clauses, \
             and enough detail to look like real prose written by a patient author.</p>"
        )
    }

    fn article_page(extra_head: &str, body_prefix: &str) -> String {
        format!(
            "<html><head><title>Field Notes | Example</title>{extra_head}</head><body>{body_prefix}\
             <div class=\"entry-content\">{}{}{}</div></body></html>",
            long_paragraph("Weather"),
            long_paragraph("Soil"),
            long_paragraph("Rainfall")
        )
    }

    #[test]
    fn test_config_builder() {
        let config = ReadabilityConfig::builder()
            .min_score(25.0)
            .char_threshold(500)
            .nb_top_candidates(10)
            .max_elems_to_parse(1000)
            .remove_unlikely(false)
            .keep_classes(true)
            .preserve_images(false)
            .build();

        assert_eq!(config.min_score, 25.0);
        assert_eq!(config.char_threshold, 500);
        assert_eq!(config.nb_top_candidates, 10);
        assert_eq!(config.max_elems_to_parse, 1000);
        assert!(!config.remove_unlikely);
        assert!(config.keep_classes);
        assert!(!config.preserve_images);
    }

    #[test]
    fn test_config_default() {
        let config = ReadabilityConfig::default();
        assert_eq!(config.min_score, 10.0);
        assert_eq!(config.char_threshold, 140);
        assert_eq!(config.nb_top_candidates, 5);
        assert_eq!(config.max_elems_to_parse, 0);
        assert!(config.remove_unlikely);
        assert!(!config.keep_classes);
        assert!(config.preserve_images);
    }

    #[test]
    fn test_extracts_body_and_metadata() {
        let html = article_page(r#"<meta name="author" content="Lee Park">"#, "");
        let extraction = parse(&html).unwrap();

        assert_eq!(extraction.title.as_deref(), Some("Field Notes | Example"));
        assert_eq!(extraction.byline.as_deref(), Some("Lee Park"));
        assert!(extraction.text_content.contains("Rainfall is the subject"));
        assert!(extraction.excerpt.as_deref().is_some_and(|e| e.starts_with("Weather")));
        assert!(extraction.published.is_none());
        assert!(extraction.top_score >= 10.0);
    }

    #[test]
    fn test_omitted_paragraph_end_tags_keep_following_paragraphs() {
        let unclosed = |topic: &str| long_paragraph(topic).replace("</p>", "");
        let html = format!(
            "<html><body><article>{}{}<p class=\"newsletter\">Join our newsletter{}{}{}</article></body></html>",
            unclosed("Weather"),
            unclosed("Soil"),
            unclosed("Rainfall"),
            unclosed("Harvest"),
            unclosed("Frost")
        );
        let extraction = parse(&html).unwrap();

        for topic in ["Weather", "Soil", "Rainfall", "Harvest", "Frost"] {
            assert!(extraction.text_content.contains(&format!("{topic} is the subject")), "{topic} missing");
        }
        assert!(!extraction.text_content.contains("Join our newsletter"));
    }

    #[test]
    fn test_hidden_unclosed_paragraph_does_not_hide_article() {
        let unclosed = |topic: &str| long_paragraph(topic).replace("</p>", "");
        let html = format!(
            "<html><body><div class=\"entry-content\"><p hidden>Secret draft{}{}{}</div></body></html>",
            unclosed("Weather"),
            unclosed("Soil"),
            unclosed("Rainfall")
        );
        let extraction = parse(&html).unwrap();

        assert!(extraction.text_content.contains("Rainfall is the subject"));
        assert!(!extraction.text_content.contains("Secret draft"));
    }

    #[test]
    fn test_entity_obfuscated_script_link_removed() {
        let html = article_page("", "").replace(
            "Soil is the subject",
            r#"Soil, <a href="java&#x09;script:evil()">see notes</a>, is the subject"#,
        );
        let extraction = parse(&html).unwrap();

        assert!(extraction.text_content.contains("see notes"));
        assert!(!extraction.content_html.contains("script:"));
        assert!(!extraction.content_html.contains("<a "));
    }

    #[test]
    fn test_byline_from_leading_text() {
        let html = format!(
            "<html><body><div class=\"entry-content\"><p>By Ada Reyes</p>{}{}{}</div></body></html>",
            long_paragraph("Weather"),
            long_paragraph("Soil"),
            long_paragraph("Rainfall")
        );
        let extraction = parse(&html).unwrap();
        assert_eq!(extraction.byline.as_deref(), Some("Ada Reyes"));
    }

    #[test]
    fn test_retry_keeps_content_inside_unlikely_wrapper() {
        let html = format!(
            "<html><body><div class=\"sidebar-layout\"><div>{}{}{}</div></div></body></html>",
            long_paragraph("Weather"),
            long_paragraph("Soil"),
            long_paragraph("Rainfall")
        );

        let extraction = parse(&html).unwrap();
        assert!(extraction.text_content.contains("Soil is the subject"));
    }

    #[test]
    fn test_navigation_only_page_fails() {
        let html = r#"<html><head><title>Menu</title></head><body>
            <nav><a href="/a">Alpha</a><a href="/b">Beta</a></nav>
            <div class="footer">Copyright Example Corp, all rights reserved.</div>
        </body></html>"#;

        assert!(matches!(parse(html), Err(QuireError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_parse_with_url_resolves_links() {
        let html = article_page("", "").replace(
            "Soil is the subject",
            r#"<a href="/soil">Soil</a> is the subject"#,
        );
        let extraction = parse_with_url(&html, "https://example.com/notes/").unwrap();
        assert!(extraction.content_html.contains(r#"href="https://example.com/soil""#));
    }

    #[test]
    fn test_parse_with_url_invalid() {
        let result = parse_with_url("<p>x</p>", "not a url");
        assert!(matches!(result, Err(QuireError::InvalidUrl(_))));
    }

    #[test]
    fn test_is_probably_readable() {
        let paragraph = format!("<p>{}</p>", "Long form writing keeps going. ".repeat(15));
        let article = format!("<html><body>{}</body></html>", paragraph.repeat(2));
        assert!(is_probably_readable(&article));
        assert!(!is_probably_readable(&article_page("", "")));
        assert!(!is_probably_readable("<html><body><nav><a href=\"/\">Home</a></nav></body></html>"));
        assert!(!is_probably_readable(""));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let text = "é".repeat(400);
        let excerpt = excerpt_from_text(&text).unwrap();
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS + 3);
    }
}
