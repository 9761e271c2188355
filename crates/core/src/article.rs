//! The persisted article record and its derivation from an extraction.
//!
//! [`materialize`] is the pure step of the pipeline: it turns a canonical URL
//! and an [`Extraction`] into a [`NewArticle`] with every derived field
//! filled in. Stores assign the id and creation time when they insert it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::Result;
use crate::normalize::domain_of;
use crate::readability::Extraction;
use crate::text::count_words;

/// Title used when neither the extractor nor the raw document has one.
pub const UNTITLED: &str = "Untitled";

/// Reading speed behind [`Article::reading_time_minutes`].
const WORDS_PER_MINUTE: f64 = 200.0;

/// A saved article.
///
/// Serialized in camelCase, which is the shape the reader UI consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,

    /// Canonical URL; unique across all articles.
    pub url: String,

    /// Never empty.
    pub title: String,

    pub author: Option<String>,

    /// Host of `url`, without port.
    pub domain: String,

    /// The HTML as fetched.
    pub content_raw: String,

    /// Extracted article HTML fragment.
    pub content_clean: String,

    /// Plain-text rendering of `content_clean`.
    pub text_content: String,

    /// Whitespace-delimited tokens in `text_content`.
    pub word_count: i32,

    /// Publish date from the page, or the ingestion time.
    #[serde(with = "time::serde::rfc3339")]
    pub published_date: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Article {
    /// Estimated reading time at 200 words per minute.
    pub fn reading_time_minutes(&self) -> f64 {
        reading_time_minutes(self.word_count)
    }
}

fn reading_time_minutes(word_count: i32) -> f64 {
    f64::from(word_count) / WORDS_PER_MINUTE
}

/// Fields of an article that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub domain: String,
    pub content_raw: String,
    pub content_clean: String,
    pub text_content: String,
    pub word_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub published_date: OffsetDateTime,
}

impl NewArticle {
    pub fn reading_time_minutes(&self) -> f64 {
        reading_time_minutes(self.word_count)
    }

    /// Completes the record with the identity a store assigned to it.
    pub fn into_article(self, id: i64, created_at: OffsetDateTime) -> Article {
        Article {
            id,
            url: self.url,
            title: self.title,
            author: self.author,
            domain: self.domain,
            content_raw: self.content_raw,
            content_clean: self.content_clean,
            text_content: self.text_content,
            word_count: self.word_count,
            published_date: self.published_date,
            created_at,
        }
    }
}

/// Derives the record to persist for a freshly extracted page.
///
/// The title falls back from the extractor's title to the raw `<title>` text
/// and finally to [`UNTITLED`]; the publish date falls back to `now`.
///
/// # Errors
///
/// Returns [`crate::QuireError::InvalidUrl`] if `url` has no host.
///
/// # Example
///
/// ```rust
/// use quire_core::article::materialize;
/// use quire_core::readability::Extraction;
/// use time::OffsetDateTime;
/// use url::Url;
///
/// let url = Url::parse("https://news.example.com:8443/story").unwrap();
/// let extraction = Extraction {
///     title: None,
///     byline: None,
///     content_html: "<div><p>Three short words</p></div>".into(),
///     text_content: "Three short words".into(),
///     excerpt: None,
///     site_name: None,
///     published: None,
///     top_score: 12.0,
/// };
///
/// let now = OffsetDateTime::now_utc();
/// let article = materialize(&url, "<html></html>", None, extraction, now).unwrap();
/// assert_eq!(article.title, "Untitled");
/// assert_eq!(article.domain, "news.example.com");
/// assert_eq!(article.word_count, 3);
/// assert_eq!(article.published_date, now);
/// ```
pub fn materialize(
    url: &Url, raw_html: &str, raw_title: Option<&str>, extraction: Extraction, now: OffsetDateTime,
) -> Result<NewArticle> {
    let domain = domain_of(url)?;

    let title = extraction
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| raw_title.map(str::trim).filter(|t| !t.is_empty()).map(String::from))
        .unwrap_or_else(|| UNTITLED.to_string());

    let word_count = i32::try_from(count_words(&extraction.text_content)).unwrap_or(i32::MAX);

    Ok(NewArticle {
        url: url.as_str().to_string(),
        title,
        author: extraction.byline,
        domain,
        content_raw: raw_html.to_string(),
        content_clean: extraction.content_html,
        text_content: extraction.text_content,
        word_count,
        published_date: extraction.published.unwrap_or(now),
    })
}
