//! The ingestion pipeline end to end.
//!
//! [`Ingestor::ingest`] runs normalize → lookup → fetch → parse → extract →
//! materialize → insert. The store is consulted only before the fetch and
//! after extraction; parsing and extraction run on the blocking pool so
//! concurrent ingestions of different URLs do not stall each other.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};
use url::Url;

use crate::article::{Article, NewArticle, materialize};
use crate::fetch::{FetchConfig, Fetcher};
use crate::normalize::normalize_url;
use crate::readability::{Readability, ReadabilityConfig};
use crate::store::ArticleStore;
use crate::{QuireError, Result, StoreError};

/// Settings for every stage of ingestion.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub fetch: FetchConfig,
    pub readability: ReadabilityConfig,
}

/// Turns user-supplied URLs into stored articles.
///
/// Cheap to clone; clones share the HTTP client and the store.
pub struct Ingestor<S> {
    fetcher: Fetcher,
    readability: Readability,
    store: Arc<S>,
}

impl<S> Clone for Ingestor<S> {
    fn clone(&self) -> Self {
        Self { fetcher: self.fetcher.clone(), readability: self.readability.clone(), store: Arc::clone(&self.store) }
    }
}

impl<S: ArticleStore> Ingestor<S> {
    pub fn new(store: Arc<S>, config: IngestConfig) -> Result<Self> {
        Ok(Self { fetcher: Fetcher::new(config.fetch)?, readability: Readability::with_config(config.readability), store })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Ingests `input`, returning the stored article for its canonical URL.
    ///
    /// A URL that was ingested before is returned as stored, without fetching.
    /// When a concurrent ingestion of the same URL wins the insert, its row is
    /// returned instead of an error.
    ///
    /// # Errors
    ///
    /// [`QuireError::InvalidUrl`], [`QuireError::FetchFailed`],
    /// [`QuireError::ParseFailed`] and [`QuireError::ExtractionFailed`] from
    /// the matching stage; [`QuireError::Storage`] for store failures. Nothing
    /// is persisted on error.
    pub async fn ingest(&self, input: &str) -> Result<Article> {
        let url = normalize_url(input)?;

        if let Some(existing) = self.store.find_by_url(url.as_str()).await? {
            debug!(url = %url, id = existing.id, "article already ingested");
            return Ok(existing);
        }

        let raw_html = self.fetcher.fetch(&url).await?;
        debug!(url = %url, bytes = raw_html.len(), "fetched page");

        let readability = self.readability.clone();
        let page_url = url.clone();
        let new_article = tokio::task::spawn_blocking(move || prepare(&readability, &page_url, raw_html))
            .await
            .map_err(|e| QuireError::Internal(format!("extraction task failed: {e}")))??;

        match self.store.insert(new_article).await {
            Ok(article) => {
                info!(id = article.id, url = %article.url, words = article.word_count, "saved new article");
                Ok(article)
            }
            Err(StoreError::Duplicate { url }) => {
                warn!(url = %url, "article inserted concurrently, returning the stored row");
                self.store.find_by_url(&url).await?.ok_or_else(|| {
                    QuireError::Storage(StoreError::Backend(format!("article for {url} missing after duplicate insert")))
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// The CPU-bound middle of the pipeline: parse, extract and materialize.
pub fn prepare(readability: &Readability, url: &Url, raw_html: String) -> Result<NewArticle> {
    let doc = readability.parse_document(&raw_html, Some(url))?;
    let extraction = readability.extract(&doc)?;
    debug!(url = %url, score = extraction.top_score, "extracted article content");

    materialize(url, &raw_html, doc.title().as_deref(), extraction, OffsetDateTime::now_utc())
}
