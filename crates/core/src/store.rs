//! Persistence contract for articles.
//!
//! The ingestion pipeline touches storage twice: a lookup by canonical URL
//! before fetching and an insert after extraction. Implementations must make
//! `insert` atomic with a uniqueness constraint on the URL and report a
//! violation as [`StoreError::Duplicate`].

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::StoreError;
use crate::article::{Article, NewArticle};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Looks up the article saved under a canonical URL.
    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Article>>;

    /// Inserts a new article, failing with [`StoreError::Duplicate`] if the
    /// URL is already taken.
    async fn insert(&self, article: NewArticle) -> StoreResult<Article>;

    async fn get(&self, id: i64) -> StoreResult<Option<Article>>;

    /// Newest articles first, by publish date.
    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<Article>>;
}

#[derive(Debug, Default)]
struct Rows {
    articles: Vec<Article>,
    by_url: HashMap<String, usize>,
}

/// In-process store, for tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Rows>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored articles.
    pub async fn len(&self) -> usize {
        self.rows.read().await.articles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        let rows = self.rows.read().await;
        Ok(rows.by_url.get(url).map(|index| rows.articles[*index].clone()))
    }

    async fn insert(&self, article: NewArticle) -> StoreResult<Article> {
        let mut rows = self.rows.write().await;
        if rows.by_url.contains_key(&article.url) {
            return Err(StoreError::Duplicate { url: article.url });
        }

        let index = rows.articles.len();
        let id = i64::try_from(index + 1).map_err(|e| StoreError::Backend(e.to_string()))?;
        let stored = article.into_article(id, OffsetDateTime::now_utc());

        rows.by_url.insert(stored.url.clone(), index);
        rows.articles.push(stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Article>> {
        let rows = self.rows.read().await;
        Ok(rows.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<Article>> {
        let rows = self.rows.read().await;
        let mut articles = rows.articles.clone();
        articles.sort_by(|a, b| b.published_date.cmp(&a.published_date).then(b.id.cmp(&a.id)));
        articles.truncate(limit);
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn new_article(url: &str, published: OffsetDateTime) -> NewArticle {
        NewArticle {
            url: url.to_string(),
            title: "Title".into(),
            author: None,
            domain: "example.com".into(),
            content_raw: String::new(),
            content_clean: "<div><p>Body</p></div>".into(),
            text_content: "Body".into(),
            word_count: 1,
            published_date: published,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        let inserted = store.insert(new_article("https://example.com/a", datetime!(2024-01-01 0:00 UTC))).await.unwrap();

        assert_eq!(inserted.id, 1);
        let found = store.find_by_url("https://example.com/a").await.unwrap().unwrap();
        assert_eq!(found, inserted);
        assert_eq!(store.get(1).await.unwrap(), Some(inserted));
        assert!(store.find_by_url("https://example.com/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let store = MemoryStore::new();
        let published = datetime!(2024-01-01 0:00 UTC);
        store.insert(new_article("https://example.com/a", published)).await.unwrap();

        let err = store.insert(new_article("https://example.com/a", published)).await.unwrap_err();
        assert_eq!(err, StoreError::Duplicate { url: "https://example.com/a".into() });
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let store = MemoryStore::new();
        store.insert(new_article("https://example.com/old", datetime!(2020-01-01 0:00 UTC))).await.unwrap();
        store.insert(new_article("https://example.com/new", datetime!(2024-01-01 0:00 UTC))).await.unwrap();
        store.insert(new_article("https://example.com/mid", datetime!(2022-01-01 0:00 UTC))).await.unwrap();

        let recent = store.list_recent(2).await.unwrap();
        let urls: Vec<&str> = recent.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, ["https://example.com/new", "https://example.com/mid"]);
    }
}
