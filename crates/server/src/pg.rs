//! Postgres-backed article store.
//!
//! The `articles` table carries a unique constraint on `url`; a violation is
//! reported as [`StoreError::Duplicate`] so the ingestor can recover from a
//! lost insert race.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use quire_core::{Article, ArticleStore, NewArticle, StoreError, StoreResult};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id BIGSERIAL PRIMARY KEY,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    author TEXT,
    domain TEXT NOT NULL,
    content_raw TEXT NOT NULL,
    content_clean TEXT NOT NULL,
    text_content TEXT NOT NULL,
    word_count INTEGER NOT NULL,
    published_date TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS articles_published_date_idx ON articles (published_date DESC);
"#;

const COLUMNS: &str = "id, url, title, author, domain, content_raw, content_clean, text_content, word_count, \
                       published_date, created_at";

/// Article store over a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Opens a pool against `database_url` and creates the schema if needed.
    pub async fn connect(database_url: &str, pool_size: usize) -> anyhow::Result<Self> {
        let pg_config: tokio_postgres::Config = database_url.parse()?;
        let manager =
            Manager::from_config(pg_config, NoTls, ManagerConfig { recycling_method: RecyclingMethod::Fast });
        let pool = Pool::builder(manager).max_size(pool_size).build()?;

        let store = Self { pool };
        store.migrate().await?;
        info!(pool_size, "connected to postgres");
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        let client = self.client().await?;
        client.batch_execute(SCHEMA).await.map_err(backend)
    }

    async fn client(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(backend)
    }
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn from_row(row: &Row) -> StoreResult<Article> {
    Ok(Article {
        id: row.try_get("id").map_err(backend)?,
        url: row.try_get("url").map_err(backend)?,
        title: row.try_get("title").map_err(backend)?,
        author: row.try_get("author").map_err(backend)?,
        domain: row.try_get("domain").map_err(backend)?,
        content_raw: row.try_get("content_raw").map_err(backend)?,
        content_clean: row.try_get("content_clean").map_err(backend)?,
        text_content: row.try_get("text_content").map_err(backend)?,
        word_count: row.try_get("word_count").map_err(backend)?,
        published_date: row.try_get("published_date").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
    })
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        let client = self.client().await?;
        let query = format!("SELECT {COLUMNS} FROM articles WHERE url = $1");
        let row = client.query_opt(&query, &[&url]).await.map_err(backend)?;
        row.as_ref().map(from_row).transpose()
    }

    async fn insert(&self, article: NewArticle) -> StoreResult<Article> {
        let client = self.client().await?;
        let query = format!(
            "INSERT INTO articles (url, title, author, domain, content_raw, content_clean, text_content, word_count, \
             published_date) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {COLUMNS}"
        );

        let result = client
            .query_one(
                &query,
                &[
                    &article.url,
                    &article.title,
                    &article.author,
                    &article.domain,
                    &article.content_raw,
                    &article.content_clean,
                    &article.text_content,
                    &article.word_count,
                    &article.published_date,
                ],
            )
            .await;

        match result {
            Ok(row) => from_row(&row),
            Err(err) if err.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Err(StoreError::Duplicate { url: article.url })
            }
            Err(err) => Err(backend(err)),
        }
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Article>> {
        let client = self.client().await?;
        let query = format!("SELECT {COLUMNS} FROM articles WHERE id = $1");
        let row = client.query_opt(&query, &[&id]).await.map_err(backend)?;
        row.as_ref().map(from_row).transpose()
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<Article>> {
        let client = self.client().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let query = format!("SELECT {COLUMNS} FROM articles ORDER BY published_date DESC, id DESC LIMIT $1");
        let rows = client.query(&query, &[&limit]).await.map_err(backend)?;
        rows.iter().map(from_row).collect()
    }
}
