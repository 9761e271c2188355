//! HTTP surface over the ingestion pipeline.
//!
//! Routes:
//! - `POST /api/articles` ingests `{ "url": ... }` (JSON or form-encoded)
//! - `GET /api/articles` lists the newest articles
//! - `GET /api/articles/{id}` returns one article
//!
//! Articles are shared across users; every response wraps them in the
//! default library fields the reader UI expects.

pub mod config;
pub mod pg;

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use quire_core::{Article, ArticleStore, FetchFailure, Ingestor, QuireError, StoreError};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Newest articles returned by the list route.
const LIST_LIMIT: usize = 50;

/// Shared handler state.
pub struct AppState<S> {
    ingestor: Ingestor<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self { ingestor: self.ingestor.clone() }
    }
}

impl<S: ArticleStore> AppState<S> {
    pub fn new(ingestor: Ingestor<S>) -> Self {
        Self { ingestor }
    }
}

/// Builds the application router.
pub fn router<S: ArticleStore + 'static>(state: AppState<S>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/articles", post(create_article::<S>).get(list_articles::<S>))
        .route("/api/articles/{id}", get(get_article::<S>))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
}

/// An article as it appears in a reader's library.
///
/// Library membership lives outside this service, so the library fields are
/// always the defaults for a freshly saved article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    #[serde(flatten)]
    pub article: Article,
    pub library_id: Option<i64>,
    pub status: String,
    pub is_favorite: bool,
    pub read_progress: f32,
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
}

impl LibraryEntry {
    pub fn inbox(article: Article, saved_at: OffsetDateTime) -> Self {
        Self { article, library_id: None, status: "inbox".to_string(), is_favorite: false, read_progress: 0.0, saved_at }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SubmitUrl {
    url: Option<String>,
}

/// Error response with a `{ "message": ... }` body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Ingest(QuireError),
}

impl From<QuireError> for ApiError {
    fn from(err: QuireError) -> Self {
        ApiError::Ingest(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Ingest(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Ingest(err) => match err {
                QuireError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                QuireError::FetchFailed(FetchFailure::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
                QuireError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
                QuireError::ParseFailed(_) | QuireError::ExtractionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                QuireError::Storage(_) | QuireError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::NotFound => "Article not found".to_string(),
            ApiError::Ingest(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

/// Reads `url` from a JSON or form-encoded body; other bodies carry none.
fn submitted_url(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();

    let submitted = if content_type.contains("application/json") {
        serde_json::from_slice::<SubmitUrl>(body).unwrap_or_default()
    } else if content_type.contains("application/x-www-form-urlencoded") {
        SubmitUrl {
            url: url::form_urlencoded::parse(body).find(|(key, _)| key == "url").map(|(_, value)| value.into_owned()),
        }
    } else {
        SubmitUrl::default()
    };

    submitted.url.filter(|url| !url.trim().is_empty())
}

async fn create_article<S: ArticleStore + 'static>(
    State(state): State<AppState<S>>, headers: HeaderMap, body: Bytes,
) -> Result<Json<LibraryEntry>, ApiError> {
    let url = submitted_url(&headers, &body).ok_or_else(|| ApiError::BadRequest("URL is required".to_string()))?;
    let article = state.ingestor.ingest(&url).await?;
    Ok(Json(LibraryEntry::inbox(article, OffsetDateTime::now_utc())))
}

async fn list_articles<S: ArticleStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<LibraryEntry>>, ApiError> {
    let articles = state.ingestor.store().list_recent(LIST_LIMIT).await?;
    let entries = articles
        .into_iter()
        .map(|article| {
            let saved_at = article.created_at;
            LibraryEntry::inbox(article, saved_at)
        })
        .collect();
    Ok(Json(entries))
}

async fn get_article<S: ArticleStore + 'static>(
    State(state): State<AppState<S>>, Path(id): Path<i64>,
) -> Result<Json<LibraryEntry>, ApiError> {
    let article = state.ingestor.store().get(id).await?.ok_or(ApiError::NotFound)?;
    let saved_at = article.created_at;
    Ok(Json(LibraryEntry::inbox(article, saved_at)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_submitted_url_json() {
        let body = Bytes::from_static(br#"{"url":"example.com/a"}"#);
        assert_eq!(submitted_url(&headers("application/json"), &body).as_deref(), Some("example.com/a"));
    }

    #[test]
    fn test_submitted_url_form() {
        let body = Bytes::from_static(b"url=https%3A%2F%2Fexample.com%2Fa&x=1");
        assert_eq!(
            submitted_url(&headers("application/x-www-form-urlencoded"), &body).as_deref(),
            Some("https://example.com/a")
        );
    }

    #[test]
    fn test_submitted_url_missing() {
        assert!(submitted_url(&headers("application/json"), &Bytes::from_static(b"{}")).is_none());
        assert!(submitted_url(&headers("application/json"), &Bytes::from_static(br#"{"url":"  "}"#)).is_none());
        assert!(submitted_url(&headers("text/plain"), &Bytes::from_static(b"url=x")).is_none());
        assert!(submitted_url(&HeaderMap::new(), &Bytes::new()).is_none());
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |err: QuireError| ApiError::from(err).status();

        assert_eq!(status(QuireError::InvalidUrl("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(QuireError::FetchFailed(FetchFailure::Status { status: 404 })), StatusCode::BAD_GATEWAY);
        assert_eq!(status(QuireError::FetchFailed(FetchFailure::Timeout { timeout: 20 })), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status(QuireError::ParseFailed("binary".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(QuireError::ExtractionFailed { reason: "empty".into() }), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status(QuireError::Storage(StoreError::Backend("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }
}
