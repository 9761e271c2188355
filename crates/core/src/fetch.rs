//! Content fetching from URLs, files, and stdin.
//!
//! [`Fetcher`] retrieves the raw HTML of an article page. It issues exactly one
//! GET per call; retrying is left to whoever resubmits the ingestion, which is
//! safe because ingestion is idempotent per URL.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, redirect};
use tracing::debug;
use url::Url;

use crate::{FetchFailure, QuireError, Result};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds, covering connect, headers and body.
    pub timeout: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Redirect hops followed before giving up.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 20,
            user_agent: format!(
                "Mozilla/5.0 (compatible; Quire/{}; article reader)",
                env!("CARGO_PKG_VERSION")
            ),
            max_redirects: 10,
        }
    }
}

/// Shared HTTP fetcher.
///
/// Holds one connection-pooling client, so a single instance should be
/// reused for every ingestion.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Builds the underlying client from `config`.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| QuireError::Internal(format!("could not build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches the body of `url` as text.
    ///
    /// The body is decoded with the charset the server declares, falling back
    /// to UTF-8.
    ///
    /// # Errors
    ///
    /// [`QuireError::FetchFailed`] with the status for non-2xx responses, or
    /// with the transport cause for timeouts, redirect loops and network errors.
    pub async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, ACCEPT_HTML)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "page returned non-success status");
            return Err(QuireError::FetchFailed(FetchFailure::Status { status: status.as_u16() }));
        }

        let content = response.text().await.map_err(|e| self.transport_failure(e))?;
        debug!(%url, bytes = content.len(), "page fetched");

        Ok(content)
    }

    fn transport_failure(&self, err: reqwest::Error) -> QuireError {
        let failure = if err.is_timeout() {
            FetchFailure::Timeout { timeout: self.config.timeout }
        } else if err.is_redirect() {
            FetchFailure::TooManyRedirects
        } else {
            FetchFailure::Transport(error_chain(&err))
        };
        QuireError::FetchFailed(failure)
    }
}

/// Fetches HTML from a URL string with a one-off client.
///
/// The string must already carry a scheme; run user input through
/// [`normalize_url`](crate::normalize_url) first.
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| QuireError::InvalidUrl(e.to_string()))?;
    Fetcher::new(config.clone())?.fetch(&parsed_url).await
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    fs::read_to_string(&path_buf).map_err(|e| {
        QuireError::FetchFailed(FetchFailure::Transport(format!("{}: {e}", path_buf.display())))
    })
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| QuireError::FetchFailed(FetchFailure::Transport(format!("stdin: {e}"))))?;

    Ok(buffer)
}

/// reqwest's top-level message hides the cause ("error sending request"),
/// so walk the source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
