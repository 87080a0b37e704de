//! HTTP profile fetcher.
//!
//! Loads a profile page with reqwest and returns the text of its posts.
//! Profile pages that only render client-side can be routed through a
//! rendering endpoint, which loads the page in a headless browser, waits
//! `settle_ms` for more posts to appear, and returns the final markup:
//!
//! `GET {render_endpoint}?url={urlencoded source}&wait={settle_ms}`

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{html, FetchError, SessionProvider, SourceFetcher};
use crate::config::FetcherConfig;
use crate::types::SourceRef;

const FETCHER_NAME: &str = "http";

/// One fetch session: a reqwest client and its connection pool.
///
/// `Client` is internally reference-counted and safe to use from
/// concurrent tasks.
pub struct HttpFetcher {
    http: Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Session(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// URL actually requested for `source`.
    fn request_url(&self, source: &SourceRef) -> String {
        match &self.config.render_endpoint {
            Some(endpoint) => format!(
                "{}?url={}&wait={}",
                endpoint.trim_end_matches('/'),
                urlencoding::encode(source.url()),
                self.config.settle_ms,
            ),
            None => source.url().to_string(),
        }
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                secs: self.config.timeout_secs,
            }
        } else if let Some(status) = err.status() {
            FetchError::Navigation {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }

    fn fragments(&self, body: &str) -> Vec<String> {
        let fragments = html::post_fragments(body);
        if fragments.is_empty() && self.config.full_text_fallback {
            let text = html::document_text(body);
            return if text.is_empty() { Vec::new() } else { vec![text] };
        }
        fragments
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch_text(&self, source: &SourceRef) -> Result<Vec<String>, FetchError> {
        let url = self.request_url(source);
        debug!(source = %source, url = %url, "Fetching profile");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Navigation {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let fragments = self.fragments(&body);

        debug!(
            source = %source,
            bytes = body.len(),
            fragments = fragments.len(),
            "Profile fetched"
        );
        Ok(fragments)
    }

    fn name(&self) -> &str {
        FETCHER_NAME
    }
}

/// Opens a fresh [`HttpFetcher`] for every cycle.
pub struct HttpSessions {
    config: FetcherConfig,
}

impl HttpSessions {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }
}

impl SessionProvider for HttpSessions {
    fn open_session(&self) -> Result<Box<dyn SourceFetcher>, FetchError> {
        Ok(Box::new(HttpFetcher::new(self.config.clone())?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
