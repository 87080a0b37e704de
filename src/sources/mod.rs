//! Source fetching.
//!
//! Defines the `SourceFetcher` trait, the per-cycle `SessionProvider`, and
//! the HTTP implementation used by the binary:
//! - `http` — reqwest-backed fetcher, optionally routed through a rendering
//!   endpoint that waits for the page to settle
//! - `html` — post-body text extraction from profile page markup

pub mod html;
pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::SourceRef;

/// Why a single source could not be fetched.
///
/// Always recovered per source: the source contributes an empty tally.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("navigation failed: HTTP {status}")]
    Navigation { status: u16 },
    #[error("session unavailable: {0}")]
    Session(String),
}

/// Abstraction over whatever loads a profile and returns its visible text.
///
/// Implementors own any "load more" interaction (scrolling, waiting for
/// content to settle) and return the final text fragments.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the text fragments (one per post) currently shown by `source`.
    async fn fetch_text(&self, source: &SourceRef) -> Result<Vec<String>, FetchError>;

    /// Fetcher name for logging.
    fn name(&self) -> &str;
}

/// Opens a fetch session for one cycle.
///
/// The session is dropped when the cycle ends, whatever happened to the
/// individual sources, which releases its connections. A session returned
/// here must be safe to share between concurrent scrapes.
pub trait SessionProvider: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn SourceFetcher>, FetchError>;
}

/// Stand-in session used when a real one cannot be opened: every fetch
/// fails with the original error, so the cycle still completes.
pub(crate) struct UnavailableSession {
    reason: String,
}

impl UnavailableSession {
    pub(crate) fn new(err: &FetchError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl SourceFetcher for UnavailableSession {
    async fn fetch_text(&self, _source: &SourceRef) -> Result<Vec<String>, FetchError> {
        Err(FetchError::Session(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
