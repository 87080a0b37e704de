//! Account scraper — one source, end to end.
//!
//! Fetches a profile's post text, extracts cashtags from every fragment
//! and counts them. A failed fetch is logged and yields an empty tally;
//! it never propagates to the rest of the cycle.

use tracing::{debug, warn};

use crate::engine::extractor::extract_symbols;
use crate::sources::SourceFetcher;
use crate::types::{PerSourceTally, SourceRef};

/// Scrape `source` once. Never fails; no retry within a cycle.
pub async fn scrape_source(fetch: &dyn SourceFetcher, source: &SourceRef) -> PerSourceTally {
    let fragments = match fetch.fetch_text(source).await {
        Ok(fragments) => fragments,
        Err(e) => {
            warn!(
                source = source.handle(),
                url = %source,
                fetcher = fetch.name(),
                error = %e,
                "Error scraping source, contributing nothing this cycle"
            );
            return PerSourceTally::new();
        }
    };

    let tally = count_mentions(&fragments);

    debug!(
        source = source.handle(),
        fragments = fragments.len(),
        symbols = tally.len(),
        mentions = tally.total(),
        "Source scraped"
    );
    tally
}

/// Count every cashtag occurrence across `fragments`.
pub fn count_mentions(fragments: &[String]) -> PerSourceTally {
    fragments
        .iter()
        .flat_map(|text| extract_symbols(text))
        .collect()
}
