//! Cycle aggregator.
//!
//! Scrapes every configured source, sums the per-source tallies into one
//! global tally and ranks it. The global tally is built fresh for each
//! call and dropped once the snapshot is produced.
//!
//! Sources are scraped through a bounded stream: with a concurrency of 1
//! they run one at a time in list order, sharing the session; above that
//! up to `concurrency` scrapes are in flight. Each scrape returns its own
//! partial tally, merged at the join point, so the result is independent
//! of completion order.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::info;

use crate::config::ScannerConfig;
use crate::engine::scraper::scrape_source;
use crate::sources::SourceFetcher;
use crate::types::{GlobalTally, RankedSnapshot, SourceRef};

pub struct CycleAggregator {
    concurrency: usize,
    interval_minutes: u64,
}

impl CycleAggregator {
    /// `interval_minutes` only feeds the mention log lines.
    pub fn new(concurrency: usize, interval_minutes: u64) -> Self {
        Self {
            concurrency: concurrency.max(1),
            interval_minutes,
        }
    }

    pub fn from_config(cfg: &ScannerConfig) -> Self {
        Self::new(cfg.concurrency, cfg.interval_minutes)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run one cycle over `sources`. Always completes; sources that fail
    /// contribute nothing, and zero sources give an empty snapshot.
    pub async fn run_cycle(&self, sources: &[SourceRef], fetch: &dyn SourceFetcher) -> RankedSnapshot {
        info!(
            started_at = %Utc::now().to_rfc3339(),
            sources = sources.len(),
            concurrency = self.concurrency,
            "Starting scrape"
        );

        let global = self.tally_sources(sources, fetch).await;
        let snapshot = RankedSnapshot::from_tally(&global);

        self.report(&snapshot);
        info!(
            finished_at = %Utc::now().to_rfc3339(),
            symbols = snapshot.len(),
            mentions = snapshot.total_mentions(),
            "Scrape completed"
        );

        snapshot
    }

    async fn tally_sources(&self, sources: &[SourceRef], fetch: &dyn SourceFetcher) -> GlobalTally {
        stream::iter(sources)
            .map(|source| scrape_source(fetch, source))
            .buffer_unordered(self.concurrency)
            .fold(GlobalTally::new(), |mut global, partial| async move {
                global.merge(&partial);
                global
            })
            .await
    }

    fn report(&self, snapshot: &RankedSnapshot) {
        for entry in snapshot.entries() {
            info!(
                "{} was mentioned {} times in the last {} minutes.",
                entry.symbol, entry.count, self.interval_minutes
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
