//! Cycle scheduler — the periodic scrape→rank→persist loop.
//!
//! Runs one cycle immediately, then one per interval until shutdown.
//! Cycle starts sit on a fixed grid (`0, interval, 2 × interval, ..`).
//! Cycles run inline in the loop, so they never overlap: every slot that
//! passes while a cycle is still running is skipped, and the next cycle
//! waits for the first slot after it finishes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::engine::aggregator::CycleAggregator;
use crate::sources::{SessionProvider, SourceFetcher, UnavailableSession};
use crate::storage::SnapshotSink;
use crate::types::SourceRef;

/// Summary of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_number: u64,
    pub sources: usize,
    pub symbols: usize,
    pub mentions: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub persisted_to: PathBuf,
}

pub struct CycleScheduler {
    aggregator: CycleAggregator,
    sources: Vec<SourceRef>,
    sessions: Box<dyn SessionProvider>,
    sink: Box<dyn SnapshotSink>,
    interval: Duration,
    cycle_count: u64,
}

impl CycleScheduler {
    pub fn new(
        aggregator: CycleAggregator,
        sources: Vec<SourceRef>,
        sessions: Box<dyn SessionProvider>,
        sink: Box<dyn SnapshotSink>,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            sources,
            sessions,
            sink,
            interval,
            cycle_count: 0,
        }
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Run a single open-session→scrape→rank→persist cycle.
    ///
    /// Only a persist failure is returned as an error; the snapshot has
    /// already been computed and logged by then.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        self.cycle_count += 1;
        let cycle = self.cycle_count;
        let started_at = Utc::now();

        let snapshot = {
            let session: Box<dyn SourceFetcher> = match self.sessions.open_session() {
                Ok(session) => session,
                Err(e) => {
                    warn!(cycle, error = %e, "Could not open fetch session, all sources will be skipped");
                    Box::new(UnavailableSession::new(&e))
                }
            };
            self.aggregator.run_cycle(&self.sources, session.as_ref()).await
        };

        let persisted_to = self.sink.save(&snapshot).with_context(|| {
            format!(
                "Cycle {cycle}: snapshot with {} symbols was not persisted",
                snapshot.len()
            )
        })?;

        Ok(CycleReport {
            cycle_number: cycle,
            sources: self.sources.len(),
            symbols: snapshot.len(),
            mentions: snapshot.total_mentions(),
            started_at,
            finished_at: Utc::now(),
            persisted_to,
        })
    }

    /// Run cycles until `shutdown` resolves. Returns the number of cycles run.
    ///
    /// A failed cycle is logged and the loop carries on with the next slot.
    pub async fn run<F: Future<Output = ()>>(mut self, shutdown: F) -> u64 {
        let mut next = Instant::now();
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.interval.as_secs(),
            sources = self.sources.len(),
            "Entering scan loop. Press Ctrl+C to stop."
        );

        loop {
            // Shutdown is polled first so a signal that arrived during a
            // cycle stops the loop before another slot can fire.
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    break;
                }
                _ = tokio::time::sleep_until(next) => {
                    if self.cycle_count == 0 {
                        info!("Starting initial scrape...");
                    } else {
                        info!("Running scheduled scraper...");
                    }

                    match self.run_once().await {
                        Ok(report) => log_cycle_report(&report),
                        Err(e) => error!(error = format!("{e:#}"), "Cycle failed, continuing to next"),
                    }

                    let now = Instant::now();
                    let following = next_slot(next, self.interval, now);
                    let skipped = slots_between(next, following, self.interval);
                    if skipped > 0 {
                        warn!(
                            skipped,
                            "Cycle outran the interval, skipping slots that came due while it ran"
                        );
                    }
                    next = following;
                }
            }
        }

        self.cycle_count
    }
}

/// First slot on the grid `slot + k × period` (k ≥ 1) that is not before `now`.
fn next_slot(slot: Instant, period: Duration, now: Instant) -> Instant {
    if period.is_zero() {
        return now;
    }
    let mut next = slot + period;
    while next < now {
        next += period;
    }
    next
}

/// Slots strictly between `slot` and `next`, i.e. the ones that were skipped.
fn slots_between(slot: Instant, next: Instant, period: Duration) -> u64 {
    if period.is_zero() {
        return 0;
    }
    let spanned = (next - slot).as_nanos() / period.as_nanos();
    u64::try_from(spanned).unwrap_or(u64::MAX).saturating_sub(1)
}

/// Log a human-readable cycle summary.
pub fn log_cycle_report(report: &CycleReport) {
    let elapsed = report.finished_at - report.started_at;
    info!(
        cycle = report.cycle_number,
        sources = report.sources,
        symbols = report.symbols,
        mentions = report.mentions,
        elapsed_ms = elapsed.num_milliseconds(),
        path = %report.persisted_to.display(),
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
