//! End-to-end cycle tests: mock sources → aggregator → JSON snapshot file.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

use tickerpulse::config::Retention;
use tickerpulse::engine::aggregator::CycleAggregator;
use tickerpulse::engine::scheduler::CycleScheduler;
use tickerpulse::engine::scraper::scrape_source;
use tickerpulse::storage::{self, JsonFileSink};
use tickerpulse::types::{SourceRef, Tally, TickerSymbol};

use crate::mock_fetcher::{MockFetcher, MockSessions};

const A: &str = "https://twitter.com/allstarcharts";
const B: &str = "https://twitter.com/Barchart";
const C: &str = "https://twitter.com/TriggerTrades";

fn refs(urls: &[&str]) -> Vec<SourceRef> {
    urls.iter().map(|u| SourceRef::new(*u)).collect()
}

fn temp_output() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("tickerpulse_it_{}", uuid::Uuid::new_v4()));
    p.push("scrape_results.json");
    p
}

fn fixture() -> MockFetcher {
    MockFetcher::new()
        .page(A, &["Watching $AAPL and $MSFT, also $AAPL again. Ignore $TOOLONGX."])
        .page(B, &["$TSLA gap fill", "$TSLA $AAPL $GME"])
        .page(C, &["$SPY 0DTE", "$GME squeeze?", "$TSLA"])
}

#[tokio::test]
async fn test_cycle_conserves_mentions() {
    let fetch = fixture();
    let sources = refs(&[A, B, C]);

    let mut expected = Tally::new();
    for source in &sources {
        expected.merge(&scrape_source(&fetch, source).await);
    }

    let snapshot = CycleAggregator::new(1, 10).run_cycle(&sources, &fetch).await;
    assert_eq!(snapshot.total_mentions(), expected.total());
    assert_eq!(snapshot.total_mentions(), 10);

    let ranked: Vec<(&str, u64)> = snapshot
        .entries()
        .iter()
        .map(|e| (e.symbol.as_str(), e.count))
        .collect();
    assert_eq!(
        ranked,
        vec![("$AAPL", 3), ("$TSLA", 3), ("$GME", 2), ("$MSFT", 1), ("$SPY", 1)]
    );
}

#[tokio::test]
async fn test_sequential_cycle_follows_list_order() {
    let fetch = fixture();
    CycleAggregator::new(1, 10)
        .run_cycle(&refs(&[C, A, B]), &fetch)
        .await;
    assert_eq!(fetch.calls(), vec![C, A, B]);
    assert_eq!(fetch.max_in_flight(), 1);
}

#[tokio::test]
async fn test_failing_source_does_not_disturb_others() {
    let healthy = fixture();
    let baseline = CycleAggregator::new(1, 10)
        .run_cycle(&refs(&[A, C]), &healthy)
        .await;

    let flaky = fixture();
    flaky.set_error(B);
    let snapshot = CycleAggregator::new(1, 10)
        .run_cycle(&refs(&[A, B, C]), &flaky)
        .await;

    assert_eq!(snapshot, baseline);
    let tsla = TickerSymbol::new("$TSLA").unwrap();
    assert_eq!(
        snapshot.entries().iter().find(|e| e.symbol == tsla).map(|e| e.count),
        Some(1)
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded_and_order_independent() {
    let sources = refs(&[A, B, C, "https://twitter.com/empty"]);

    let sequential = CycleAggregator::new(1, 10)
        .run_cycle(&sources, &fixture())
        .await;

    let fetch = MockFetcher::with_latency(Duration::from_millis(200))
        .page(A, &["Watching $AAPL and $MSFT, also $AAPL again. Ignore $TOOLONGX."])
        .page(B, &["$TSLA gap fill", "$TSLA $AAPL $GME"])
        .page(C, &["$SPY 0DTE", "$GME squeeze?", "$TSLA"]);
    let concurrent = CycleAggregator::new(2, 10).run_cycle(&sources, &fetch).await;

    assert_eq!(concurrent, sequential);
    assert_eq!(fetch.max_in_flight(), 2);
    assert_eq!(fetch.calls().len(), 4);
}

#[tokio::test]
async fn test_scheduler_writes_snapshot_file() {
    let path = temp_output();
    let fetch = fixture();
    fetch.set_error(C);

    let mut scheduler = CycleScheduler::new(
        CycleAggregator::new(1, 10),
        refs(&[A, B, C]),
        Box::new(MockSessions::new(fetch.clone())),
        Box::new(JsonFileSink::new(&path, Retention::Overwrite)),
        Duration::from_secs(600),
    );

    let report = scheduler.run_once().await.unwrap();
    assert_eq!(report.persisted_to, path);
    assert_eq!(report.mentions, 7);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "{\n  \"$AAPL\": 3,\n  \"$TSLA\": 2,\n  \"$GME\": 1,\n  \"$MSFT\": 1\n}"
    );

    // Second identical cycle: same file, same bytes.
    scheduler.run_once().await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    assert_eq!(fetch.sessions_opened(), 2);

    storage::delete_snapshot(&path).unwrap();
}

#[tokio::test]
async fn test_scheduler_timestamped_retention_keeps_each_cycle() {
    let path = temp_output();
    let mut scheduler = CycleScheduler::new(
        CycleAggregator::new(1, 10),
        refs(&[A]),
        Box::new(MockSessions::new(fixture())),
        Box::new(JsonFileSink::new(&path, Retention::Timestamped)),
        Duration::from_secs(600),
    );

    let first = scheduler.run_once().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = scheduler.run_once().await.unwrap();

    assert_ne!(first.persisted_to, second.persisted_to);
    assert!(!path.exists());
    for written in [&first.persisted_to, &second.persisted_to] {
        let loaded = storage::load_snapshot(written).unwrap().unwrap();
        assert_eq!(loaded.total_mentions(), 3);
        storage::delete_snapshot(written).unwrap();
    }
}

#[tokio::test]
async fn test_zero_sources_still_persists_empty_snapshot() {
    let path = temp_output();
    let fetch = MockFetcher::new();
    let mut scheduler = CycleScheduler::new(
        CycleAggregator::new(1, 10),
        Vec::new(),
        Box::new(MockSessions::new(fetch.clone())),
        Box::new(JsonFileSink::new(&path, Retention::Overwrite)),
        Duration::from_secs(600),
    );

    let report = scheduler.run_once().await.unwrap();
    assert_eq!(report.symbols, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    assert!(fetch.calls().is_empty());

    storage::delete_snapshot(&path).unwrap();
}

/// Three sources at 5 min each: every cycle takes 15 min.
fn slow_scheduler(path: &Path) -> (MockFetcher, CycleScheduler) {
    let fetch = MockFetcher::with_latency(Duration::from_secs(5 * 60))
        .page(A, &["$AAPL"])
        .page(B, &["$AAPL"])
        .page(C, &["$AAPL"]);

    let scheduler = CycleScheduler::new(
        CycleAggregator::new(1, 10),
        refs(&[A, B, C]),
        Box::new(MockSessions::new(fetch.clone())),
        Box::new(JsonFileSink::new(path, Retention::Overwrite)),
        Duration::from_secs(600),
    );
    (fetch, scheduler)
}

fn start_minutes(fetch: &MockFetcher, origin: Instant) -> Vec<u64> {
    fetch
        .session_starts()
        .iter()
        .map(|t| (*t - origin).as_secs() / 60)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_never_overlap() {
    let path = temp_output();
    let (fetch, scheduler) = slow_scheduler(&path);
    let origin = Instant::now();

    // 15 min cycles against a 10 min interval: the 10 and 30 minute slots
    // come due mid-cycle and are skipped. Shutdown at 50 lands mid-cycle.
    let cycles = scheduler
        .run(tokio::time::sleep(Duration::from_secs(50 * 60)))
        .await;

    assert_eq!(cycles, 3);
    assert_eq!(start_minutes(&fetch, origin), vec![0, 20, 40]);
    assert_eq!(fetch.max_in_flight(), 1);
    assert_eq!(fetch.sessions_opened(), 3);
    assert_eq!(fetch.calls().len(), 9);

    storage::delete_snapshot(&path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_first_cycle_runs_no_more() {
    let path = temp_output();
    let (fetch, scheduler) = slow_scheduler(&path);
    let origin = Instant::now();

    // Shutdown fires 5 min into the first 15 min cycle.
    let cycles = scheduler
        .run(tokio::time::sleep(Duration::from_secs(5 * 60)))
        .await;

    assert_eq!(cycles, 1);
    assert_eq!(fetch.sessions_opened(), 1);
    assert_eq!(fetch.calls().len(), 3);
    // The in-flight cycle still finished and persisted.
    let elapsed = Instant::now() - origin;
    assert!(elapsed >= Duration::from_secs(15 * 60));
    assert!(elapsed < Duration::from_secs(16 * 60));
    assert_eq!(storage::load_snapshot(&path).unwrap().unwrap().total_mentions(), 3);

    storage::delete_snapshot(&path).unwrap();
}
