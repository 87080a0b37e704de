//! Core engine — the extract → scrape → aggregate → persist cycle.

pub mod extractor;
pub mod scraper;
pub mod aggregator;
pub mod scheduler;
