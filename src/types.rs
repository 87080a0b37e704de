//! Shared types for TickerPulse.
//!
//! These types form the data model used across all modules: ticker
//! symbols, monitored sources, mention tallies and the ranked snapshot
//! produced at the end of every cycle.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Ticker symbol
// ---------------------------------------------------------------------------

/// Sigil that prefixes every cashtag.
pub const SIGIL: char = '$';

/// Maximum number of letters in a ticker.
pub const MAX_TICKER_LEN: usize = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol must start with '$': '{value}'")]
    MissingSigil { value: String },
    #[error("symbol has no letters after the sigil")]
    Empty,
    #[error("symbol length {len} exceeds max {max}")]
    TooLong { len: usize, max: usize },
    #[error("symbol contains non-uppercase character '{ch}'")]
    InvalidChar { ch: char },
}

/// A cashtag such as `$AAPL`, stored in canonical form (sigil included).
///
/// Ordering is lexical on the canonical text, which is also the tie-break
/// used when ranking equal counts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Validate and wrap a canonical cashtag (`$` + 1-5 uppercase ASCII letters).
    pub fn new(value: impl Into<String>) -> Result<Self, SymbolError> {
        let value = value.into();
        let letters = value
            .strip_prefix(SIGIL)
            .ok_or_else(|| SymbolError::MissingSigil { value: value.clone() })?;

        if letters.is_empty() {
            return Err(SymbolError::Empty);
        }
        if letters.len() > MAX_TICKER_LEN {
            return Err(SymbolError::TooLong {
                len: letters.len(),
                max: MAX_TICKER_LEN,
            });
        }
        if let Some(ch) = letters.chars().find(|c| !c.is_ascii_uppercase()) {
            return Err(SymbolError::InvalidChar { ch });
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ticker letters without the sigil.
    pub fn ticker(&self) -> &str {
        &self.0[SIGIL.len_utf8()..]
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TickerSymbol> for String {
    fn from(symbol: TickerSymbol) -> Self {
        symbol.0
    }
}

// ---------------------------------------------------------------------------
// Source reference
// ---------------------------------------------------------------------------

/// One monitored profile, identified by its URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }

    /// Last non-empty path segment, e.g. `allstarcharts` for
    /// `https://twitter.com/allstarcharts`. Falls back to the full URL.
    pub fn handle(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Mention counts keyed by symbol. Only positive counts are stored.
///
/// Used both per source (one scrape) and globally (one cycle).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: BTreeMap<TickerSymbol, u64>,
}

/// Counts from one source's scrape in one cycle.
pub type PerSourceTally = Tally;

/// Sum of every [`PerSourceTally`] in one cycle.
pub type GlobalTally = Tally;

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a single occurrence.
    pub fn record(&mut self, symbol: TickerSymbol) {
        self.add(symbol, 1);
    }

    /// Add `count` occurrences. A zero count leaves the tally untouched.
    pub fn add(&mut self, symbol: TickerSymbol, count: u64) {
        if count == 0 {
            return;
        }
        *self.counts.entry(symbol).or_insert(0) += count;
    }

    /// Fold another tally into this one by summing per symbol.
    pub fn merge(&mut self, other: &Tally) {
        for (symbol, count) in &other.counts {
            self.add(symbol.clone(), *count);
        }
    }

    pub fn get(&self, symbol: &TickerSymbol) -> u64 {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TickerSymbol, u64)> {
        self.counts.iter().map(|(s, c)| (s, *c))
    }
}

impl FromIterator<TickerSymbol> for Tally {
    fn from_iter<I: IntoIterator<Item = TickerSymbol>>(iter: I) -> Self {
        let mut tally = Tally::new();
        for symbol in iter {
            tally.record(symbol);
        }
        tally
    }
}

// ---------------------------------------------------------------------------
// Ranked snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub symbol: TickerSymbol,
    pub count: u64,
}

/// Point-in-time ranking of one cycle: count descending, then symbol
/// ascending for equal counts.
///
/// Serialized as a JSON object whose key order is the ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedSnapshot {
    entries: Vec<RankedEntry>,
}

impl RankedSnapshot {
    pub fn from_tally(tally: &Tally) -> Self {
        let mut entries: Vec<RankedEntry> = tally
            .iter()
            .map(|(symbol, count)| RankedEntry {
                symbol: symbol.clone(),
                count,
            })
            .collect();

        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.symbol.cmp(&b.symbol)));

        Self { entries }
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn total_mentions(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RankedSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(entry.symbol.as_str(), &entry.count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RankedSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = RankedSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of ticker symbol to mention count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((symbol, count)) = access.next_entry::<TickerSymbol, u64>()? {
                    entries.push(RankedEntry { symbol, count });
                }
                Ok(RankedSnapshot { entries })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
