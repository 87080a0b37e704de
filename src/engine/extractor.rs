//! Cashtag extraction.
//!
//! Turns raw post text into canonical `$TICKER` symbols. A match is a `$`
//! followed by 1-5 uppercase ASCII letters that ends on a word boundary:
//! a letter run that keeps going (`$TOOLONGX`) or runs into a lowercase
//! letter, digit or underscore (`$AAPLs`, `$BRK1`) yields nothing.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::TickerSymbol;

lazy_static! {
    // Group 2 captures a trailing word character; its presence means the
    // letter run did not end on a word boundary.
    static ref CASHTAG: Regex = Regex::new(r"\$([A-Z]{1,5})([A-Za-z0-9_])?")
        .expect("valid cashtag pattern");
}

/// Extract every cashtag in `text`, left to right, duplicates included.
///
/// Total over any input: empty or symbol-free text returns an empty vec.
pub fn extract_symbols(text: &str) -> Vec<TickerSymbol> {
    CASHTAG
        .captures_iter(text)
        .filter(|caps| caps.get(2).is_none())
        .filter_map(|caps| caps.get(0))
        .filter_map(|m| TickerSymbol::new(m.as_str()).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
