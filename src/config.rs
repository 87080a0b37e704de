//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the path in `TICKERPULSE_CONFIG`) and
//! deserializes into strongly-typed structs. Every section except
//! `sources` has defaults, so a minimal file only lists the accounts.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::SourceRef;

/// Default config file path.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "TICKERPULSE_CONFIG";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    pub name: String,
    /// Minutes between cycles. Also the window quoted in the mention log.
    pub interval_minutes: u64,
    /// Sources scraped at once. 1 scrapes them one at a time, in list order.
    pub concurrency: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            name: "tickerpulse".to_string(),
            interval_minutes: 10,
            concurrency: 1,
        }
    }
}

impl ScannerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Profile URLs to scan each cycle.
    pub accounts: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetcherConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Headless rendering service; when unset pages are fetched directly.
    pub render_endpoint: Option<String>,
    /// How long the renderer waits for more posts to load.
    pub settle_ms: u64,
    /// Use the whole page text when no post blocks are found.
    pub full_text_fallback: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "TickerPulse/0.1.0 (mention-scanner)".to_string(),
            render_endpoint: None,
            settle_ms: 5000,
            full_text_fallback: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    /// Rewrite one fixed file every cycle.
    #[default]
    Overwrite,
    /// Write a new file per cycle, named with the cycle timestamp.
    Timestamped,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub retention: Retention,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "scrape_results.json".to_string(),
            retention: Retention::Overwrite,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Config file path: `TICKERPULSE_CONFIG` if set, else `config.toml`.
    pub fn path_from_env() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scanner.interval_minutes == 0 {
            bail!("scanner.interval_minutes must be at least 1");
        }
        if self.scanner.concurrency == 0 {
            bail!("scanner.concurrency must be at least 1");
        }
        if self.fetcher.timeout_secs == 0 {
            bail!("fetcher.timeout_secs must be at least 1");
        }
        for account in &self.sources.accounts {
            if !(account.starts_with("https://") || account.starts_with("http://")) {
                bail!("source '{account}' is not an http(s) URL");
            }
        }
        Ok(())
    }

    /// Configured accounts, in list order.
    pub fn source_refs(&self) -> Vec<SourceRef> {
        self.sources.accounts.iter().map(SourceRef::new).collect()
    }
}
