//! Snapshot persistence.
//!
//! Writes each cycle's ranked snapshot as pretty-printed JSON
//! (`{"$SYMBOL": count, ...}` in rank order). The default retention
//! rewrites one fixed file; the timestamped retention keeps one file
//! per cycle instead.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{OutputConfig, Retention};
use crate::types::RankedSnapshot;

/// Destination for the snapshot produced by every cycle.
pub trait SnapshotSink: Send + Sync {
    /// Persist `snapshot`, returning where it was written.
    fn save(&self, snapshot: &RankedSnapshot) -> Result<PathBuf>;
}

/// JSON file sink.
pub struct JsonFileSink {
    path: PathBuf,
    retention: Retention,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>, retention: Retention) -> Self {
        Self {
            path: path.into(),
            retention,
        }
    }

    pub fn from_config(cfg: &OutputConfig) -> Self {
        Self::new(&cfg.path, cfg.retention)
    }

    /// File written for a cycle saved at `at`.
    pub fn target_path(&self, at: DateTime<Utc>) -> PathBuf {
        match self.retention {
            Retention::Overwrite => self.path.clone(),
            Retention::Timestamped => {
                let stem = self
                    .path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "scrape_results".to_string());
                let ext = self
                    .path
                    .extension()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "json".to_string());
                let stamp = at
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
                    .replace(':', "-");
                self.path.with_file_name(format!("{stem}_{stamp}.{ext}"))
            }
        }
    }
}

impl SnapshotSink for JsonFileSink {
    fn save(&self, snapshot: &RankedSnapshot) -> Result<PathBuf> {
        let target = self.target_path(Utc::now());
        save_snapshot(snapshot, &target)?;
        Ok(target)
    }
}

/// Write `snapshot` to `path`, replacing any previous content.
///
/// The JSON goes to a temp file in the same directory which is then
/// renamed over `path`, so a reader never sees a half-written snapshot.
pub fn save_snapshot(snapshot: &RankedSnapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialise snapshot")?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("Output path has no file name: {}", path.display()))?;
    let tmp = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    std::fs::write(&tmp, json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }

    debug!(path = %path.display(), symbols = snapshot.len(), "Snapshot saved");
    Ok(())
}

/// Load a snapshot. Returns None if the file doesn't exist.
pub fn load_snapshot(path: &Path) -> Result<Option<RankedSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
    let snapshot: RankedSnapshot = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse snapshot from {}", path.display()))?;

    info!(
        path = %path.display(),
        symbols = snapshot.len(),
        mentions = snapshot.total_mentions(),
        "Snapshot loaded from disk"
    );
    Ok(Some(snapshot))
}

/// Delete a snapshot file (for testing or reset).
pub fn delete_snapshot(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete snapshot {}", path.display()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
