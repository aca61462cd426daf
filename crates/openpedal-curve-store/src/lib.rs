//! Persisted calibration curve cache.
//!
//! Curves are stored in one JSON document at a well-known path, keyed
//! device identity → axis name → curve. The store is deliberately boring:
//!
//! - **Atomic saves**: write to a temporary file, then rename over the
//!   target, so a crash mid-save never leaves a truncated cache.
//! - **Tolerant loads**: malformed per-axis entries are skipped and
//!   reported as faults; the rest of the cache loads. A fully unreadable
//!   document loads as an empty cache, never a crash.
//! - **Round-trip exact**: `load(save(x)) == x` for any valid cache.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]
#![warn(missing_docs)]

pub mod cache;

pub use cache::CurveCache;

use std::path::{Path, PathBuf};

use anyhow::Context;
use openpedal_errors::PipelineFault;
use tokio::fs as async_fs;
use tracing::{debug, warn};

/// Result of loading the cache file: the usable cache plus any entries
/// that had to be dropped.
#[derive(Debug, Clone)]
pub struct LoadedCache {
    /// Every well-formed curve from the document.
    pub cache: CurveCache,
    /// One fault per skipped entry, for surfacing to the UI.
    pub skipped: Vec<PipelineFault>,
}

/// File-backed curve store with atomic writes.
#[derive(Debug, Clone)]
pub struct CurveStore {
    path: PathBuf,
}

impl CurveStore {
    /// Store backed by the given cache file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache, skipping malformed entries.
    ///
    /// A missing file is a first run, not an error: it loads as an empty
    /// cache.
    ///
    /// # Errors
    ///
    /// Only genuine I/O failures (permissions, unreadable directory)
    /// error out; corruption never does.
    pub async fn load(&self) -> anyhow::Result<LoadedCache> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no curve cache yet, starting empty");
            return Ok(LoadedCache {
                cache: CurveCache::new(),
                skipped: Vec::new(),
            });
        }

        let text = async_fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read curve cache: {:?}", self.path))?;

        let (cache, skipped) = CurveCache::decode_tolerant(&text);
        for fault in &skipped {
            warn!(%fault, "skipping malformed curve cache entry");
        }
        debug!(path = ?self.path, curves = cache.len(), skipped = skipped.len(), "curve cache loaded");

        Ok(LoadedCache { cache, skipped })
    }

    /// Save the cache atomically: write a temp file, then rename it over
    /// the target.
    ///
    /// # Errors
    ///
    /// Fails on serialization or filesystem errors; the previous cache
    /// file is untouched in that case.
    pub async fn save(&self, cache: &CurveCache) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create cache directory: {parent:?}"))?;
        }

        let text = serde_json::to_string_pretty(cache).context("failed to encode curve cache")?;

        let temp_path = self.path.with_extension("tmp");
        async_fs::write(&temp_path, text.as_bytes())
            .await
            .with_context(|| format!("failed to write temp cache file: {temp_path:?}"))?;
        async_fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("failed to replace curve cache: {:?}", self.path))?;

        debug!(path = ?self.path, curves = cache.len(), "curve cache saved");
        Ok(())
    }

    /// Copy the current cache file into a timestamped backup next to it.
    ///
    /// # Errors
    ///
    /// Fails if the cache file exists but cannot be copied.
    pub async fn backup(&self) -> anyhow::Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("curves");
        let backup_path = self.path.with_file_name(format!("{stem}_{timestamp}.json.bak"));

        async_fs::copy(&self.path, &backup_path)
            .await
            .with_context(|| format!("failed to create cache backup: {backup_path:?}"))?;

        debug!(backup = ?backup_path, "curve cache backup created");
        Ok(Some(backup_path))
    }
}
