//! Merged snapshot cache.
//!
//! The snapshot is a derived file at the root holding the fold of every
//! fragment. A sidecar fingerprint records which fragment set it was built
//! from; `read` rebuilds whenever the fragments no longer match.
//!
//! A snapshot built while some fragment was unreadable gets no fingerprint,
//! so it is never considered fresh and every `read` retries the merge.
//!
//! The fingerprint uses `DefaultHasher`, whose output may change between Rust
//! releases. A toolchain upgrade therefore costs one extra refresh and nothing
//! more.

use super::ConfigTree;
use super::locator::find_fragments;
use super::merge::{MergeReport, merge_configs};
use super::store::{load_tree, write_text_atomic, write_tree_atomic};
use crate::error::{ConfigError, ConfigResult};
use crate::settings::EngineSettings;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Owner of the snapshot file and its fingerprint.
#[derive(Debug)]
pub struct SnapshotCache {
    settings: EngineSettings,
    refresh_lock: Mutex<()>,
}

impl SnapshotCache {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Rebuild the snapshot from the current fragments and persist it.
    ///
    /// Unreadable fragments are reported in the returned [`MergeReport`] and
    /// left out of the snapshot; failing to write the snapshot is an error.
    pub fn refresh(&self) -> ConfigResult<MergeReport> {
        let _guard = self.refresh_lock.lock().unwrap_or_else(|e| e.into_inner());

        // Fingerprint first: a fragment edited mid-merge leaves the snapshot
        // marked stale rather than fresh.
        let fingerprint = fragment_fingerprint(&self.settings)?;
        let report = merge_configs(&self.settings);

        write_tree_atomic(&self.settings.snapshot_path(), &report.tree)?;
        if report.is_clean() {
            write_text_atomic(&self.settings.fingerprint_path(), &fingerprint)?;
        } else {
            self.clear_fingerprint()?;
        }

        info!(
            "Refreshed snapshot {} ({} fragment errors)",
            self.settings.snapshot_path().display(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Return the snapshot, rebuilding it first if absent or stale.
    ///
    /// Fails with [`ConfigError::Merge`] when the rebuild skipped any fragment,
    /// rather than serving a tree that lacks it.
    pub fn read(&self) -> ConfigResult<ConfigTree> {
        if !self.is_fresh()? {
            let report = self.refresh()?;
            if !report.is_clean() {
                return Err(ConfigError::Merge {
                    errors: report.errors,
                });
            }
            return Ok(report.tree);
        }
        let path = self.settings.snapshot_path();
        load_tree(&path)?.ok_or(ConfigError::NotFound { path })
    }

    /// Drop the fingerprint so the snapshot on disk reads as stale.
    fn clear_fingerprint(&self) -> ConfigResult<()> {
        let path = self.settings.fingerprint_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConfigError::write(&path, e)),
        }
    }

    /// Whether the snapshot exists and matches the current fragment set.
    pub fn is_fresh(&self) -> ConfigResult<bool> {
        let snapshot = self.settings.snapshot_path();
        if !snapshot.is_file() {
            debug!("No snapshot at {}", snapshot.display());
            return Ok(false);
        }

        let stored = match fs::read_to_string(self.settings.fingerprint_path()) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(ConfigError::read(&self.settings.fingerprint_path(), e)),
        };

        let current = fragment_fingerprint(&self.settings)?;
        if stored.trim() != current {
            warn!("Snapshot is stale; fragments changed since last refresh");
            return Ok(false);
        }
        Ok(true)
    }
}

/// Hash of every fragment's root-relative path and bytes, in sorted order.
pub fn fragment_fingerprint(settings: &EngineSettings) -> ConfigResult<String> {
    let mut hasher = DefaultHasher::new();

    for path in find_fragments(settings) {
        let relative = path.strip_prefix(&settings.root).unwrap_or(&path);
        relative.as_os_str().hash(&mut hasher);

        match fs::read(&path) {
            Ok(bytes) => bytes.hash(&mut hasher),
            // Vanished between discovery and read.
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0u8.hash(&mut hasher),
            Err(e) => return Err(ConfigError::read(&path, e)),
        }
    }

    Ok(format!("{:016x}", hasher.finish()))
}
