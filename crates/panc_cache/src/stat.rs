//! Per-run cache of file modification times.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;

/// Remembers each file's modification time (or absence) the first time it is
/// asked for.
///
/// One instance is meant to live for a single staleness check so that files
/// shared by many objects are stat'ed once; it never notices later changes.
#[derive(Debug, Default)]
pub struct FileStatCache {
    mtimes: DashMap<PathBuf, Option<SystemTime>>,
    stat_calls: AtomicUsize,
}

impl FileStatCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The modification time of `path`, or `None` if it cannot be stat'ed.
    pub fn mtime(&self, path: &Path) -> Option<SystemTime> {
        if let Some(known) = self.mtimes.get(path) {
            return *known;
        }
        self.stat_calls.fetch_add(1, Ordering::Relaxed);
        let mtime = fs::metadata(path).and_then(|m| m.modified()).ok();
        self.mtimes.insert(path.to_path_buf(), mtime);
        mtime
    }

    /// Whether `path` exists.
    pub fn exists(&self, path: &Path) -> bool {
        self.mtime(path).is_some()
    }

    /// True if `path` is missing or was modified strictly after `time`.
    pub fn is_missing_or_modified_after(&self, path: &Path, time: SystemTime) -> bool {
        self.mtime(path).map_or(true, |m| m > time)
    }

    /// True if `path` is missing or was modified strictly before `time`.
    pub fn is_missing_or_modified_before(&self, path: &Path, time: SystemTime) -> bool {
        self.mtime(path).map_or(true, |m| m < time)
    }

    /// How many times the filesystem was actually consulted.
    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::Relaxed)
    }
}
