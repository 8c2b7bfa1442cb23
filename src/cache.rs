//! Modification-time cache shared by the dependency-tracking drivers.
//!
//! A single build touches the same headers from many sources, so each path
//! is stat'ed once per run. The map is read and written from every worker
//! thread and lives behind a mutex. Entries are never invalidated during a
//! run; construct the cache disabled to always hit the filesystem.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Debug)]
pub struct MtimeCache {
    enabled: bool,
    entries: Mutex<HashMap<PathBuf, SystemTime>>,
}

impl MtimeCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last modification time of `path`, populated on first access.
    pub fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        if !self.enabled {
            return read_mtime(path);
        }
        let key = absolute(path);
        if let Some(t) = self.lock().get(&key) {
            return Ok(*t);
        }
        // Stat outside the lock; a racing insert stores the same value.
        let mtime = read_mtime(&key)?;
        self.lock().insert(key, mtime);
        Ok(mtime)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, SystemTime>> {
        // A poisoned map still holds valid timestamps.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MtimeCache {
    fn default() -> Self {
        Self::new(true)
    }
}

fn read_mtime(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
