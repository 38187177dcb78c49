//! Download counter shared by every page process.
//!
//! Each increment is a whole-file read-modify-write done under an exclusive
//! lock, so concurrent clicks never lose an update. Reads take no lock: the
//! file is only ever replaced by rename, so a reader sees some complete
//! version of it.

use crate::model::CounterDocument;
use crate::store::{read_json, write_json_atomic};
use chrono::Utc;
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mutual exclusion held across one read-modify-write of the counter file.
pub trait CounterLock {
    type Guard;

    /// Blocks until the lock is held. Dropping the guard releases it.
    fn acquire(&self) -> io::Result<Self::Guard>;
}

/// Exclusive advisory lock on a side-car file next to the counter document.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_document(document: &Path) -> Self {
        let mut name = document.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        Self::new(document.with_file_name(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CounterLock for FileLock {
    type Guard = File;

    fn acquire(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

/// Owner of `download_counts.json`.
#[derive(Debug)]
pub struct CounterStore<L = FileLock> {
    path: PathBuf,
    lock: L,
}

impl CounterStore<FileLock> {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = FileLock::for_document(&path);
        Self { path, lock }
    }
}

impl<L: CounterLock> CounterStore<L> {
    pub fn with_lock(path: impl Into<PathBuf>, lock: L) -> Self {
        Self {
            path: path.into(),
            lock,
        }
    }

    /// Adds one view for `filename` and returns the new total.
    ///
    /// A counter file that exists but does not parse is left alone rather
    /// than replaced, so accumulated history is never wiped.
    pub fn try_increment(&self, filename: &str) -> io::Result<u64> {
        let _guard = self.lock.acquire()?;
        let mut doc: CounterDocument = read_json(&self.path)?.unwrap_or_default();
        let count = doc.bump(filename, Utc::now());
        write_json_atomic(&self.path, &doc)?;
        debug!("{filename} now has {count} downloads");
        Ok(count)
    }

    /// Best-effort increment. Failures are logged and the last readable count
    /// is returned instead.
    pub fn increment(&self, filename: &str) -> u64 {
        match self.try_increment(filename) {
            Ok(count) => count,
            Err(e) => {
                warn!("could not count download of {filename}: {e}");
                self.get(filename)
            }
        }
    }

    pub fn get(&self, filename: &str) -> u64 {
        self.load().get(filename)
    }

    /// The whole document; empty when missing or unreadable.
    pub fn load(&self) -> CounterDocument {
        match read_json(&self.path) {
            Ok(doc) => doc.unwrap_or_default(),
            Err(e) => {
                warn!("ignoring unreadable {}: {e}", self.path.display());
                CounterDocument::default()
            }
        }
    }
}
