//! Append-only snapshot storage.
//!
//! Snapshots are addressed by their file stamp (`YYYYMMDD_HHMMSS`), so the
//! most recent capture is the greatest stamp.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};
use wishwatch_core::Snapshot;

use crate::StoreError;
use crate::files;

const SNAPSHOT_PREFIX: &str = "wishlist_";
const SNAPSHOT_EXT: &str = ".json";

/// Storage for chart captures. Entries are never modified or removed.
pub trait SnapshotStore: Send + Sync {
    /// Stamps of every stored snapshot, oldest first.
    fn stamps(&self) -> Result<Vec<String>, StoreError>;

    /// Load the snapshot stored under `stamp`.
    fn load(&self, stamp: &str) -> Result<Snapshot, StoreError>;

    /// Store a new snapshot. Fails if one with the same stamp exists.
    fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// The most recent snapshot, or `None` before the first run.
    fn latest(&self) -> Result<Option<Snapshot>, StoreError> {
        match self.stamps()?.pop() {
            Some(stamp) => self.load(&stamp).map(Some),
            None => Ok(None),
        }
    }
}

// ── File-backed store ──

/// One pretty-printed JSON file per snapshot in a single directory.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Use `dir` for snapshots. The directory is created on first append.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, stamp: &str) -> PathBuf {
        self.dir.join(format!("{SNAPSHOT_PREFIX}{stamp}{SNAPSHOT_EXT}"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn stamps(&self) -> Result<Vec<String>, StoreError> {
        Ok(files::stamped_files(&self.dir, SNAPSHOT_PREFIX, SNAPSHOT_EXT)?
            .into_iter()
            .map(|(stamp, _)| stamp)
            .collect())
    }

    fn load(&self, stamp: &str) -> Result<Snapshot, StoreError> {
        let path = self.path_for(stamp);
        if !path.is_file() {
            return Err(StoreError::NoSnapshot(stamp.to_string()));
        }
        let text = files::read_to_string(&path)?;
        let snapshot: Snapshot =
            serde_json::from_str(&text).map_err(|e| StoreError::json(&path, e))?;
        debug!(path = %path.display(), items = snapshot.items.len(), "loaded snapshot");
        Ok(snapshot)
    }

    fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let path = self.path_for(&snapshot.stamp());
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::json(&path, e))?;
        files::write_new(&path, &json)?;
        info!(path = %path.display(), items = snapshot.items.len(), "stored snapshot");
        Ok(())
    }
}

// ── In-memory store ──

/// Snapshot store held in memory, for tests and dry runs.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing snapshots.
    pub fn with(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        let map = snapshots.into_iter().map(|s| (s.stamp(), s)).collect();
        Self {
            snapshots: Mutex::new(map),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Snapshot>>, StoreError> {
        self.snapshots
            .lock()
            .map_err(|e| StoreError::Other(format!("mutex poisoned: {e}")))
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn stamps(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.guard()?.keys().cloned().collect())
    }

    fn load(&self, stamp: &str) -> Result<Snapshot, StoreError> {
        self.guard()?
            .get(stamp)
            .cloned()
            .ok_or_else(|| StoreError::NoSnapshot(stamp.to_string()))
    }

    fn append(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let stamp = snapshot.stamp();
        let mut map = self.guard()?;
        if map.contains_key(&stamp) {
            return Err(StoreError::AlreadyExists(PathBuf::from(stamp)));
        }
        map.insert(stamp, snapshot.clone());
        Ok(())
    }
}
