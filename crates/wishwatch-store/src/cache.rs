//! Enrichment cache: developer/publisher already resolved on earlier runs.
//!
//! Keyed by title, the same identity the diff engine uses. Only records
//! with both developer and publisher known are cached, so a partial lookup
//! is retried on a later run instead of being pre-filled forever.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use wishwatch_core::EnrichmentRecord;

use crate::StoreError;
use crate::files;

pub struct EnrichmentCache {
    path: PathBuf,
    records: BTreeMap<String, EnrichmentRecord>,
    dirty: bool,
}

impl EnrichmentCache {
    /// Load the cache at `path`. A missing or unreadable cache starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, EnrichmentRecord>>(&text) {
                Ok(mut records) => {
                    records.retain(|_, r| r.is_complete());
                    records
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring corrupt enrichment cache");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable enrichment cache");
                BTreeMap::new()
            }
        };
        Self {
            path,
            records,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&EnrichmentRecord> {
        self.records.get(identifier)
    }

    /// Remember a resolved record. Records with any placeholder are ignored.
    pub fn insert(&mut self, record: EnrichmentRecord) -> bool {
        if !record.is_complete() {
            return false;
        }
        if self.records.get(&record.identifier) == Some(&record) {
            return false;
        }
        self.records.insert(record.identifier.clone(), record);
        self.dirty = true;
        true
    }

    /// Snapshot of the cached records for the watchlist renderer.
    pub fn known(&self) -> HashMap<String, EnrichmentRecord> {
        self.records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Persist the cache if anything changed since load.
    pub fn save(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_vec_pretty(&self.records)
            .map_err(|e| StoreError::json(&self.path, e))?;
        files::replace(&self.path, &json)?;
        self.dirty = false;
        info!(path = %self.path.display(), records = self.records.len(), "saved enrichment cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wishwatch_core::UNKNOWN;

    fn rec(id: &str, dev: &str, publ: &str) -> EnrichmentRecord {
        EnrichmentRecord {
            identifier: id.into(),
            external_id: Some("1".into()),
            developer: dev.into(),
            publisher: publ.into(),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = EnrichmentCache::load(tmp.path().join("cache.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(EnrichmentCache::load(&path).is_empty());
    }

    #[test]
    fn placeholder_records_are_not_cached() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cache = EnrichmentCache::load(tmp.path().join("cache.json"));
        assert!(!cache.insert(rec("A", UNKNOWN, UNKNOWN)));
        assert!(!cache.insert(rec("B", "Dev", UNKNOWN)));
        assert!(!cache.insert(rec("C", UNKNOWN, "Pub")));
        assert!(cache.insert(rec("D", "Dev", "Pub")));
        assert!(!cache.insert(rec("D", "Dev", "Pub")), "unchanged insert");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("B").is_none());
    }

    #[test]
    fn partial_records_on_disk_are_dropped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        let mut on_disk = BTreeMap::new();
        on_disk.insert("G".to_string(), rec("G", "Dev", UNKNOWN));
        on_disk.insert("H".to_string(), rec("H", "Dev", "Pub"));
        std::fs::write(&path, serde_json::to_string(&on_disk).unwrap()).unwrap();

        let cache = EnrichmentCache::load(&path);
        assert!(cache.get("G").is_none());
        assert!(!cache.known().contains_key("G"));
        assert!(cache.get("H").is_some());
    }

    #[test]
    fn save_and_reload() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data").join("cache.json");
        let mut cache = EnrichmentCache::load(&path);
        cache.insert(rec("Hades II", "Supergiant Games", "Supergiant Games"));
        cache.save().unwrap();

        let reloaded = EnrichmentCache::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.get("Hades II").map(|r| r.developer.as_str()),
            Some("Supergiant Games")
        );
        assert!(reloaded.known().contains_key("Hades II"));
    }

    #[test]
    fn clean_cache_does_not_touch_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        let mut cache = EnrichmentCache::load(&path);
        cache.save().unwrap();
        assert!(!path.exists());
    }
}
