use crate::error::StoreError;
use crate::identity::CallerIdentity;
use chrono::{DateTime, Utc};
use marquee_models::{SelectionLog, WatchlistSnapshot};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

const WATCHLIST_FILE: &str = "watchlist.json";
const SELECTIONS_FILE: &str = "selections.json";

/// A snapshot as last written for one caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredWatchlist {
    pub snapshot: WatchlistSnapshot,
    pub stored_at: DateTime<Utc>,
}

/// Durable per-caller state
pub trait PersistentStore: Send + Sync {
    /// Replace whatever was stored for this caller
    fn upsert_watchlist(&self, identity: &CallerIdentity, snapshot: &WatchlistSnapshot) -> Result<(), StoreError>;

    fn get_watchlist(&self, identity: &CallerIdentity) -> Result<Option<StoredWatchlist>, StoreError>;

    fn append_selection(&self, identity: &CallerIdentity, log: &SelectionLog) -> Result<(), StoreError>;

    /// Newest first
    fn selections(&self, identity: &CallerIdentity) -> Result<Vec<SelectionLog>, StoreError>;

    /// Remove everything for every caller
    fn clear(&self) -> Result<(), StoreError>;
}

/// JSON files under `<root>/<identity>/`
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store under `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn caller_dir(&self, identity: &CallerIdentity) -> PathBuf {
        self.root.join(identity.storage_key())
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        if !path.exists() {
            debug!("Store miss: {:?}", path);
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| io_error(path, source))?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Store corruption detected in {:?}: {}. Deleting corrupted file.", path, e);
                if let Err(rm_err) = std::fs::remove_file(path) {
                    warn!("Failed to delete corrupted store file: {}", rm_err);
                }
                Ok(None)
            }
        }
    }

    fn write<T: Serialize>(&self, path: &Path, what: &str, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
            what: what.to_string(),
            source,
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json).map_err(|source| io_error(&temp_path, source))?;
        std::fs::rename(&temp_path, path).map_err(|source| io_error(path, source))?;
        debug!("Store saved: {:?}", path);
        Ok(())
    }
}

impl PersistentStore for FileStore {
    fn upsert_watchlist(&self, identity: &CallerIdentity, snapshot: &WatchlistSnapshot) -> Result<(), StoreError> {
        let stored = StoredWatchlist {
            snapshot: snapshot.clone(),
            stored_at: Utc::now(),
        };
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.write(&self.caller_dir(identity).join(WATCHLIST_FILE), "watchlist", &stored)
    }

    fn get_watchlist(&self, identity: &CallerIdentity) -> Result<Option<StoredWatchlist>, StoreError> {
        self.read(&self.caller_dir(identity).join(WATCHLIST_FILE))
    }

    fn append_selection(&self, identity: &CallerIdentity, log: &SelectionLog) -> Result<(), StoreError> {
        let path = self.caller_dir(identity).join(SELECTIONS_FILE);
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut logs: Vec<SelectionLog> = self.read(&path)?.unwrap_or_default();
        logs.push(log.clone());
        self.write(&path, "selection log", &logs)
    }

    fn selections(&self, identity: &CallerIdentity) -> Result<Vec<SelectionLog>, StoreError> {
        let mut logs: Vec<SelectionLog> = self
            .read(&self.caller_dir(identity).join(SELECTIONS_FILE))?
            .unwrap_or_default();
        logs.sort_by(|a, b| b.selected_at.cmp(&a.selected_at));
        Ok(logs)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root).map_err(|source| io_error(&self.root, source))?;
        }
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::entries;
    use chrono::Duration;
    use tempfile::TempDir;

    fn identity() -> CallerIdentity {
        CallerIdentity::new("local:default")
    }

    fn snapshot(username: &str, count: usize) -> WatchlistSnapshot {
        let mut snapshot = WatchlistSnapshot::new(username);
        snapshot.entries = entries(count);
        snapshot.mark_exhausted();
        snapshot
    }

    #[test]
    fn test_upsert_replaces_previous_watchlist() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.upsert_watchlist(&identity(), &snapshot("first", 10)).unwrap();
        store.upsert_watchlist(&identity(), &snapshot("second", 3)).unwrap();

        let stored = store.get_watchlist(&identity()).unwrap().unwrap();
        assert_eq!(stored.snapshot.username, "second");
        assert_eq!(stored.snapshot.len(), 3);
    }

    #[test]
    fn test_identities_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.upsert_watchlist(&identity(), &snapshot("mine", 2)).unwrap();
        assert!(store
            .get_watchlist(&CallerIdentity::new("local:other"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_corrupted_watchlist_is_absent_and_removed() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        let path = temp_dir.path().join(identity().storage_key()).join(WATCHLIST_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(store.get_watchlist(&identity()).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_selections_listed_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        let older = SelectionLog {
            identity: identity().to_string(),
            username: "viewer".to_string(),
            picks: Vec::new(),
            selected_at: Utc::now() - Duration::days(1),
        };
        let newer = SelectionLog {
            selected_at: Utc::now(),
            ..older.clone()
        };

        store.append_selection(&identity(), &older).unwrap();
        store.append_selection(&identity(), &newer).unwrap();

        let logs = store.selections(&identity()).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0], newer);
    }

    #[test]
    fn test_clear_removes_everything() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("store"));
        store.upsert_watchlist(&identity(), &snapshot("viewer", 1)).unwrap();

        store.clear().unwrap();
        assert!(store.get_watchlist(&identity()).unwrap().is_none());
        assert!(store.selections(&identity()).unwrap().is_empty());
    }
}
