use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::io::atomic::atomic_write;
use crate::io::config_io::data_dir;
use crate::io::lock::{FileLock, LockError};
use crate::model::config::AppConfig;
use crate::model::document::Document;
use crate::model::snapshot::SavedSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not write progress record {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not remove progress record {path}: {source}")]
    RemoveError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not encode progress record: {0}")]
    EncodeError(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Directory of `<key>.progress.json` records, one per tracked file.
///
/// Keys are the SHA-256 of the file's absolute path (see
/// [`path_identity`](crate::model::id::path_identity)), so a moved or renamed
/// file starts without progress.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ProgressStore { dir: dir.into() }
    }

    /// The store named by `dir_override`, then `[store] dir`, then the data dir.
    pub fn from_config(config: &AppConfig, dir_override: Option<&Path>) -> Self {
        let dir = dir_override
            .map(Path::to_path_buf)
            .or_else(|| config.store.dir.clone())
            .unwrap_or_else(Self::default_dir);
        ProgressStore::new(dir)
    }

    pub fn default_dir() -> PathBuf {
        data_dir().join("progress")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.progress.json", key))
    }

    /// The saved snapshot for `key`. Missing and unreadable records both
    /// read as "no snapshot".
    pub fn load(&self, key: &str) -> Option<SavedSnapshot> {
        let path = self.record_path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no progress record");
                return None;
            }
            Err(e) => {
                warn!("could not read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("ignoring corrupt progress record {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, key: &str, snapshot: &SavedSnapshot) -> Result<(), StoreError> {
        let path = self.record_path(key);
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::WriteError {
            path: path.clone(),
            source: e,
        })?;
        let json = serde_json::to_string_pretty(snapshot)?;

        let _lock = FileLock::acquire_default(&self.dir, &format!("{}.progress", key))?;
        atomic_write(&path, json.as_bytes()).map_err(|e| StoreError::WriteError {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "saved progress");
        Ok(())
    }

    pub fn save_document(&self, doc: &Document, key: &str) -> Result<(), StoreError> {
        self.save(key, &SavedSnapshot::capture(doc))
    }

    /// Delete the record for `key`. Returns whether one existed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.record_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::RemoveError { path, source: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store() -> (TempDir, ProgressStore) {
        let tmp = TempDir::new().unwrap();
        let store = ProgressStore::new(tmp.path().join("progress"));
        (tmp, store)
    }

    #[test]
    fn missing_record_is_none() {
        let (_tmp, store) = store();
        assert!(store.load("abc").is_none());
    }

    #[test]
    fn save_then_load() {
        let (_tmp, store) = store();
        let mut doc = Document::new("plan.md", parse("# A\n- [ ] one\n- [ ] two"));
        let id = doc.items()[2].id.clone();
        doc.set_checked(&id, true);
        store.save_document(&doc, "key1").unwrap();

        assert!(store.record_path("key1").ends_with("key1.progress.json"));
        let loaded = store.load("key1").unwrap();
        assert_eq!(loaded, {
            let mut expected = SavedSnapshot::capture(&doc);
            expected.saved_at = loaded.saved_at;
            expected
        });
        assert_eq!(loaded.checkbox_states.get(&id), Some(&true));
    }

    #[test]
    fn corrupt_record_is_none() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.record_path("bad"), "{ not json").unwrap();
        assert!(store.load("bad").is_none());
    }

    #[test]
    fn record_from_earlier_version_loads() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(
            store.record_path("old"),
            r#"{"filename":"list.md","savedAt":700000000,"checkboxStates":{"checkbox_0_0_aaaaaaaa_0":true}}"#,
        )
        .unwrap();
        let snapshot = store.load("old").unwrap();
        assert_eq!(snapshot.filename, "list.md");
        assert!(snapshot.items.is_none());
        assert_eq!(snapshot.checkbox_states.len(), 1);
    }

    #[test]
    fn remove_reports_existence() {
        let (_tmp, store) = store();
        let doc = Document::new("plan.md", parse("- [ ] a"));
        store.save_document(&doc, "k").unwrap();
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
        assert!(store.load("k").is_none());
    }

    #[test]
    fn override_beats_config() {
        let mut config = AppConfig::default();
        config.store.dir = Some(PathBuf::from("/from/config"));
        assert_eq!(
            ProgressStore::from_config(&config, None).dir(),
            Path::new("/from/config")
        );
        assert_eq!(
            ProgressStore::from_config(&config, Some(Path::new("/cli"))).dir(),
            Path::new("/cli")
        );
    }
}
