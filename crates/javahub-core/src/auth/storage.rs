//! Key-value backends for the persisted session.
//!
//! Every backend applies a batch of [`Mutation`]s as one unit with respect to
//! [`KeyValueStore::get_many`] on the same instance, so a reader never sees a
//! half-written credential.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt session file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Corrupt keychain session: {0}")]
    CorruptKeychain(#[source] serde_json::Error),

    #[error("Session storage lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for StorageError {
    fn from(_: PoisonError<T>) -> Self {
        StorageError::Poisoned
    }
}

/// A single write against a key-value backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set { key: String, value: String },
    Remove { key: String },
}

impl Mutation {
    pub fn set(key: &str, value: impl Into<String>) -> Self {
        Mutation::Set {
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn remove(key: &str) -> Self {
        Mutation::Remove {
            key: key.to_string(),
        }
    }

    pub(crate) fn apply_to(&self, map: &mut HashMap<String, String>) {
        match self {
            Mutation::Set { key, value } => {
                map.insert(key.clone(), value.clone());
            }
            Mutation::Remove { key } => {
                map.remove(key);
            }
        }
    }
}

/// Persistent (or not) string key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read several keys as one consistent snapshot.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError>;

    /// Apply a batch of mutations as one unit.
    fn apply(&self, batch: &[Mutation]) -> Result<(), StorageError>;

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_many(&[key])?.pop().flatten())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store. Clones share the same entries, which lets tests keep
/// a handle on the raw storage behind a guard.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
        }
    }

    /// Copy of every entry currently stored
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .read()
            .map(|map| map.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let map = self.entries.read()?;
        Ok(keys.iter().map(|k| map.get(*k).cloned()).collect())
    }

    fn apply(&self, batch: &[Mutation]) -> Result<(), StorageError> {
        let mut map = self.entries.write()?;
        for mutation in batch {
            mutation.apply_to(&mut map);
        }
        Ok(())
    }
}

// ============================================================================
// JSON file
// ============================================================================

/// Stores all entries as one JSON object in a single file.
///
/// Writes go to a sibling temp file that is renamed over the target, so the
/// file on disk always holds either the old or the new batch. The file is
/// removed once it would be empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|e| Self::io_error(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StorageError> {
        if map.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|e| Self::io_error(&self.path, e))?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(parent, fs::Permissions::from_mode(0o700)) {
                    warn!(path = %parent.display(), error = %e, "Failed to restrict session directory permissions");
                }
            }
        }

        let contents = serde_json::to_string_pretty(map).map_err(|source| {
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        Self::write_private(&tmp, contents.as_bytes()).map_err(|e| Self::io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| Self::io_error(&self.path, e))
    }

    /// Write a fresh file that is owner-only from the moment it exists
    fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
        // A leftover temp file may carry a wider mode; never reuse it
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}

impl KeyValueStore for FileStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let _lock = self.lock.lock()?;
        let map = self.read_map()?;
        Ok(keys.iter().map(|k| map.get(*k).cloned()).collect())
    }

    fn apply(&self, batch: &[Mutation]) -> Result<(), StorageError> {
        let _lock = self.lock.lock()?;
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Corrupt { path, source }) => {
                // A clear must still be able to recover from a damaged file.
                warn!(path = %path.display(), error = %source, "Discarding corrupt session file");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        for mutation in batch {
            mutation.apply_to(&mut map);
        }
        debug!(path = %self.path.display(), entries = map.len(), "Writing session file");
        self.write_map(&map)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_store_set_and_get() {
        let store = MemoryStore::new();
        store
            .apply(&[Mutation::set("a", "1"), Mutation::set("b", "2")])
            .unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(
            store.get_many(&["b", "missing"]).unwrap(),
            vec![Some("2".to_string()), None]
        );
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.apply(&[Mutation::set("k", "v")]).unwrap();
        assert_eq!(handle.get("k").unwrap(), Some("v".to_string()));

        handle.apply(&[Mutation::remove("k")]).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_batch_applies_in_order() {
        let store = MemoryStore::with_entries([("k", "old")]);
        store
            .apply(&[Mutation::remove("k"), Mutation::set("k", "new")])
            .unwrap();
        assert_eq!(store.get("k").unwrap(), Some("new".to_string()));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let path = tmp.path().join("nested").join("session.json");

        FileStore::new(path.clone())
            .apply(&[Mutation::set("authToken", "abc")])
            .unwrap();

        let reopened = FileStore::new(path);
        assert_eq!(reopened.get("authToken").unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn test_file_store_removes_file_when_empty() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let path = tmp.path().join("session.json");
        let store = FileStore::new(path.clone());

        store.apply(&[Mutation::set("k", "v")]).unwrap();
        assert!(path.exists());

        store.apply(&[Mutation::remove("k")]).unwrap();
        assert!(!path.exists());
        // Removing from a missing file is fine
        store.apply(&[Mutation::remove("k")]).unwrap();
    }

    #[test]
    fn test_file_store_missing_or_blank_file_reads_empty() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let path = tmp.path().join("session.json");
        let store = FileStore::new(path.clone());
        assert_eq!(store.get("k").unwrap(), None);

        fs::write(&path, "  \n").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let path = tmp.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(path.clone());

        assert!(matches!(store.get("k"), Err(StorageError::Corrupt { .. })));

        // Writing over a corrupt file recovers it
        store.apply(&[Mutation::remove("k")]).unwrap();
        assert!(!path.exists());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let path = tmp.path().join("session.json");
        FileStore::new(path.clone())
            .apply(&[Mutation::set("authToken", "secret")])
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "session file should be 0600");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_never_reuses_a_readable_temp_file() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().expect("tmp dir");
        let dir = tmp.path().join("javahub");
        fs::create_dir_all(&dir).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
        let path = dir.join("session.json");

        // Leftover from an interrupted write, world-readable
        let leftover = path.with_extension("json.tmp");
        fs::write(&leftover, "{}").unwrap();
        fs::set_permissions(&leftover, fs::Permissions::from_mode(0o644)).unwrap();

        FileStore::new(path.clone())
            .apply(&[Mutation::set("authToken", "secret")])
            .unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert!(!leftover.exists());
        assert_eq!(
            FileStore::new(path).get("authToken").unwrap(),
            Some("secret".to_string())
        );
    }
}
