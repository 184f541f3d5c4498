//! Durable per-guild, per-module storage.
//!
//! Each guild context owns one [`GuildStorage`]: an in-memory map of
//! module name → arbitrary structured value, optionally bound to a durable
//! directory holding one file per module. File content is a versioned JSON
//! envelope — self-describing, schema-free, and stable across versions of
//! a module.
//!
//! # Durability invariants
//!
//! - A write is temp-file-then-rename, so a reader never observes a
//!   half-written file.
//! - Concurrent saves of the same entry are serialized by a per-name async
//!   mutex; the final file always equals one writer's complete value.
//! - [`load_all`](GuildStorage::load_all) isolates per-file decode
//!   failures: a corrupt file is logged and that module simply has no
//!   prior state, while every other file still loads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StorageError;

/// Current storage envelope format version.
pub const STORAGE_FORMAT_VERSION: u32 = 1;

/// The on-disk representation: a version tag wrapping the module's value.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    data: Value,
}

/// Storage for one guild: module name → durable value.
pub struct GuildStorage {
    dir: RwLock<Option<PathBuf>>,
    entries: RwLock<HashMap<String, Value>>,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for GuildStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl GuildStorage {
    /// Creates storage with no durable directory bound.
    ///
    /// In-memory operations work immediately; saving requires
    /// [`bind_dir`](Self::bind_dir) first.
    pub fn new() -> Self {
        Self {
            dir: RwLock::new(None),
            entries: RwLock::new(HashMap::new()),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Binds the durable directory, creating it if absent.
    pub async fn bind_dir(&self, path: impl Into<PathBuf>) -> Result<(), StorageError> {
        let path = path.into();
        tokio::fs::create_dir_all(&path).await?;
        *self.dir.write() = Some(path);
        Ok(())
    }

    /// The bound durable directory, if any.
    pub fn dir(&self) -> Option<PathBuf> {
        self.dir.read().clone()
    }

    /// Loads every file in the bound directory as one module's state.
    ///
    /// Files load concurrently. A file that fails to read or decode is
    /// logged and skipped — that module is treated as having no prior
    /// state and every other file still loads.
    pub async fn load_all(&self) -> Result<(), StorageError> {
        let dir = self.dir().ok_or(StorageError::NotConfigured)?;

        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Leftover temp files from an interrupted write are not state.
            if name.starts_with('.') {
                continue;
            }
            files.push((name.to_string(), path));
        }

        future::join_all(
            files
                .into_iter()
                .map(|(name, path)| self.load_single(name, path)),
        )
        .await;

        Ok(())
    }

    async fn load_single(&self, name: String, path: PathBuf) {
        match Self::read_envelope(&path).await {
            Ok(data) => {
                debug!(module = %name, "Loaded storage entry");
                self.entries.write().insert(name, data);
            }
            Err(e) => {
                warn!(module = %name, error = %e, "Failed to load storage entry, skipping");
            }
        }
    }

    async fn read_envelope(path: &Path) -> Result<Value, StorageError> {
        let bytes = tokio::fs::read(path).await?;
        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if envelope.version > STORAGE_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: envelope.version,
            });
        }

        Ok(envelope.data)
    }

    /// Returns the raw stored value for `name`.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries.read().get(name).cloned()
    }

    /// Returns the stored value for `name` deserialized as `T`.
    ///
    /// `None` when the entry is absent or does not decode as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.get(name)?;
        serde_json::from_value(value).ok()
    }

    /// Whether an entry exists for `name`.
    pub fn has(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// The names of all in-memory entries.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Stores a value in memory only.
    pub fn set(&self, name: &str, value: impl Serialize) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Serialize {
            name: name.to_string(),
            source,
        })?;
        self.entries.write().insert(name.to_string(), value);
        Ok(())
    }

    /// Stores a value and persists it before returning.
    ///
    /// Callers that need a durability guarantee must use this form rather
    /// than [`set`](Self::set) followed by an eventual batch save.
    pub async fn set_and_save(&self, name: &str, value: impl Serialize) -> Result<(), StorageError> {
        self.set(name, value)?;
        self.save(name).await
    }

    /// Persists the in-memory entry `name` to its file.
    ///
    /// Fails with [`StorageError::NotConfigured`] when no directory is
    /// bound and [`StorageError::NotFound`] when the entry is absent.
    pub async fn save(&self, name: &str) -> Result<(), StorageError> {
        let dir = self.dir().ok_or(StorageError::NotConfigured)?;

        let lock = self.write_lock(name);
        let _guard = lock.lock().await;

        // Read the value under the write lock so the file always reflects
        // one complete writer (last-writer-wins, never an interleaving).
        let value = self
            .get(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;

        let envelope = Envelope {
            version: STORAGE_FORMAT_VERSION,
            data: value,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|source| StorageError::Serialize {
            name: name.to_string(),
            source,
        })?;

        let tmp = dir.join(format!(".{name}.tmp"));
        let path = dir.join(name);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(module = %name, path = %path.display(), "Saved storage entry");
        Ok(())
    }

    /// Persists every in-memory entry concurrently.
    ///
    /// Individual failures are logged, not fatal to the batch.
    pub async fn save_all(&self) {
        let names = self.names();
        let results = future::join_all(names.iter().map(|name| self.save(name))).await;

        for (name, result) in names.iter().zip(results) {
            if let Err(e) = result {
                warn!(module = %name, error = %e, "Failed to save storage entry");
            }
        }
    }

    fn write_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.write_locks
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

impl std::fmt::Debug for GuildStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuildStorage")
            .field("dir", &self.dir())
            .field("entries", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_without_bound_dir_fails() {
        let storage = GuildStorage::new();
        storage.set("counter", json!(1)).unwrap();

        assert!(matches!(
            storage.save("counter").await,
            Err(StorageError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn save_of_missing_entry_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = GuildStorage::new();
        storage.bind_dir(dir.path()).await.unwrap();

        assert!(matches!(
            storage.save("ghost").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn set_and_save_roundtrips_through_a_fresh_load() {
        let dir = tempfile::tempdir().unwrap();
        let value = json!({
            "scores": {"alice": 3, "bob": [1, 2, 3]},
            "motd": "hello",
        });

        let storage = GuildStorage::new();
        storage.bind_dir(dir.path()).await.unwrap();
        storage.set_and_save("scoreboard", &value).await.unwrap();

        let fresh = GuildStorage::new();
        fresh.bind_dir(dir.path()).await.unwrap();
        fresh.load_all().await.unwrap();

        assert_eq!(fresh.get("scoreboard"), Some(value));
    }

    #[tokio::test]
    async fn one_corrupt_file_does_not_block_the_others() {
        let dir = tempfile::tempdir().unwrap();

        let storage = GuildStorage::new();
        storage.bind_dir(dir.path()).await.unwrap();
        storage.set_and_save("good", json!(42)).await.unwrap();
        tokio::fs::write(dir.path().join("bad"), b"not json at all")
            .await
            .unwrap();

        let fresh = GuildStorage::new();
        fresh.bind_dir(dir.path()).await.unwrap();
        fresh.load_all().await.unwrap();

        assert_eq!(fresh.get("good"), Some(json!(42)));
        assert!(!fresh.has("bad"));
    }

    #[tokio::test]
    async fn newer_format_version_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let future_file = serde_json::to_vec(&json!({"version": 99, "data": true})).unwrap();
        tokio::fs::write(dir.path().join("future"), future_file)
            .await
            .unwrap();

        let storage = GuildStorage::new();
        storage.bind_dir(dir.path()).await.unwrap();
        storage.load_all().await.unwrap();

        assert!(!storage.has("future"));
    }

    #[tokio::test]
    async fn concurrent_saves_of_one_entry_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(GuildStorage::new());
        storage.bind_dir(dir.path()).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..16u64 {
            let storage = Arc::clone(&storage);
            tasks.push(tokio::spawn(async move {
                // Each writer stores a large distinct payload.
                let payload = json!({"writer": i, "filler": "x".repeat(4096)});
                storage.set_and_save("contended", payload).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // The file decodes cleanly and equals one writer's complete value.
        let fresh = GuildStorage::new();
        fresh.bind_dir(dir.path()).await.unwrap();
        fresh.load_all().await.unwrap();

        let value = fresh.get("contended").expect("file must decode");
        let writer = value["writer"].as_u64().unwrap();
        assert!(writer < 16);
        assert_eq!(value["filler"].as_str().unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn typed_access_decodes_stored_values() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Prefs {
            greeting: String,
            limit: u32,
        }

        let storage = GuildStorage::new();
        let prefs = Prefs {
            greeting: "hi".into(),
            limit: 5,
        };
        storage.set("prefs", &prefs).unwrap();

        assert_eq!(storage.get_as::<Prefs>("prefs"), Some(prefs));
        assert_eq!(storage.get_as::<u32>("prefs"), None);
    }
}
