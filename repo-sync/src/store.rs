use crate::error::{RepoSyncError, RepoSyncResult};
use crate::model::Mirror;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::debug;

/// Where the last computed mirror lives between refreshes.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    async fn load(&self) -> RepoSyncResult<Option<Mirror>>;

    /// Replaces the stored snapshot; readers never observe a partial write.
    async fn save(&self, mirror: &Mirror) -> RepoSyncResult<()>;
}

/// JSON array on disk, replaced through a sibling temp file and a rename.
pub struct JsonFileStore {
    path: PathBuf
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temp files must live next to the target for the rename to be atomic.
    fn parent_dir(&self) -> PathBuf {
        self.path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}

#[async_trait]
impl MirrorStore for JsonFileStore {
    async fn load(&self) -> RepoSyncResult<Option<Mirror>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into())
        };

        let mirror: Mirror = serde_json::from_slice(&bytes).map_err(|e| {
            RepoSyncError::StoreError(format!("{} is not a valid snapshot: {}", self.path.display(), e))
        })?;
        Ok(Some(mirror))
    }

    async fn save(&self, mirror: &Mirror) -> RepoSyncResult<()> {
        let data = serde_json::to_vec(mirror)?;
        let dir = self.parent_dir();
        let path = self.path.clone();

        // One temp file per save; a failed persist deletes it on drop.
        tokio::task::spawn_blocking(move || -> RepoSyncResult<()> {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| RepoSyncError::IoError(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| RepoSyncError::StoreError(format!("snapshot writer panicked: {}", e)))??;

        debug!(path = %self.path.display(), records = mirror.len(), "Snapshot saved");
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    snapshot: RwLock<Option<Mirror>>
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mirror: Mirror) -> Self {
        Self {
            snapshot: RwLock::new(Some(mirror))
        }
    }
}

#[async_trait]
impl MirrorStore for InMemoryStore {
    async fn load(&self) -> RepoSyncResult<Option<Mirror>> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, mirror: &Mirror) -> RepoSyncResult<()> {
        *self.snapshot.write().await = Some(mirror.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilePresence, RepoMetadata, Visibility};
    use chrono::Utc;
    use std::sync::Arc;

    fn record(name: &str) -> RepoMetadata {
        RepoMetadata {
            name: name.to_string(),
            url: format!("https://github.com/octocat/{}", name),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            visibility: Visibility::Public,
            file_presence: FilePresence::Common,
            category: "tools".to_string(),
            tags: vec!["rust".to_string()]
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_whole_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("data.json"));

        store.save(&vec![record("a"), record("b")]).await.unwrap();
        store.save(&vec![record("c")]).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "c");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_saves_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("data.json")));
        let mirror: Mirror = (0..500).map(|i| record(&format!("repo-{}", i))).collect();

        for _ in 0..5 {
            let saves: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    let mirror = mirror.clone();
                    tokio::spawn(async move { store.save(&mirror).await })
                })
                .collect();
            for save in saves {
                save.await.unwrap().unwrap();
            }
        }

        assert_eq!(store.load().await.unwrap().unwrap().len(), 500);
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = JsonFileStore::new(path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, RepoSyncError::StoreError(_)));
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&vec![record("x")]).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap()[0].name, "x");
    }
}
