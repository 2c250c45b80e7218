use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};
use tracing::{debug, warn};

use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Artifact storage below the configured data directory (transcripts,
/// classified JSON, archived book rows).
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
    local_base: Option<PathBuf>,
}

impl StorageManager {
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let backend_kind = cfg.storage.clone();
        let (store, local_base) = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
            local_base,
        })
    }

    /// Wraps an already constructed backend, mostly for tests.
    pub fn with_backend(store: DynStore, backend_kind: StorageKind) -> Self {
        Self {
            store,
            backend_kind,
            local_base: None,
        }
    }

    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }

    /// Deletes one object. A missing object is not an error; returns whether
    /// something was removed.
    pub async fn delete(&self, location: &str) -> object_store::Result<bool> {
        if !self.exists(location).await? {
            return Ok(false);
        }
        let path = ObjPath::from(location);
        match self.store.delete(&path).await {
            Ok(()) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn list(
        &self,
        prefix: Option<&str>,
    ) -> object_store::Result<Vec<object_store::ObjectMeta>> {
        let prefix_path = prefix.map(ObjPath::from);
        self.store.list(prefix_path.as_ref()).try_collect().await
    }

    /// Removes every object last modified more than `max_age` ago. Returns the
    /// number of objects removed.
    pub async fn purge_older_than(&self, max_age: Duration) -> object_store::Result<usize> {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(max_age)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let stale: Vec<ObjPath> = self
            .list(None)
            .await?
            .into_iter()
            .filter(|meta| meta.last_modified <= cutoff)
            .map(|meta| meta.location)
            .collect();
        let removed = stale.len();

        let parents: BTreeSet<String> = stale
            .iter()
            .filter_map(|location| {
                location
                    .to_string()
                    .rsplit_once('/')
                    .map(|(parent, _)| parent.to_string())
            })
            .collect();

        let locations: BoxStream<'_, object_store::Result<ObjPath>> =
            futures::stream::iter(stale.into_iter().map(Ok)).boxed();
        self.store
            .delete_stream(locations)
            .try_collect::<Vec<_>>()
            .await?;

        if matches!(self.backend_kind, StorageKind::Local) {
            for parent in parents {
                self.cleanup_filesystem_directories(&parent).await?;
            }
        }

        if removed > 0 {
            debug!(removed, "Purged stale artifacts");
        }
        Ok(removed)
    }

    /// Best-effort removal of directories left empty after a purge.
    async fn cleanup_filesystem_directories(&self, prefix: &str) -> object_store::Result<()> {
        let Some(base) = &self.local_base else {
            return Ok(());
        };

        let relative = Path::new(prefix);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            warn!(
                prefix = %prefix,
                "Skipping directory cleanup for unsupported prefix components"
            );
            return Ok(());
        }

        let mut current = base.join(relative);

        while current.starts_with(base) && current.as_path() != base.as_path() {
            match tokio::fs::remove_dir(&current).await {
                Ok(()) => {}
                Err(err) => match err.kind() {
                    ErrorKind::NotFound => {}
                    ErrorKind::DirectoryNotEmpty => break,
                    _ => debug!(
                        error = %err,
                        path = %current.display(),
                        "Failed to remove directory during cleanup"
                    ),
                },
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl StorageManager {
    /// In-memory backend for tests.
    pub fn memory() -> Self {
        Self::with_backend(Arc::new(InMemory::new()), StorageKind::Memory)
    }
}

async fn create_storage_backend(
    cfg: &AppConfig,
) -> object_store::Result<(DynStore, Option<PathBuf>)> {
    match cfg.storage {
        StorageKind::Local => {
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base.clone())?;
            Ok((Arc::new(store), Some(base)))
        }
        StorageKind::Memory => {
            let store = InMemory::new();
            Ok((Arc::new(store), None))
        }
    }
}

/// Resolve the absolute base directory used for local storage from config.
///
/// If `data_dir` is relative, it is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    let configured = PathBuf::from(&cfg.data_dir);
    if configured.is_absolute() {
        configured
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(root: &Path) -> AppConfig {
        AppConfig {
            data_dir: root.to_string_lossy().into_owned(),
            storage: StorageKind::Local,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn memory_put_get_exists_delete() {
        let storage = StorageManager::memory();
        let location = "transcripts/dQw4w9WgXcQ.txt";

        assert!(!storage.exists(location).await.expect("exists"));
        storage
            .put(location, Bytes::from_static(b"hello"))
            .await
            .expect("put");
        assert!(storage.exists(location).await.expect("exists"));
        assert_eq!(storage.get(location).await.expect("get"), Bytes::from_static(b"hello"));

        assert!(storage.delete(location).await.expect("delete"));
        assert!(!storage.delete(location).await.expect("delete missing"));
        assert!(!storage.exists(location).await.expect("exists"));
    }

    #[tokio::test]
    async fn local_backend_writes_below_data_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = StorageManager::new(&local_config(dir.path()))
            .await
            .expect("local storage");

        storage
            .put("processed_books/abc.json", Bytes::from_static(b"{}"))
            .await
            .expect("put");

        assert!(dir.path().join("processed_books/abc.json").exists());
    }

    #[tokio::test]
    async fn purge_removes_emptied_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = StorageManager::new(&local_config(dir.path()))
            .await
            .expect("local storage");

        storage
            .put("formatted_jsons/a.json", Bytes::from_static(b"1"))
            .await
            .expect("put a");
        storage
            .put("formatted_jsons/b.json", Bytes::from_static(b"2"))
            .await
            .expect("put b");

        let removed = storage
            .purge_older_than(Duration::ZERO)
            .await
            .expect("purge");

        assert_eq!(removed, 2);
        assert!(!dir.path().join("formatted_jsons").exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn purge_keeps_fresh_objects() {
        let storage = StorageManager::memory();
        storage
            .put("transcripts/fresh.txt", Bytes::from_static(b"x"))
            .await
            .expect("put");

        let removed = storage
            .purge_older_than(Duration::from_secs(3600))
            .await
            .expect("purge");
        assert_eq!(removed, 0);

        let removed = storage
            .purge_older_than(Duration::ZERO)
            .await
            .expect("purge all");
        assert_eq!(removed, 1);
        assert!(storage.list(None).await.expect("list").is_empty());
    }
}
