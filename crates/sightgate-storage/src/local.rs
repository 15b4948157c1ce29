use crate::keys;
use crate::traits::{BlobReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use sightgate_core::ObjectMetadata;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Directory under the base path holding metadata sidecars. Not a valid
/// container name, so it can never collide with one.
const METADATA_DIR: &str = ".metadata";

/// Local filesystem storage implementation
///
/// Containers are directories under `base_path`; metadata for
/// `{container}/{name}` is kept as JSON in `.metadata/{container}/{name}.json`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`, creating it if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    fn container_path(&self, container: &str) -> PathBuf {
        self.base_path.join(container)
    }

    fn object_path(&self, container: &str, name: &str) -> StorageResult<PathBuf> {
        keys::validate(container, name)?;
        Ok(self.container_path(container).join(name))
    }

    fn metadata_path(&self, container: &str, name: &str) -> StorageResult<PathBuf> {
        keys::validate(container, name)?;
        Ok(self
            .base_path
            .join(METADATA_DIR)
            .join(container)
            .join(format!("{}.json", name)))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn require_object(&self, container: &str, name: &str) -> StorageResult<PathBuf> {
        let path = self.object_path(container, name)?;
        if !fs::try_exists(self.container_path(container)).await? {
            return Err(StorageError::ContainerNotFound(container.to_string()));
        }
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(format!("{}/{}", container, name)));
        }
        Ok(path)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn open(&self, container: &str, name: &str) -> StorageResult<BlobReader> {
        let path = self.require_object(container, name).await?;

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;
        let length = file.metadata().await?.len();

        tracing::debug!(
            container = %container,
            name = %name,
            size_bytes = length,
            "Local storage object opened"
        );

        Ok(BlobReader::new(file, length))
    }

    async fn list(&self, container: &str) -> StorageResult<Vec<String>> {
        keys::validate_container(container)?;
        let root = self.container_path(container);
        if !fs::try_exists(&root).await? {
            return Err(StorageError::ContainerNotFound(container.to_string()));
        }

        let mut names = Vec::new();
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&root) {
                    let name = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn put_stream(
        &self,
        container: &str,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        let path = self.object_path(container, name)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        // A fresh write replaces the object, metadata included.
        let sidecar = self.metadata_path(container, name)?;
        if fs::try_exists(&sidecar).await? {
            fs::remove_file(&sidecar).await?;
        }

        tracing::info!(
            path = %path.display(),
            container = %container,
            name = %name,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(bytes_copied)
    }

    async fn fetch_metadata(&self, container: &str, name: &str) -> StorageResult<ObjectMetadata> {
        self.require_object(container, name).await?;
        let sidecar = self.metadata_path(container, name)?;

        if !fs::try_exists(&sidecar).await? {
            return Ok(ObjectMetadata::new());
        }

        let raw = fs::read(&sidecar).await.map_err(|e| {
            StorageError::MetadataFailed(format!(
                "Failed to read metadata {}: {}",
                sidecar.display(),
                e
            ))
        })?;

        serde_json::from_slice(&raw).map_err(|e| {
            StorageError::MetadataFailed(format!(
                "Corrupt metadata {}: {}",
                sidecar.display(),
                e
            ))
        })
    }

    async fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        self.require_object(container, name).await?;
        let sidecar = self.metadata_path(container, name)?;
        self.ensure_parent_dir(&sidecar).await?;

        let raw = serde_json::to_vec_pretty(metadata)
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;

        let mut file = fs::File::create(&sidecar).await.map_err(|e| {
            StorageError::MetadataFailed(format!(
                "Failed to create metadata {}: {}",
                sidecar.display(),
                e
            ))
        })?;
        file.write_all(&raw).await?;
        file.sync_all().await?;

        tracing::debug!(
            container = %container,
            name = %name,
            keys = metadata.len(),
            "Local storage metadata saved"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_put_then_open() {
        let (_dir, storage) = storage().await;
        let mut data: &[u8] = b"image bytes";

        let written = storage
            .put_stream("accepted", "cat.jpg", &mut data)
            .await
            .unwrap();
        assert_eq!(written, 11);

        let mut blob = storage.open("accepted", "cat.jpg").await.unwrap();
        assert_eq!(blob.length, 11);

        let mut read_back = Vec::new();
        blob.reader.read_to_end(&mut read_back).await.unwrap();
        assert_eq!(read_back, b"image bytes");
    }

    #[tokio::test]
    async fn test_missing_container_and_object() {
        let (_dir, storage) = storage().await;

        let result = storage.open("uploaded", "cat.jpg").await;
        assert!(matches!(result, Err(StorageError::ContainerNotFound(_))));

        let mut data: &[u8] = b"x";
        storage.put_stream("uploaded", "dog.jpg", &mut data).await.unwrap();
        let result = storage.open("uploaded", "cat.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_filesystem_errors_are_not_reported_as_missing() {
        let (dir, storage) = storage().await;
        // A regular file where the container directory should be.
        std::fs::write(dir.path().join("uploaded"), b"not a directory").unwrap();

        let result = storage.open("uploaded", "cat.jpg").await;
        assert!(matches!(result, Err(StorageError::IoError(_))));

        let result = storage.fetch_metadata("uploaded", "cat.jpg").await;
        assert!(matches!(result, Err(StorageError::IoError(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, storage) = storage().await;

        let result = storage.open("uploaded", "../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let mut data: &[u8] = b"x";
        let result = storage.put_stream("accepted", "/etc/passwd", &mut data).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.list(".metadata").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let (_dir, storage) = storage().await;
        let mut data: &[u8] = b"pixels";
        storage.put_stream("rejected", "a/b.png", &mut data).await.unwrap();

        assert!(storage
            .fetch_metadata("rejected", "a/b.png")
            .await
            .unwrap()
            .is_empty());

        let mut metadata = ObjectMetadata::new();
        metadata.insert("isAdultContent".to_string(), "True".to_string());
        storage
            .set_metadata("rejected", "a/b.png", &metadata)
            .await
            .unwrap();

        let fetched = storage.fetch_metadata("rejected", "a/b.png").await.unwrap();
        assert_eq!(fetched, metadata);
    }

    #[tokio::test]
    async fn test_rewrite_clears_metadata() {
        let (_dir, storage) = storage().await;
        let mut data: &[u8] = b"v1";
        storage.put_stream("accepted", "x.jpg", &mut data).await.unwrap();

        let mut metadata = ObjectMetadata::new();
        metadata.insert("racyScore".to_string(), "3%".to_string());
        storage.set_metadata("accepted", "x.jpg", &metadata).await.unwrap();

        let mut data: &[u8] = b"v2";
        storage.put_stream("accepted", "x.jpg", &mut data).await.unwrap();
        assert!(storage.fetch_metadata("accepted", "x.jpg").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_requires_object() {
        let (_dir, storage) = storage().await;
        let mut data: &[u8] = b"x";
        storage.put_stream("accepted", "present.jpg", &mut data).await.unwrap();

        let result = storage
            .set_metadata("accepted", "absent.jpg", &ObjectMetadata::new())
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_nested() {
        let (_dir, storage) = storage().await;
        for name in ["b.jpg", "a.jpg", "2024/c.jpg"] {
            let mut data: &[u8] = b"x";
            storage.put_stream("uploaded", name, &mut data).await.unwrap();
        }

        let names = storage.list("uploaded").await.unwrap();
        assert_eq!(names, vec!["2024/c.jpg", "a.jpg", "b.jpg"]);
    }
}
