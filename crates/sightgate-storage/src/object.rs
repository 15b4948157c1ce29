use crate::keys;
use crate::traits::{BlobReader, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectStore, PutOptions, PutPayload,
};
use sightgate_core::ObjectMetadata;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Credentials for an Azure storage account.
#[derive(Clone)]
pub struct AzureAccount {
    pub account: Option<String>,
    pub access_key: Option<String>,
    pub use_emulator: bool,
}

impl std::fmt::Debug for AzureAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAccount")
            .field("account", &self.account)
            .field("use_emulator", &self.use_emulator)
            .finish_non_exhaustive()
    }
}

/// How containers map onto underlying object stores.
#[derive(Clone)]
enum Layout {
    /// A single store; each container is a top-level prefix.
    Prefixed(Arc<dyn ObjectStore>),
    /// One store per known container.
    PerContainer(HashMap<String, Arc<dyn ObjectStore>>),
}

/// Storage backed by `object_store`.
///
/// Metadata is carried as `Attribute::Metadata` entries. Object stores cannot
/// patch metadata in place, so `set_metadata` re-puts the object with the new
/// attribute set.
#[derive(Clone)]
pub struct ObjectStorage {
    layout: Layout,
    backend: StorageBackend,
}

impl ObjectStorage {
    /// Wrap an existing store; containers become top-level prefixes.
    pub fn from_store(store: Arc<dyn ObjectStore>, backend: StorageBackend) -> Self {
        Self {
            layout: Layout::Prefixed(store),
            backend,
        }
    }

    /// Volatile storage, useful for dry runs and tests.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemory::new()), StorageBackend::Memory)
    }

    /// S3 (or an S3-compatible provider) with containers as prefixes in `bucket`.
    ///
    /// Credentials (and the region, unless given) are taken from the standard AWS
    /// environment variables.
    /// `endpoint_url` targets S3-compatible providers such as MinIO.
    pub fn s3(
        bucket: &str,
        region: Option<&str>,
        endpoint_url: Option<&str>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(region) = region {
            builder = builder.with_region(region);
        }

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self::from_store(Arc::new(store), StorageBackend::S3))
    }

    /// Azure Blob Storage with one client per container.
    pub fn azure(account: &AzureAccount, containers: &[&str]) -> StorageResult<Self> {
        let mut stores: HashMap<String, Arc<dyn ObjectStore>> = HashMap::new();

        for container in containers {
            keys::validate_container(container)?;

            let mut builder = MicrosoftAzureBuilder::new()
                .with_container_name(*container)
                .with_use_emulator(account.use_emulator);
            if let Some(name) = &account.account {
                builder = builder.with_account(name);
            }
            if let Some(key) = &account.access_key {
                builder = builder.with_access_key(key);
            }

            let store = builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
            stores.insert(container.to_string(), Arc::new(store));
        }

        Ok(Self {
            layout: Layout::PerContainer(stores),
            backend: StorageBackend::Azure,
        })
    }

    fn container_store(&self, container: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        keys::validate_container(container)?;
        match &self.layout {
            Layout::Prefixed(store) => Ok(store.clone()),
            Layout::PerContainer(stores) => stores
                .get(container)
                .cloned()
                .ok_or_else(|| StorageError::ContainerNotFound(container.to_string())),
        }
    }

    fn resolve(&self, container: &str, name: &str) -> StorageResult<(Arc<dyn ObjectStore>, Path)> {
        keys::validate_name(name)?;
        let store = self.container_store(container)?;
        let location = match &self.layout {
            Layout::Prefixed(_) => Path::from(format!("{}/{}", container, name)),
            Layout::PerContainer(_) => Path::from(name),
        };
        Ok((store, location))
    }

    fn map_read_error(container: &str, name: &str, error: ObjectStoreError) -> StorageError {
        match error {
            ObjectStoreError::NotFound { .. } => {
                StorageError::NotFound(format!("{}/{}", container, name))
            }
            other => StorageError::DownloadFailed(other.to_string()),
        }
    }
}

fn metadata_from_attributes(attributes: &Attributes) -> ObjectMetadata {
    attributes
        .iter()
        .filter_map(|(attribute, value)| match attribute {
            Attribute::Metadata(key) => {
                Some((key.to_string(), AsRef::<str>::as_ref(value).to_string()))
            }
            _ => None,
        })
        .collect()
}

#[async_trait]
impl Storage for ObjectStorage {
    async fn open(&self, container: &str, name: &str) -> StorageResult<BlobReader> {
        let (store, location) = self.resolve(container, name)?;
        let start = std::time::Instant::now();

        let result = store
            .get_opts(&location, GetOptions::default())
            .await
            .map_err(|e| Self::map_read_error(container, name, e))?;
        let length = u64::try_from(result.meta.size).unwrap_or(u64::MAX);

        let bytes = result.bytes().await.map_err(|e| {
            tracing::error!(
                error = %e,
                container = %container,
                name = %name,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Object storage download failed"
            );
            StorageError::DownloadFailed(e.to_string())
        })?;

        tracing::debug!(
            backend = %self.backend,
            container = %container,
            name = %name,
            size_bytes = length,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage object opened"
        );

        Ok(BlobReader::new(Cursor::new(bytes), length))
    }

    async fn list(&self, container: &str) -> StorageResult<Vec<String>> {
        let store = self.container_store(container)?;

        let (prefix, strip) = match &self.layout {
            Layout::Prefixed(_) => (Some(Path::from(container)), format!("{}/", container)),
            Layout::PerContainer(_) => (None, String::new()),
        };

        let objects: Vec<_> = store
            .list(prefix.as_ref())
            .try_collect()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let mut names: Vec<String> = objects
            .into_iter()
            .filter_map(|meta| {
                let location = meta.location.to_string();
                location.strip_prefix(strip.as_str()).map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    async fn put_stream(
        &self,
        container: &str,
        name: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> StorageResult<u64> {
        let (store, location) = self.resolve(container, name)?;
        let start = std::time::Instant::now();

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload stream: {}", e))
        })?;
        let size = data.len() as u64;

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(
                mime_guess::from_path(name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string(),
            ),
        );
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        store
            .put_opts(&location, PutPayload::from(data), options)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    container = %container,
                    name = %name,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object storage upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            backend = %self.backend,
            container = %container,
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage upload successful"
        );

        Ok(size)
    }

    async fn fetch_metadata(&self, container: &str, name: &str) -> StorageResult<ObjectMetadata> {
        let (store, location) = self.resolve(container, name)?;

        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = store
            .get_opts(&location, options)
            .await
            .map_err(|e| Self::map_read_error(container, name, e))?;

        Ok(metadata_from_attributes(&result.attributes))
    }

    async fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let (store, location) = self.resolve(container, name)?;
        let start = std::time::Instant::now();

        let current = store
            .get_opts(&location, GetOptions::default())
            .await
            .map_err(|e| Self::map_read_error(container, name, e))?;

        // Carry over non-metadata attributes (content type etc.) and replace the metadata set.
        let mut attributes = Attributes::new();
        for (attribute, value) in current.attributes.iter() {
            if !matches!(attribute, Attribute::Metadata(_)) {
                attributes.insert(attribute.clone(), value.clone());
            }
        }
        for (key, value) in metadata {
            attributes.insert(
                Attribute::Metadata(key.clone().into()),
                AttributeValue::from(value.clone()),
            );
        }

        let bytes = current
            .bytes()
            .await
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        store
            .put_opts(&location, PutPayload::from(bytes), options)
            .await
            .map_err(|e| StorageError::MetadataFailed(e.to_string()))?;

        tracing::debug!(
            backend = %self.backend,
            container = %container,
            name = %name,
            keys = metadata.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object storage metadata saved"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}
