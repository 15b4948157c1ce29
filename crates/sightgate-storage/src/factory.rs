use crate::object::AzureAccount;
use crate::{LocalStorage, ObjectStorage, Storage, StorageBackend, StorageError, StorageResult};
use std::path::PathBuf;
use std::sync::Arc;

const AZURE_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// A storage connection string, parsed but not yet connected.
#[derive(Debug, Clone)]
pub enum Connection {
    Local(PathBuf),
    Memory,
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
    },
    Azure(AzureAccount),
}

impl Connection {
    pub fn backend(&self) -> StorageBackend {
        match self {
            Connection::Local(_) => StorageBackend::Local,
            Connection::Memory => StorageBackend::Memory,
            Connection::S3 { .. } => StorageBackend::S3,
            Connection::Azure(_) => StorageBackend::Azure,
        }
    }
}

/// Parse a storage connection string.
///
/// Accepted forms:
/// - `file:///var/lib/sightgate` or a bare path
/// - `memory://`
/// - `s3://bucket?region=eu-west-1&endpoint=http://localhost:9000`
/// - an Azure storage connection string (`AccountName=..;AccountKey=..` or
///   `UseDevelopmentStorage=true`)
pub fn parse_connection(connection: &str) -> StorageResult<Connection> {
    let connection = connection.trim();
    if connection.is_empty() {
        return Err(StorageError::ConfigError(
            "Storage connection string is empty".to_string(),
        ));
    }

    if is_azure(connection) {
        return parse_azure(connection).map(Connection::Azure);
    }

    if !connection.contains("://") {
        return Ok(Connection::Local(PathBuf::from(connection)));
    }

    let url = url::Url::parse(connection)
        .map_err(|e| StorageError::ConfigError(format!("Invalid storage URL: {}", e)))?;

    match url.scheme() {
        "memory" => Ok(Connection::Memory),
        "file" => url
            .to_file_path()
            .map(Connection::Local)
            .map_err(|_| StorageError::ConfigError(format!("Invalid file URL: {}", url))),
        "s3" => {
            let bucket = url
                .host_str()
                .filter(|b| !b.is_empty())
                .ok_or_else(|| StorageError::ConfigError("S3 URL is missing a bucket".to_string()))?
                .to_string();
            let query = |key: &str| {
                url.query_pairs()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.into_owned())
            };
            Ok(Connection::S3 {
                bucket,
                region: query("region"),
                endpoint: query("endpoint"),
            })
        }
        other => Err(StorageError::ConfigError(format!(
            "Unsupported storage scheme: {}",
            other
        ))),
    }
}

fn is_azure(connection: &str) -> bool {
    ["AccountName=", "UseDevelopmentStorage=", "DefaultEndpointsProtocol="]
        .iter()
        .any(|marker| connection.contains(marker))
}

fn parse_azure(connection: &str) -> StorageResult<AzureAccount> {
    let mut account = AzureAccount {
        account: None,
        access_key: None,
        use_emulator: false,
    };

    for part in connection.split(';').filter(|p| !p.trim().is_empty()) {
        // Account keys are base64 and may themselves contain '='.
        let (key, value) = part.split_once('=').ok_or_else(|| {
            StorageError::ConfigError("Malformed Azure connection string".to_string())
        })?;

        match key.trim() {
            "AccountName" => account.account = Some(value.trim().to_string()),
            "AccountKey" => account.access_key = Some(value.trim().to_string()),
            "UseDevelopmentStorage" => {
                account.use_emulator = value.trim().eq_ignore_ascii_case("true")
            }
            "EndpointSuffix" if value.trim() != AZURE_ENDPOINT_SUFFIX => {
                return Err(StorageError::ConfigError(format!(
                    "Unsupported Azure endpoint suffix: {}",
                    value.trim()
                )));
            }
            _ => {}
        }
    }

    if !account.use_emulator && (account.account.is_none() || account.access_key.is_none()) {
        return Err(StorageError::ConfigError(
            "Azure connection string requires AccountName and AccountKey".to_string(),
        ));
    }

    Ok(account)
}

/// Create a storage backend from a connection string.
///
/// `containers` lists every container the caller will touch; backends that need
/// a client per container build them up front.
pub async fn create_storage(connection: &str, containers: &[&str]) -> StorageResult<Arc<dyn Storage>> {
    let parsed = parse_connection(connection)?;
    let backend = parsed.backend();

    let storage: Arc<dyn Storage> = match parsed {
        Connection::Local(path) => Arc::new(LocalStorage::new(path).await?),
        Connection::Memory => Arc::new(ObjectStorage::in_memory()),
        Connection::S3 {
            bucket,
            region,
            endpoint,
        } => Arc::new(ObjectStorage::s3(
            &bucket,
            region.as_deref(),
            endpoint.as_deref(),
        )?),
        Connection::Azure(account) => Arc::new(ObjectStorage::azure(&account, containers)?),
    };

    tracing::info!(backend = %backend, "Storage backend initialized");
    Ok(storage)
}
