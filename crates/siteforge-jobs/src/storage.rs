//! Object storage for published sites.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ClientOptions, ObjectStore, PutOptions, PutPayload};
use serde::Deserialize;

use crate::error::JobError;

/// Where published sites are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
    Memory,
}

/// `[storage]` configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Root directory for the local backend
    pub path: PathBuf,

    pub bucket: String,
    pub region: String,

    /// Custom S3 endpoint (MinIO, R2, ...)
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            path: PathBuf::from("storage"),
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
        }
    }
}

/// Published-site storage on top of an [`ObjectStore`].
#[derive(Clone)]
pub struct SiteStorage {
    store: Arc<dyn ObjectStore>,
    /// The local filesystem store cannot persist object attributes.
    content_type: bool,
}

impl SiteStorage {
    /// Build the configured backend. S3 credentials come from
    /// `S3_ACCESS_KEY` and `S3_SECRET_KEY`.
    pub fn from_config(config: &StorageConfig) -> Result<Self, JobError> {
        match config.backend {
            StorageBackend::Local => Self::local(config.path.clone()),
            StorageBackend::Memory => Ok(Self::in_memory()),
            StorageBackend::S3 => {
                if config.bucket.is_empty() {
                    return Err(JobError::StorageConfig(
                        "storage.bucket is required for the s3 backend".to_string(),
                    ));
                }
                tracing::info!("Using S3 bucket {} ({})", config.bucket, config.region);

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&config.bucket)
                    .with_region(&config.region)
                    .with_client_options(
                        ClientOptions::new().with_timeout(std::time::Duration::from_secs(30)),
                    );

                if let Ok(key) = std::env::var("S3_ACCESS_KEY") {
                    builder = builder.with_access_key_id(key);
                }
                if let Ok(secret) = std::env::var("S3_SECRET_KEY") {
                    builder = builder.with_secret_access_key(secret);
                }
                if let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }

                let store = builder
                    .build()
                    .map_err(|e| JobError::StorageConfig(format!("Failed to build S3 client: {}", e)))?;

                Ok(Self {
                    store: Arc::new(store),
                    content_type: true,
                })
            }
        }
    }

    /// Store objects under a local directory, creating it if needed.
    pub fn local(root: PathBuf) -> Result<Self, JobError> {
        std::fs::create_dir_all(&root).map_err(|e| {
            JobError::StorageConfig(format!("Failed to create {}: {}", root.display(), e))
        })?;
        let store = LocalFileSystem::new_with_prefix(&root)
            .map_err(|e| JobError::StorageConfig(format!("Failed to create local store: {}", e)))?;

        tracing::info!("Storing published sites in {}", root.display());
        Ok(Self {
            store: Arc::new(store),
            content_type: false,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            content_type: true,
        }
    }

    /// Upload an HTML page to `key`.
    pub async fn put_html(&self, key: &str, html: String) -> Result<(), JobError> {
        let path = ObjectPath::from(key);
        let mut options = PutOptions::default();
        if self.content_type {
            options.attributes = Attributes::from_iter([(Attribute::ContentType, "text/html")]);
        }

        self.store
            .put_opts(&path, PutPayload::from(html.into_bytes()), options)
            .await?;
        Ok(())
    }

    /// Fetch an HTML page. A missing object is `None`.
    pub async fn get_html(&self, key: &str) -> Result<Option<String>, JobError> {
        let path = ObjectPath::from(key);
        match self.store.get(&path).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for SiteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteStorage")
            .field("store", &self.store.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn memory_round_trip() {
        let storage = SiteStorage::in_memory();

        storage
            .put_html("sites/a-1/index.html", "<h1>A</h1>".to_string())
            .await
            .unwrap();

        assert_eq!(
            storage.get_html("sites/a-1/index.html").await.unwrap().as_deref(),
            Some("<h1>A</h1>")
        );
        assert_eq!(storage.get_html("sites/missing/index.html").await.unwrap(), None);
    }

    #[tokio::test]
    async fn local_backend_writes_files() {
        let temp = tempdir().unwrap();
        let storage = SiteStorage::from_config(&StorageConfig {
            path: temp.path().join("objects"),
            ..Default::default()
        })
        .unwrap();

        storage
            .put_html("sites/b-2/index.html", "<p>B</p>".to_string())
            .await
            .unwrap();

        let on_disk = std::fs::read_to_string(temp.path().join("objects/sites/b-2/index.html")).unwrap();
        assert_eq!(on_disk, "<p>B</p>");
    }

    #[test]
    fn s3_requires_bucket() {
        let err = SiteStorage::from_config(&StorageConfig {
            backend: StorageBackend::S3,
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(err, JobError::StorageConfig(_)));
    }

    #[test]
    fn backend_names_parse() {
        let config: StorageConfig = serde_json::from_str(r#"{"backend": "memory"}"#).unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.region, "us-east-1");
    }
}
