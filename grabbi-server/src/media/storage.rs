//! Object storage for product and promotion images
//!
//! Objects are public through the bucket's IAM policy; a URL is only handed
//! out after the upload call has returned.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object storage is not configured")]
    Disabled,

    #[error("failed to build storage client: {0}")]
    Build(String),

    #[error("storage operation failed: {0}")]
    Operation(#[from] object_store::Error),
}

/// Public URL layout: `https://<host>/<bucket>/<object-path>`
#[derive(Debug, Clone, PartialEq)]
pub struct PublicLocation {
    pub host: String,
    pub bucket: String,
}

impl PublicLocation {
    pub fn public_url(&self, object_path: &str) -> String {
        format!("https://{}/{}/{}", self.host, self.bucket, object_path)
    }

    /// Object path from either a bare path or one of our public URLs
    pub fn object_path(&self, url_or_path: &str) -> Option<String> {
        let value = url_or_path.trim();
        let path = if value.starts_with("http://") || value.starts_with("https://") {
            let parsed = url::Url::parse(value).ok()?;
            if parsed.host_str() != Some(self.host.as_str()) {
                return None;
            }
            let prefix = format!("/{}/", self.bucket);
            parsed.path().strip_prefix(&prefix)?.to_string()
        } else {
            value.trim_start_matches('/').to_string()
        };
        (!path.is_empty()).then_some(path)
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    fn location(&self) -> &PublicLocation;

    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Deleting a missing object succeeds
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Bucket-backed storage over any `object_store` implementation
pub struct BucketStorage {
    store: Arc<dyn ObjectStore>,
    location: PublicLocation,
}

impl BucketStorage {
    pub fn new(store: Arc<dyn ObjectStore>, location: PublicLocation) -> Self {
        Self { store, location }
    }

    /// Google Cloud Storage from config
    ///
    /// Credentials may be a service account file path or inline JSON.
    pub fn gcs(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(&config.bucket);
        if let Some(credentials) = &config.credentials {
            builder = if credentials.trim_start().starts_with('{') {
                builder.with_service_account_key(credentials)
            } else {
                builder.with_service_account_path(credentials)
            };
        }
        let store = builder
            .build()
            .map_err(|e| StorageError::Build(format!("GCS: {e}")))?;

        Ok(Self::new(
            Arc::new(store),
            PublicLocation {
                host: config.public_host.clone(),
                bucket: config.bucket.clone(),
            },
        ))
    }
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    fn location(&self) -> &PublicLocation {
        &self.location
    }

    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };
        let size = bytes.len();
        self.store
            .put_opts(&Path::from(path), PutPayload::from(bytes), opts)
            .await?;
        tracing::info!(path = %path, size, "Object uploaded");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match self.store.delete(&Path::from(path)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                tracing::info!(path = %path, "Object deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Used when no bucket is configured: every write fails with `Disabled`
pub struct DisabledStorage {
    location: PublicLocation,
}

impl DisabledStorage {
    pub fn new() -> Self {
        Self {
            location: PublicLocation {
                host: "storage.googleapis.com".into(),
                bucket: String::new(),
            },
        }
    }
}

#[async_trait]
impl ObjectStorage for DisabledStorage {
    fn location(&self) -> &PublicLocation {
        &self.location
    }

    async fn put(&self, _path: &str, _bytes: Bytes, _content_type: &str) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }

    async fn delete(&self, _path: &str) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }
}
