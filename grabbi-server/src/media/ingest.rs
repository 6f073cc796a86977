//! Image ingestion: remote product images and promotion uploads

use bytes::{Bytes, BytesMut};
use shared::error::{AppError, ErrorCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::sanitize::sanitize_filename;
use super::ssrf::{HostResolver, SsrfError, ValidatedUrl, validate_url};
use super::storage::{ObjectStorage, StorageError};

/// Largest accepted image body
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Content types accepted for direct uploads
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Ssrf(#[from] SsrfError),

    #[error("{url}: request failed ({reason})")]
    Fetch { url: String, reason: String },

    #[error("{url}: unexpected status {status}")]
    Status { url: String, status: u16 },

    #[error("{url}: content type '{content_type}' is not an image")]
    NotAnImage { url: String, content_type: String },

    #[error("image exceeds {MAX_IMAGE_BYTES} bytes")]
    TooLarge,

    #[error("unsupported content type '{0}'")]
    UnsupportedType(String),

    #[error("not an object in this bucket: {0}")]
    ForeignObject(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::TooLarge => {
                AppError::with_message(ErrorCode::PayloadTooLarge, "File exceeds 5 MiB")
            }
            IngestError::UnsupportedType(t) => AppError::with_message(
                ErrorCode::UnsupportedMediaType,
                format!("Unsupported content type '{t}'"),
            ),
            IngestError::ForeignObject(_) => {
                AppError::validation("url does not point into the media bucket")
            }
            IngestError::Storage(e) => {
                tracing::error!(error = %e, "Object storage failure");
                AppError::new(ErrorCode::StorageError)
            }
            other => AppError::with_message(ErrorCode::ImageUploadFailed, other.to_string()),
        }
    }
}

/// Downloads validated URLs and writes images to object storage
#[derive(Clone)]
pub struct ImageIngestor {
    resolver: Arc<dyn HostResolver>,
    storage: Arc<dyn ObjectStorage>,
}

impl ImageIngestor {
    pub fn new(resolver: Arc<dyn HostResolver>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { resolver, storage }
    }

    /// Fetch `url` and store it as a product image; returns the public URL
    pub async fn ingest_product_image(
        &self,
        product_id: Uuid,
        url: &str,
    ) -> Result<String, IngestError> {
        let validated = validate_url(url, self.resolver.as_ref()).await?;
        let client = pinned_client(&validated)?;
        let (bytes, content_type) = fetch_image(&client, url).await?;

        let path = format!(
            "products/{}_{}.jpg",
            sanitize_filename(&product_id.to_string()),
            crate::util::random_hex(4)
        );
        self.storage.put(&path, bytes, &content_type).await?;
        tracing::info!(product_id = %product_id, source = %url, path = %path, "Product image ingested");
        Ok(self.storage.location().public_url(&path))
    }

    /// Store an uploaded promotion image; returns the public URL
    pub async fn upload_promotion(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Bytes,
        unix_secs: i64,
    ) -> Result<String, IngestError> {
        if !ALLOWED_UPLOAD_TYPES.contains(&content_type) {
            return Err(IngestError::UnsupportedType(content_type.to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(IngestError::TooLarge);
        }
        let path = format!("promotions/{}_{}", unix_secs, sanitize_filename(filename));
        self.storage.put(&path, bytes, content_type).await?;
        Ok(self.storage.location().public_url(&path))
    }

    /// Delete by bare object path or public URL
    pub async fn delete(&self, url_or_path: &str) -> Result<(), IngestError> {
        let path = self.object_path(url_or_path)?;
        self.storage.delete(&path).await?;
        Ok(())
    }

    /// Public URL of a bare object path or one of our own URLs
    ///
    /// Order snapshots store this form, so reference checks must use it.
    pub fn public_url(&self, url_or_path: &str) -> Result<String, IngestError> {
        let path = self.object_path(url_or_path)?;
        Ok(self.storage.location().public_url(&path))
    }

    fn object_path(&self, url_or_path: &str) -> Result<String, IngestError> {
        self.storage
            .location()
            .object_path(url_or_path)
            .ok_or_else(|| IngestError::ForeignObject(url_or_path.to_string()))
    }
}

/// Client that connects only to the addresses validation checked
fn pinned_client(validated: &ValidatedUrl) -> Result<reqwest::Client, IngestError> {
    let mut builder = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .redirect(reqwest::redirect::Policy::none());
    if validated.url.domain().is_some() {
        builder = builder.resolve_to_addrs(&validated.host, &validated.addrs);
    }
    builder.build().map_err(|e| IngestError::Fetch {
        url: validated.url.to_string(),
        reason: e.to_string(),
    })
}

/// GET an image: 200 only, `image/*` only, at most [`MAX_IMAGE_BYTES`]
pub(crate) async fn fetch_image(
    client: &reqwest::Client,
    url: &str,
) -> Result<(Bytes, String), IngestError> {
    let fetch_err = |e: reqwest::Error| IngestError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let mut resp = client.get(url).send().await.map_err(fetch_err)?;

    if resp.status() != reqwest::StatusCode::OK {
        return Err(IngestError::Status {
            url: url.to_string(),
            status: resp.status().as_u16(),
        });
    }

    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(IngestError::NotAnImage {
            url: url.to_string(),
            content_type,
        });
    }

    if resp
        .content_length()
        .is_some_and(|len| len > MAX_IMAGE_BYTES as u64)
    {
        return Err(IngestError::TooLarge);
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = resp.chunk().await.map_err(fetch_err)? {
        if body.len() + chunk.len() > MAX_IMAGE_BYTES {
            return Err(IngestError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    Ok((body.freeze(), content_type))
}
