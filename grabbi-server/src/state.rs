//! Application state shared by every handler

use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::{RateLimiter, TokenService};
use crate::config::Config;
use crate::email::{DisabledMailer, MailWorker, Mailer, Notifier, QUEUE_CAPACITY, SmtpMailer};
use crate::error::BoxError;
use crate::import::{BatchImporter, JobStore, PgCatalogStore};
use crate::media::{BucketStorage, DisabledStorage, DnsResolver, ImageIngestor, ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Access/refresh token issuing and validation
    pub tokens: TokenService,
    /// Token buckets for the signup and login routes
    pub rate_limiter: RateLimiter,
    /// Background catalog imports and their job store
    pub importer: BatchImporter,
    /// SSRF-guarded image fetch and bucket uploads
    pub ingestor: ImageIngestor,
    /// Producer side of the mail queue
    pub notifier: Notifier,
    /// Base URL for links in emails
    pub frontend_url: String,
}

impl AppState {
    /// Build state from config; the returned worker must be spawned
    pub fn new(config: &Config, pool: PgPool) -> Result<(Self, MailWorker), BoxError> {
        let storage: Arc<dyn ObjectStorage> = match &config.storage {
            Some(storage) => {
                tracing::info!(bucket = %storage.bucket, "Object storage enabled");
                Arc::new(BucketStorage::gcs(storage)?)
            }
            None => {
                tracing::warn!("FIREBASE_STORAGE_BUCKET not set, image uploads disabled");
                Arc::new(DisabledStorage::new())
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => {
                tracing::info!(host = %smtp.host, port = smtp.port, "SMTP enabled");
                Arc::new(SmtpMailer::new(smtp)?)
            }
            None => {
                tracing::warn!("SMTP_HOST not set, emails disabled");
                Arc::new(DisabledMailer)
            }
        };
        let (notifier, worker) = Notifier::new(mailer, QUEUE_CAPACITY);

        let ingestor = ImageIngestor::new(Arc::new(DnsResolver), storage);
        let importer = BatchImporter::new(
            Arc::new(PgCatalogStore::new(pool.clone())),
            ingestor.clone(),
            JobStore::new(),
        );

        let state = Self {
            pool,
            tokens: TokenService::new(&config.jwt_secret),
            rate_limiter: RateLimiter::new(
                config.rate_limit_max_requests,
                config.rate_limit_window_secs,
            ),
            importer,
            ingestor,
            notifier,
            frontend_url: config.frontend_url.clone(),
        };
        Ok((state, worker))
    }

    /// Spawn the mail worker and the periodic reapers
    pub fn spawn_background(&self, worker: MailWorker) {
        tokio::spawn(worker.run());
        self.rate_limiter.spawn_reaper();
        self.importer.jobs().spawn_reaper();
    }
}
