//! Server configuration

use crate::error::BoxError;

/// SMTP settings; email is disabled when `SMTP_HOST` is unset
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Object storage settings; uploads are disabled when no bucket is set
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    /// Service account file path or inline JSON
    pub credentials: Option<String>,
    pub public_host: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// HS256 signing secret for access and refresh tokens
    pub jwt_secret: String,
    /// Seed admin credentials
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub storage: Option<StorageConfig>,
    /// Base URL used in password reset links
    pub frontend_url: String,
    /// Token bucket capacity per client IP
    pub rate_limit_max_requests: u32,
    /// Window over which the bucket fully refills
    pub rate_limit_window_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET").ok_or("JWT_SECRET must be set and non-empty")?;
        let database_url = non_empty("DATABASE_URL").ok_or("DATABASE_URL must be set")?;

        let smtp = non_empty("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: non_empty("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: non_empty("SMTP_USERNAME"),
            password: non_empty("SMTP_PASSWORD"),
            from: non_empty("SMTP_FROM").unwrap_or_else(|| "noreply@grabbi.app".into()),
        });

        let storage = non_empty("FIREBASE_STORAGE_BUCKET").map(|bucket| StorageConfig {
            bucket,
            credentials: non_empty("GOOGLE_APPLICATION_CREDENTIALS"),
            public_host: non_empty("STORAGE_PUBLIC_HOST")
                .unwrap_or_else(|| "storage.googleapis.com".into()),
        });

        Ok(Self {
            database_url,
            http_port: non_empty("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret,
            admin_email: non_empty("ADMIN_EMAIL"),
            admin_password: non_empty("ADMIN_PASSWORD"),
            smtp,
            storage,
            frontend_url: non_empty("FRONTEND_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:3000".into()),
            rate_limit_max_requests: non_empty("RATE_LIMIT_MAX_REQUESTS")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(100),
            rate_limit_window_secs: non_empty("RATE_LIMIT_WINDOW_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(60),
        })
    }
}
