//! Per-IP token bucket rate limiting

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Buckets unseen for this long are dropped by the reaper
const IDLE_TTL: Duration = Duration::from_secs(600);
/// Reaper period
const REAP_INTERVAL: Duration = Duration::from_secs(300);

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    /// IP -> bucket
    inner: Arc<Mutex<HashMap<String, Bucket>>>,
    capacity: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    /// `max_requests` tokens, fully refilled over `window_secs`
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        let capacity = f64::from(max_requests.max(1));
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity,
            refill_per_sec: capacity / window_secs.max(1) as f64,
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(&self, ip: &str) -> bool {
        self.check_at(ip, Instant::now()).await
    }

    pub async fn check_at(&self, ip: &str, now: Instant) -> bool {
        let mut map = self.inner.lock().await;
        let bucket = map.entry(ip.to_owned()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Remove buckets idle for longer than ten minutes
    pub async fn cleanup(&self) {
        self.cleanup_at(Instant::now()).await;
    }

    async fn cleanup_at(&self, now: Instant) {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < IDLE_TTL);
        let removed = before - map.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = map.len(), "Rate limiter buckets reaped");
        }
    }

    /// Periodic cleanup task (every 5 minutes)
    pub fn spawn_reaper(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REAP_INTERVAL);
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        })
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Extract client IP: X-Forwarded-For header first, then peer address.
pub fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // X-Forwarded-For can be comma-separated; first entry is the original client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    // Fallback: peer address from extensions (ConnectInfo)
    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Admission middleware applied to every route
pub async fn rate_limit(
    State(state): State<crate::state::AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(&request);
    if !state.rate_limiter.check(&ip).await {
        tracing::warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        return Err(AppError::too_many_requests().into_response());
    }
    Ok(next.run(request).await)
}
