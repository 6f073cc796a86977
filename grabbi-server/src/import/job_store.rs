//! In-process registry of batch import jobs
//!
//! Jobs live only as long as the process. Terminal jobs are evicted one hour
//! after completion, on every `create` and from the periodic reaper.

use chrono::{DateTime, Duration, Utc};
use shared::models::{BatchJob, JobError, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const JOB_TTL_SECS: i64 = 3600;
const REAPER_INTERVAL_SECS: u64 = 300;

/// Per-row outcome counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Created,
    Updated,
    Deleted,
    Failed,
}

#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, BatchJob>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending job for `total` rows, owned by `franchise_id` if set
    pub async fn create(&self, total: usize, franchise_id: Option<Uuid>) -> Uuid {
        self.create_at(total, franchise_id, Utc::now()).await
    }

    pub async fn create_at(
        &self,
        total: usize,
        franchise_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let mut jobs = self.jobs.write().await;
        evict(&mut jobs, now);
        jobs.insert(id, BatchJob::new(id, total, franchise_id, now));
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<BatchJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Apply `f` to the job; returns false if it no longer exists
    pub async fn update(&self, id: Uuid, f: impl FnOnce(&mut BatchJob)) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// Count one processed unit under `counter`
    pub async fn increment(&self, id: Uuid, counter: Counter) {
        self.update(id, |job| {
            match counter {
                Counter::Created => job.created += 1,
                Counter::Updated => job.updated += 1,
                Counter::Deleted => job.deleted += 1,
                Counter::Failed => job.failed += 1,
            }
            advance(job);
        })
        .await;
    }

    pub async fn push_error(&self, id: Uuid, error: JobError) {
        self.update(id, |job| job.errors.push(error)).await;
    }

    /// Enter `processing`, adding reconciliation candidates to `total`
    pub async fn set_processing(&self, id: Uuid, extra_total: usize) {
        self.update(id, |job| {
            job.status = JobStatus::Processing;
            job.total += extra_total;
            job.recompute_progress();
        })
        .await;
    }

    pub async fn complete(&self, id: Uuid, status: JobStatus) {
        let now = Utc::now();
        self.update(id, |job| job.finish(status, now)).await;
    }

    /// Remove expired terminal jobs; returns how many were removed
    pub async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        evict(&mut jobs, now)
    }

    pub fn spawn_reaper(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(REAPER_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let removed = store.evict_expired_at(Utc::now()).await;
                if removed > 0 {
                    tracing::debug!(removed, "Evicted expired import jobs");
                }
            }
        })
    }
}

fn advance(job: &mut BatchJob) {
    job.processed = (job.processed + 1).min(job.total);
    job.recompute_progress();
}

fn evict(jobs: &mut HashMap<Uuid, BatchJob>, now: DateTime<Utc>) -> usize {
    let cutoff = now - Duration::seconds(JOB_TTL_SECS);
    let before = jobs.len();
    jobs.retain(|_, job| {
        let completed_long_ago = job.completed_at.is_some_and(|t| t < cutoff);
        let stale_terminal = job.status.is_terminal() && job.started_at < cutoff;
        !(completed_long_ago || stale_terminal)
    });
    before - jobs.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_and_progress() {
        let store = JobStore::new();
        let id = store.create(4, None).await;
        store.set_processing(id, 0).await;

        store.increment(id, Counter::Created).await;
        store.increment(id, Counter::Updated).await;
        store.increment(id, Counter::Failed).await;
        store
            .push_error(id, JobError::field(3, "Bad", "item_name", "item_name is required"))
            .await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!((job.created, job.updated, job.failed), (1, 1, 1));
        assert_eq!(job.processed, 3);
        assert_eq!(job.progress, 75);
        assert_eq!(job.errors.len(), 1);

        store.increment(id, Counter::Deleted).await;
        store.complete(id, JobStatus::Completed).await;
        let job = store.get(id).await.unwrap();
        assert_eq!(job.processed, 4);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_processed_never_exceeds_total() {
        let store = JobStore::new();
        let id = store.create(1, None).await;
        store.set_processing(id, 0).await;
        store.increment(id, Counter::Created).await;
        store.update(id, advance).await;
        let job = store.get(id).await.unwrap();
        assert_eq!(job.processed, 1);
        assert!(job.created + job.updated + job.deleted + job.failed <= job.processed);
    }

    #[tokio::test]
    async fn test_set_processing_extends_total() {
        let store = JobStore::new();
        let id = store.create(2, None).await;
        store.set_processing(id, 3).await;
        let job = store.get(id).await.unwrap();
        assert_eq!(job.total, 5);
        assert_eq!(job.progress, 0);
    }

    #[tokio::test]
    async fn test_eviction() {
        let store = JobStore::new();
        let t0 = Utc::now();

        let done = store.create_at(1, None, t0).await;
        store.complete(done, JobStatus::Completed).await;
        let running = store.create_at(1, None, t0).await;
        store.set_processing(running, 0).await;

        // backdate completion
        store
            .update(done, |job| job.completed_at = Some(t0))
            .await;

        assert_eq!(store.evict_expired_at(t0 + Duration::minutes(30)).await, 0);
        assert_eq!(store.evict_expired_at(t0 + Duration::minutes(61)).await, 1);
        assert!(store.get(done).await.is_none());
        assert!(store.get(running).await.is_some());
    }

    #[tokio::test]
    async fn test_create_evicts() {
        let store = JobStore::new();
        let t0 = Utc::now();
        let old = store.create_at(1, None, t0).await;
        store
            .update(old, |job| job.finish(JobStatus::Failed, t0))
            .await;

        let fresh = store.create_at(1, None, t0 + Duration::hours(2)).await;
        assert!(store.get(old).await.is_none());
        assert!(store.get(fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::new();
        assert!(store.get(Uuid::new_v4()).await.is_none());
        assert!(!store.update(Uuid::new_v4(), |_| {}).await);
    }
}
