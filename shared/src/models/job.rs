//! Batch import job model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::product::ProductStatus;

/// Maximum rows accepted by one batch import
pub const MAX_BATCH_ROWS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Row-level failure recorded on a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    /// 1-based row index; 0 for failures outside any request row
    pub row: usize,
    pub product_name: String,
    pub fields: BTreeMap<String, String>,
}

impl JobError {
    pub fn field(
        row: usize,
        product_name: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), message.into());
        Self {
            row,
            product_name: product_name.into(),
            fields,
        }
    }
}

/// Progress-tracked batch job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub total: usize,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    #[serde(rename = "failed_count")]
    pub failed: usize,
    pub progress: u8,
    pub errors: Vec<JobError>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Franchise that submitted the job; `None` for admin imports
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub franchise_id: Option<Uuid>,
}

impl BatchJob {
    pub fn new(id: Uuid, total: usize, franchise_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            total,
            processed: 0,
            created: 0,
            updated: 0,
            deleted: 0,
            failed: 0,
            progress: 0,
            errors: Vec::new(),
            started_at: now,
            completed_at: None,
            franchise_id,
        }
    }

    /// floor(100 * processed / total) while running, 100 once terminal
    pub fn recompute_progress(&mut self) {
        let next = if self.status.is_terminal() {
            100
        } else if self.total == 0 {
            0
        } else {
            let pct = (self.processed.min(self.total) * 100) / self.total;
            u8::try_from(pct).unwrap_or(100)
        };
        self.progress = self.progress.max(next);
    }

    /// Move to a terminal status and stamp completion time
    pub fn finish(&mut self, status: JobStatus, now: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(now);
        self.recompute_progress();
    }
}

/// One row of a batch import request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductImportItem {
    pub id: Option<Uuid>,
    pub sku: Option<String>,
    #[serde(default)]
    pub item_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub retail_price: Decimal,
    pub promotion_price: Option<Decimal>,
    pub promotion_start: Option<DateTime<Utc>>,
    pub promotion_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub reorder_level: i32,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub barcode: Option<String>,
    pub is_vegan: Option<bool>,
    pub is_gluten_free: Option<bool>,
    pub is_age_restricted: Option<bool>,
    pub minimum_age: Option<i32>,
    pub status: Option<ProductStatus>,
    pub online_visible: Option<bool>,
    pub franchise_ids: Option<Vec<Uuid>>,
    pub delete: Option<bool>,
    pub image_urls: Option<Vec<String>>,
    pub images_provided: Option<bool>,
}

/// Batch import request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportRequest {
    pub products: Vec<ProductImportItem>,
    #[serde(default)]
    pub delete_missing: bool,
}

/// 202 response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchImportAccepted {
    pub job_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_floor_and_terminal() {
        let mut job = BatchJob::new(Uuid::new_v4(), 3, None, Utc::now());
        job.status = JobStatus::Processing;
        job.processed = 1;
        job.recompute_progress();
        assert_eq!(job.progress, 33);
        job.processed = 2;
        job.recompute_progress();
        assert_eq!(job.progress, 66);

        job.finish(JobStatus::Completed, Utc::now());
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = BatchJob::new(Uuid::new_v4(), 2, None, Utc::now());
        job.status = JobStatus::Processing;
        job.processed = 1;
        job.recompute_progress();
        assert_eq!(job.progress, 50);

        // total grows when reconciliation candidates are added
        job.total = 4;
        job.recompute_progress();
        assert_eq!(job.progress, 50);
    }

    #[test]
    fn test_import_item_lenient_defaults() {
        let item: ProductImportItem =
            serde_json::from_str(r#"{"item_name":"Bread","sku":" B1 "}"#).unwrap();
        assert_eq!(item.item_name, "Bread");
        assert_eq!(item.cost_price, Decimal::ZERO);
        assert!(item.category_id.is_none());
        assert!(item.image_urls.is_none());
    }

    #[test]
    fn test_job_serializes_snake_case_status() {
        let job = BatchJob::new(Uuid::nil(), 1, None, Utc::now());
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["progress"], 0);
        assert_eq!(json["failed_count"], 0);
        assert!(json.get("failed").is_none());
        assert!(json.get("franchise_id").is_none());
    }
}
