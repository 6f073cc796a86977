//! Batch product import: job registry, row validation, persistence seam, engine

pub mod engine;
pub mod job_store;
pub mod store;
pub mod validate;

pub use engine::{BatchImporter, ImportError, ImportScope};
pub use job_store::JobStore;
pub use store::{CatalogStore, PgCatalogStore, StoreError};
