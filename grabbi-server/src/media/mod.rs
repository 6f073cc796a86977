//! Image ingestion: SSRF-guarded fetches, filename sanitization, object storage

pub mod ingest;
pub mod sanitize;
pub mod ssrf;
pub mod storage;

pub use ingest::{ImageIngestor, IngestError};
pub use ssrf::{DnsResolver, HostResolver};
pub use storage::{BucketStorage, DisabledStorage, ObjectStorage};
