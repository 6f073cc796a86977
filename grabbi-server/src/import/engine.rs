//! Batch product import
//!
//! One background task per job walks the rows in order. Each row ends in
//! exactly one outcome (created, updated, deleted or failed) and advances the
//! job's progress. Row problems become [`JobError`]s; only a store failure
//! stops the job.
//!
//! A franchise-scoped job never writes the global product row: it only
//! stocks existing catalog products in its own franchise.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    BatchImportRequest, JobError, JobStatus, MAX_BATCH_ROWS, Product, ProductDraft,
    ProductImportItem, ProductStatus,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::job_store::{Counter, JobStore};
use super::store::{CatalogStore, StoreError};
use super::validate::validate_item;
use crate::media::{ImageIngestor, IngestError};

/// Whose catalog a batch writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportScope {
    /// Admin: global products, overlays for any listed franchise
    Global,
    /// Franchise member: overlays of this franchise only
    Franchise(Uuid),
}

impl ImportScope {
    /// Owning franchise, recorded on the job
    pub fn franchise_id(&self) -> Option<Uuid> {
        match self {
            ImportScope::Global => None,
            ImportScope::Franchise(id) => Some(*id),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ImportError {
    #[error("batch contains no products")]
    Empty,

    #[error("batch contains {0} products, the limit is {MAX_BATCH_ROWS}")]
    TooLarge(usize),
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        let code = match err {
            ImportError::Empty => ErrorCode::BatchEmpty,
            ImportError::TooLarge(_) => ErrorCode::BatchTooLarge,
        };
        AppError::with_message(code, err.to_string())
    }
}

#[derive(Clone)]
pub struct BatchImporter {
    store: Arc<dyn CatalogStore>,
    ingestor: ImageIngestor,
    jobs: JobStore,
}

impl BatchImporter {
    pub fn new(store: Arc<dyn CatalogStore>, ingestor: ImageIngestor, jobs: JobStore) -> Self {
        Self {
            store,
            ingestor,
            jobs,
        }
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    /// Register a job and start it in the background
    pub async fn submit(
        &self,
        request: BatchImportRequest,
        scope: ImportScope,
    ) -> Result<Uuid, ImportError> {
        let rows = request.products.len();
        if rows == 0 {
            return Err(ImportError::Empty);
        }
        if rows > MAX_BATCH_ROWS {
            return Err(ImportError::TooLarge(rows));
        }

        let job_id = self.jobs.create(rows, scope.franchise_id()).await;
        tracing::info!(job_id = %job_id, rows, delete_missing = request.delete_missing, ?scope, "Batch import accepted");

        let importer = self.clone();
        tokio::spawn(async move {
            importer.run(job_id, request, scope).await;
        });
        Ok(job_id)
    }

    /// Execute a registered job to completion
    pub async fn run(&self, job_id: Uuid, request: BatchImportRequest, scope: ImportScope) {
        match self.execute(job_id, &request, scope).await {
            Ok(()) => {
                self.jobs.complete(job_id, JobStatus::Completed).await;
                if let Some(job) = self.jobs.get(job_id).await {
                    tracing::info!(
                        job_id = %job_id,
                        created = job.created,
                        updated = job.updated,
                        deleted = job.deleted,
                        failed = job.failed,
                        "Batch import completed"
                    );
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Batch import failed");
                self.jobs
                    .push_error(job_id, JobError::field(0, "", "store", e.to_string()))
                    .await;
                self.jobs.complete(job_id, JobStatus::Failed).await;
            }
        }
    }

    async fn execute(
        &self,
        job_id: Uuid,
        request: &BatchImportRequest,
        scope: ImportScope,
    ) -> Result<(), StoreError> {
        let categories = self.store.category_ids().await?;
        let candidates = if request.delete_missing {
            self.missing_candidates(&request.products, scope).await?
        } else {
            Vec::new()
        };
        self.jobs.set_processing(job_id, candidates.len()).await;

        for (i, item) in request.products.iter().enumerate() {
            let row = i + 1;
            let outcome = match self.process_row(job_id, row, item, &categories, scope).await {
                Ok(counter) => counter,
                Err(StoreError::Row { field, message }) => {
                    self.jobs
                        .push_error(job_id, JobError::field(row, item.item_name.trim(), field, message))
                        .await;
                    Counter::Failed
                }
                Err(fatal) => return Err(fatal),
            };
            self.jobs.increment(job_id, outcome).await;
        }

        for (product_id, sku) in candidates {
            match self.remove(product_id, scope).await {
                Ok(()) => self.jobs.increment(job_id, Counter::Deleted).await,
                Err(StoreError::Row { field, message }) => {
                    self.jobs
                        .push_error(job_id, JobError::field(0, sku, field, message))
                        .await;
                    self.jobs.increment(job_id, Counter::Failed).await;
                }
                Err(fatal) => return Err(fatal),
            }
        }
        Ok(())
    }

    async fn process_row(
        &self,
        job_id: Uuid,
        row: usize,
        item: &ProductImportItem,
        categories: &HashSet<Uuid>,
        scope: ImportScope,
    ) -> Result<Counter, StoreError> {
        let existing = self.resolve_existing(item).await?;

        if item.delete == Some(true) {
            let product = existing.ok_or_else(|| StoreError::row("id", "product not found"))?;
            self.remove(product.id, scope).await?;
            return Ok(Counter::Deleted);
        }

        let mut draft = match validate_item(item, categories) {
            Ok(draft) => draft,
            Err(fields) => {
                self.jobs
                    .push_error(
                        job_id,
                        JobError {
                            row,
                            product_name: item.item_name.trim().to_string(),
                            fields,
                        },
                    )
                    .await;
                return Ok(Counter::Failed);
            }
        };

        let franchises = target_franchises(item, scope)?;

        let (product_id, product_name, counter) = match scope {
            ImportScope::Global => {
                let (id, counter) = self.write_global(existing.as_ref(), &mut draft).await?;
                (id, draft.name.clone(), counter)
            }
            // franchise rows only stock catalog products; the global row is left alone
            ImportScope::Franchise(_) => {
                let product = existing
                    .ok_or_else(|| StoreError::row("sku", "product is not in the catalog"))?;
                (product.id, product.name, Counter::Updated)
            }
        };

        let available = draft.status == ProductStatus::Active;
        let mut overlay_failed = false;
        for franchise_id in franchises {
            match self
                .store
                .upsert_franchise_stock(franchise_id, product_id, draft.stock_quantity, available)
                .await
            {
                Ok(()) => {}
                Err(StoreError::Row { field, message }) => {
                    overlay_failed = true;
                    self.jobs
                        .push_error(
                            job_id,
                            JobError::field(row, &product_name, field, format!("{franchise_id}: {message}")),
                        )
                        .await;
                }
                Err(fatal) => return Err(fatal),
            }
        }

        if item.images_provided == Some(true) {
            match scope {
                ImportScope::Global => {
                    let urls = item.image_urls.as_deref().unwrap_or_default();
                    self.sync_images(job_id, row, &product_name, product_id, urls)
                        .await?;
                }
                ImportScope::Franchise(_) => {
                    self.jobs
                        .push_error(
                            job_id,
                            JobError::field(
                                row,
                                &product_name,
                                "image_urls",
                                "catalog images are managed by an admin",
                            ),
                        )
                        .await;
                }
            }
        }

        if overlay_failed {
            return Ok(Counter::Failed);
        }
        Ok(counter)
    }

    /// Update the matched catalog product or create a new one
    async fn write_global(
        &self,
        existing: Option<&Product>,
        draft: &mut ProductDraft,
    ) -> Result<(Uuid, Counter), StoreError> {
        match existing {
            Some(product) => {
                if draft.sku.is_empty() {
                    draft.sku = product.sku.clone();
                }
                self.store.update(product.id, draft).await?;
                Ok((product.id, Counter::Updated))
            }
            None => {
                let id = Uuid::new_v4();
                if draft.sku.is_empty() {
                    draft.sku = generated_sku(id);
                }
                self.store.create(id, draft).await?;
                Ok((id, Counter::Created))
            }
        }
    }

    /// Explicit id first, then trimmed sku
    async fn resolve_existing(
        &self,
        item: &ProductImportItem,
    ) -> Result<Option<Product>, StoreError> {
        if let Some(id) = item.id
            && let Some(product) = self.store.find_by_id(id).await?
        {
            return Ok(Some(product));
        }
        match item.sku.as_deref().map(str::trim) {
            Some(sku) if !sku.is_empty() => self.store.find_by_sku(sku).await,
            _ => Ok(None),
        }
    }

    /// Ingest each URL, then make the stored set the product's image list
    async fn sync_images(
        &self,
        job_id: Uuid,
        row: usize,
        product_name: &str,
        product_id: Uuid,
        urls: &[String],
    ) -> Result<(), StoreError> {
        let mut stored = Vec::with_capacity(urls.len());
        for url in urls {
            match self.ingestor.ingest_product_image(product_id, url).await {
                Ok(public_url) => stored.push(public_url),
                Err(e) => {
                    tracing::warn!(product_id = %product_id, url = %url, error = %e, "Image ingestion failed");
                    self.jobs
                        .push_error(
                            job_id,
                            JobError::field(row, product_name, "image_urls", e.to_string()),
                        )
                        .await;
                }
            }
        }

        // all fetches failed: keep whatever the product had
        if stored.is_empty() && !urls.is_empty() {
            return Ok(());
        }

        let previous = self.store.replace_images(product_id, &stored).await?;
        for url in previous.iter().filter(|u| !stored.contains(u)) {
            self.discard_image(url).await?;
        }
        Ok(())
    }

    /// Remove a product from the scope's catalog
    async fn remove(&self, product_id: Uuid, scope: ImportScope) -> Result<(), StoreError> {
        match scope {
            ImportScope::Global => self.safe_delete(product_id).await,
            ImportScope::Franchise(franchise_id) => {
                if self
                    .store
                    .remove_from_franchise(franchise_id, product_id)
                    .await?
                {
                    Ok(())
                } else {
                    Err(StoreError::row("id", "product is not stocked by this franchise"))
                }
            }
        }
    }

    /// Hard delete unless an order line references the product
    pub async fn safe_delete(&self, product_id: Uuid) -> Result<(), StoreError> {
        let refs = self.store.order_references(product_id).await?;
        if refs > 0 {
            return Err(StoreError::row(
                "product_id",
                format!("referenced by {refs} orders"),
            ));
        }
        let images = self.store.delete(product_id).await?;
        for url in &images {
            self.discard_image(url).await?;
        }
        tracing::info!(product_id = %product_id, "Product deleted");
        Ok(())
    }

    /// Delete a stored image unless an order snapshot still shows it
    async fn discard_image(&self, url: &str) -> Result<(), StoreError> {
        if self.store.image_referenced(url).await? {
            tracing::debug!(url = %url, "Image kept, referenced by an order");
            return Ok(());
        }
        match self.ingestor.delete(url).await {
            Ok(()) => {}
            Err(IngestError::ForeignObject(_)) => {
                tracing::debug!(url = %url, "Image not in our bucket, left alone");
            }
            Err(e) => tracing::warn!(url = %url, error = %e, "Failed to delete image"),
        }
        Ok(())
    }

    /// Existing products whose id and sku are both absent from the request
    async fn missing_candidates(
        &self,
        items: &[ProductImportItem],
        scope: ImportScope,
    ) -> Result<Vec<(Uuid, String)>, StoreError> {
        let ids: HashSet<Uuid> = items.iter().filter_map(|i| i.id).collect();
        let skus: HashSet<&str> = items
            .iter()
            .filter_map(|i| i.sku.as_deref().map(str::trim))
            .filter(|s| !s.is_empty())
            .collect();

        let keys = match scope {
            ImportScope::Global => self.store.product_keys().await?,
            ImportScope::Franchise(franchise_id) => self.store.franchise_keys(franchise_id).await?,
        };
        Ok(keys
            .into_iter()
            .filter(|(id, sku)| !ids.contains(id) && !skus.contains(sku.as_str()))
            .collect())
    }
}

/// Franchises whose overlay a row writes
fn target_franchises(item: &ProductImportItem, scope: ImportScope) -> Result<Vec<Uuid>, StoreError> {
    let listed = item.franchise_ids.clone().unwrap_or_default();
    match scope {
        ImportScope::Global => Ok(listed),
        ImportScope::Franchise(own) => {
            if let Some(other) = listed.iter().find(|id| **id != own) {
                return Err(StoreError::row(
                    "franchise_ids",
                    format!("not permitted to manage franchise {other}"),
                ));
            }
            Ok(vec![own])
        }
    }
}

/// Placeholder sku for products created without one
pub fn generated_sku(id: Uuid) -> String {
    let simple = id.simple().to_string().to_uppercase();
    format!("SKU-{}", &simple[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ssrf::tests::StaticResolver;
    use crate::media::storage::tests::memory_storage;
    use crate::media::storage::ObjectStorage;
    use async_trait::async_trait;
    use bytes::Bytes;
    use object_store::ObjectStore;
    use object_store::memory::InMemory;
    use rust_decimal::Decimal;
    use shared::models::{ProductDraft, ProductImage};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryCatalog {
        categories: HashSet<Uuid>,
        products: Mutex<HashMap<Uuid, Product>>,
        order_refs: Mutex<HashMap<Uuid, i64>>,
        snapshot_urls: Mutex<HashSet<String>>,
        overlays: Mutex<HashMap<(Uuid, Uuid), (i32, bool)>>,
        franchises: HashSet<Uuid>,
        down: bool,
    }

    impl MemoryCatalog {
        fn check(&self) -> Result<(), StoreError> {
            if self.down {
                Err(StoreError::Unavailable("connection refused".into()))
            } else {
                Ok(())
            }
        }

        fn seed(&self, sku: &str) -> Uuid {
            let id = Uuid::new_v4();
            let draft = draft(sku, self.categories.iter().next().copied().unwrap_or_default());
            self.products
                .lock()
                .unwrap()
                .insert(id, to_product(id, &draft));
            id
        }
    }

    fn to_product(id: Uuid, d: &ProductDraft) -> Product {
        Product {
            id,
            sku: d.sku.clone(),
            name: d.name.clone(),
            description: d.description.clone(),
            cost_price: d.cost_price,
            retail_price: d.retail_price,
            promotion_price: d.promotion_price,
            promotion_start: d.promotion_start,
            promotion_end: d.promotion_end,
            stock_quantity: d.stock_quantity,
            reorder_level: d.reorder_level,
            category_id: d.category_id,
            subcategory_id: d.subcategory_id,
            is_vegan: d.is_vegan,
            is_gluten_free: d.is_gluten_free,
            is_age_restricted: d.is_age_restricted,
            minimum_age: d.minimum_age,
            status: d.status,
            online_visible: d.online_visible,
            barcode: d.barcode.clone(),
            images: Vec::new(),
        }
    }

    fn draft(sku: &str, category_id: Uuid) -> ProductDraft {
        ProductDraft {
            sku: sku.into(),
            name: format!("Seeded {sku}"),
            description: None,
            cost_price: Decimal::ONE,
            retail_price: Decimal::TWO,
            promotion_price: None,
            promotion_start: None,
            promotion_end: None,
            stock_quantity: 5,
            reorder_level: 0,
            category_id,
            subcategory_id: None,
            is_vegan: false,
            is_gluten_free: false,
            is_age_restricted: false,
            minimum_age: None,
            status: ProductStatus::Active,
            online_visible: true,
            barcode: None,
        }
    }

    #[async_trait]
    impl CatalogStore for MemoryCatalog {
        async fn category_ids(&self) -> Result<HashSet<Uuid>, StoreError> {
            self.check()?;
            Ok(self.categories.clone())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
            self.check()?;
            Ok(self.products.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
            self.check()?;
            Ok(self
                .products
                .lock()
                .unwrap()
                .values()
                .find(|p| p.sku == sku)
                .cloned())
        }

        async fn create(&self, id: Uuid, d: &ProductDraft) -> Result<(), StoreError> {
            let mut products = self.products.lock().unwrap();
            if products.values().any(|p| p.sku == d.sku) {
                return Err(StoreError::row("sku", "sku already exists"));
            }
            products.insert(id, to_product(id, d));
            Ok(())
        }

        async fn update(&self, id: Uuid, d: &ProductDraft) -> Result<(), StoreError> {
            let mut products = self.products.lock().unwrap();
            let images = products
                .get(&id)
                .map(|p| p.images.clone())
                .ok_or_else(|| StoreError::row("id", "product not found"))?;
            let mut product = to_product(id, d);
            product.images = images;
            products.insert(id, product);
            Ok(())
        }

        async fn order_references(&self, id: Uuid) -> Result<i64, StoreError> {
            Ok(self.order_refs.lock().unwrap().get(&id).copied().unwrap_or(0))
        }

        async fn delete(&self, id: Uuid) -> Result<Vec<String>, StoreError> {
            let removed = self
                .products
                .lock()
                .unwrap()
                .remove(&id)
                .ok_or_else(|| StoreError::row("id", "product not found"))?;
            self.overlays.lock().unwrap().retain(|(_, pid), _| *pid != id);
            Ok(removed.images.into_iter().map(|i| i.url).collect())
        }

        async fn replace_images(&self, id: Uuid, urls: &[String]) -> Result<Vec<String>, StoreError> {
            let mut products = self.products.lock().unwrap();
            let product = products
                .get_mut(&id)
                .ok_or_else(|| StoreError::row("id", "product not found"))?;
            let previous = product.images.iter().map(|i| i.url.clone()).collect();
            product.images = urls
                .iter()
                .enumerate()
                .map(|(i, url)| ProductImage {
                    id: Uuid::new_v4(),
                    product_id: id,
                    url: url.clone(),
                    is_primary: i == 0,
                    sort_order: i as i32,
                })
                .collect();
            Ok(previous)
        }

        async fn image_referenced(&self, url: &str) -> Result<bool, StoreError> {
            Ok(self.snapshot_urls.lock().unwrap().contains(url))
        }

        async fn product_keys(&self) -> Result<Vec<(Uuid, String)>, StoreError> {
            self.check()?;
            Ok(self
                .products
                .lock()
                .unwrap()
                .values()
                .map(|p| (p.id, p.sku.clone()))
                .collect())
        }

        async fn upsert_franchise_stock(
            &self,
            franchise_id: Uuid,
            product_id: Uuid,
            stock: i32,
            available: bool,
        ) -> Result<(), StoreError> {
            if !self.franchises.contains(&franchise_id) {
                return Err(StoreError::row("franchise_ids", "unknown franchise"));
            }
            self.overlays
                .lock()
                .unwrap()
                .insert((franchise_id, product_id), (stock, available));
            Ok(())
        }

        async fn franchise_keys(&self, franchise_id: Uuid) -> Result<Vec<(Uuid, String)>, StoreError> {
            let overlays = self.overlays.lock().unwrap();
            let products = self.products.lock().unwrap();
            Ok(overlays
                .keys()
                .filter(|(fid, _)| *fid == franchise_id)
                .filter_map(|(_, pid)| products.get(pid).map(|p| (p.id, p.sku.clone())))
                .collect())
        }

        async fn remove_from_franchise(
            &self,
            franchise_id: Uuid,
            product_id: Uuid,
        ) -> Result<bool, StoreError> {
            Ok(self
                .overlays
                .lock()
                .unwrap()
                .remove(&(franchise_id, product_id))
                .is_some())
        }
    }

    const CATEGORY: Uuid = Uuid::from_u128(1);
    const FRANCHISE: Uuid = Uuid::from_u128(100);

    fn catalog() -> MemoryCatalog {
        MemoryCatalog {
            categories: HashSet::from([CATEGORY]),
            franchises: HashSet::from([FRANCHISE]),
            ..Default::default()
        }
    }

    fn importer(store: Arc<MemoryCatalog>) -> (BatchImporter, Arc<InMemory>) {
        let (bucket, storage) = memory_storage();
        let resolver = StaticResolver::with(&[("intranet.example.com", &["192.168.0.10"])]);
        let ingestor = ImageIngestor::new(Arc::new(resolver), Arc::new(storage));
        (
            BatchImporter::new(store, ingestor, JobStore::new()),
            bucket,
        )
    }

    fn row(name: &str, sku: &str) -> ProductImportItem {
        ProductImportItem {
            item_name: name.into(),
            sku: Some(sku.into()),
            cost_price: Decimal::new(100, 2),
            retail_price: Decimal::new(250, 2),
            stock_quantity: 12,
            category_id: Some(CATEGORY),
            ..Default::default()
        }
    }

    async fn run(
        importer: &BatchImporter,
        products: Vec<ProductImportItem>,
        delete_missing: bool,
        scope: ImportScope,
    ) -> shared::models::BatchJob {
        let job_id = importer.jobs().create(products.len(), scope.franchise_id()).await;
        importer
            .run(
                job_id,
                BatchImportRequest {
                    products,
                    delete_missing,
                },
                scope,
            )
            .await;
        importer.jobs().get(job_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_two_created_one_updated() {
        let store = Arc::new(catalog());
        let existing = store.seed("MILK-1");
        let (importer, _) = importer(store.clone());

        let job = run(
            &importer,
            vec![row("Bread", "BREAD-1"), row("Eggs", "EGGS-1"), row("Milk", " MILK-1 ")],
            false,
            ImportScope::Global,
        )
        .await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!((job.created, job.updated, job.failed), (2, 1, 0));
        assert_eq!(job.processed, 3);
        assert_eq!(job.progress, 100);
        assert!(job.errors.is_empty());

        let products = store.products.lock().unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[&existing].name, "Milk");
    }

    #[tokio::test]
    async fn test_invalid_rows_are_recorded_not_fatal() {
        let store = Arc::new(catalog());
        let (importer, _) = importer(store.clone());

        let mut bad = row("", "BAD-1");
        bad.retail_price = Decimal::ZERO;
        let job = run(
            &importer,
            vec![row("Bread", "BREAD-1"), bad],
            false,
            ImportScope::Global,
        )
        .await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!((job.created, job.failed), (1, 1));
        let err = &job.errors[0];
        assert_eq!(err.row, 2);
        assert_eq!(err.fields["item_name"], "item_name is required");
        assert_eq!(err.fields["retail_price"], "retail_price must be at least 0.01");
    }

    #[tokio::test]
    async fn test_ssrf_rejection_recorded_while_row_succeeds() {
        let store = Arc::new(catalog());
        let (importer, bucket) = importer(store.clone());

        let mut item = row("Cheese", "CHEESE-1");
        item.images_provided = Some(true);
        item.image_urls = Some(vec![
            "http://intranet.example.com/cheese.jpg".into(),
            "http://169.254.169.254/latest/meta-data".into(),
        ]);
        let job = run(&importer, vec![item], false, ImportScope::Global).await;

        assert_eq!(job.created, 1);
        assert_eq!(job.failed, 0);
        assert_eq!(job.errors.len(), 2);
        for err in &job.errors {
            assert_eq!(err.row, 1);
            assert!(err.fields["image_urls"].contains("reserved address"));
        }
        let listed: Vec<_> = futures::StreamExt::collect(bucket.list(None)).await;
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_image_list_clears_and_discards_unreferenced() {
        let store = Arc::new(catalog());
        let id = store.seed("TEA-1");
        let (importer, bucket) = importer(store.clone());

        let storage = crate::media::storage::BucketStorage::new(
            bucket.clone(),
            crate::media::storage::tests::location(),
        );
        storage
            .put("products/old_1.jpg", Bytes::from_static(b"1"), "image/jpeg")
            .await
            .unwrap();
        storage
            .put("products/old_2.jpg", Bytes::from_static(b"2"), "image/jpeg")
            .await
            .unwrap();
        let old_1 = storage.location().public_url("products/old_1.jpg");
        let old_2 = storage.location().public_url("products/old_2.jpg");
        store
            .replace_images(id, &[old_1.clone(), old_2.clone()])
            .await
            .unwrap();
        store.snapshot_urls.lock().unwrap().insert(old_2.clone());

        let mut item = row("Tea", "TEA-1");
        item.images_provided = Some(true);
        item.image_urls = Some(Vec::new());
        let job = run(&importer, vec![item], false, ImportScope::Global).await;
        assert_eq!(job.updated, 1);

        assert!(store.products.lock().unwrap()[&id].images.is_empty());
        let path = |p: &str| object_store::path::Path::from(p);
        assert!(bucket.head(&path("products/old_1.jpg")).await.is_err());
        assert!(bucket.head(&path("products/old_2.jpg")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_respects_order_references() {
        let store = Arc::new(catalog());
        let kept = store.seed("KEEP-1");
        let unused = store.seed("OLD-1");
        let referenced = store.seed("OLD-2");
        store.order_refs.lock().unwrap().insert(referenced, 2);
        let (importer, _) = importer(store.clone());

        let job = run(
            &importer,
            vec![row("Keep", "KEEP-1")],
            true,
            ImportScope::Global,
        )
        .await;

        assert_eq!(job.total, 3);
        assert_eq!(job.processed, 3);
        assert_eq!((job.updated, job.deleted, job.failed), (1, 1, 1));
        assert_eq!(job.errors[0].fields["product_id"], "referenced by 2 orders");
        assert_eq!(job.errors[0].product_name, "OLD-2");

        let products = store.products.lock().unwrap();
        assert!(products.contains_key(&kept));
        assert!(!products.contains_key(&unused));
        assert!(products.contains_key(&referenced));
    }

    #[tokio::test]
    async fn test_delete_flag_routes_to_safe_delete() {
        let store = Arc::new(catalog());
        let gone = store.seed("GONE-1");
        let (importer, _) = importer(store.clone());

        let job = run(
            &importer,
            vec![
                ProductImportItem {
                    id: Some(gone),
                    delete: Some(true),
                    ..Default::default()
                },
                ProductImportItem {
                    sku: Some("NOPE".into()),
                    delete: Some(true),
                    ..Default::default()
                },
            ],
            false,
            ImportScope::Global,
        )
        .await;

        assert_eq!((job.deleted, job.failed), (1, 1));
        assert_eq!(job.errors[0].fields["id"], "product not found");
        assert!(store.products.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_franchise_scope_writes_only_own_overlay() {
        let store = Arc::new(catalog());
        let honey = store.seed("HONEY-1");
        store.seed("JAM-1");
        let (importer, _) = importer(store.clone());

        let mut foreign = row("Jam", "JAM-1");
        foreign.franchise_ids = Some(vec![Uuid::from_u128(999)]);
        let job = run(
            &importer,
            vec![row("Honey", "HONEY-1"), foreign, row("Brand new", "NEW-1")],
            false,
            ImportScope::Franchise(FRANCHISE),
        )
        .await;

        assert_eq!(job.franchise_id, Some(FRANCHISE));
        assert_eq!((job.created, job.updated, job.failed), (0, 1, 2));
        assert!(job.errors[0].fields["franchise_ids"].contains("not permitted"));
        assert_eq!(job.errors[1].fields["sku"], "product is not in the catalog");
        assert_eq!(store.products.lock().unwrap().len(), 2);

        let overlays = store.overlays.lock().unwrap();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[&(FRANCHISE, honey)], (12, true));
    }

    #[tokio::test]
    async fn test_franchise_scope_leaves_global_product_untouched() {
        let store = Arc::new(catalog());
        let milk = store.seed("MILK-1");
        let before = store.products.lock().unwrap()[&milk].clone();
        let (importer, bucket) = importer(store.clone());

        let mut item = row("Renamed milk", "MILK-1");
        item.retail_price = Decimal::new(99900, 2);
        item.status = Some(ProductStatus::Inactive);
        item.stock_quantity = 3;
        item.images_provided = Some(true);
        item.image_urls = Some(Vec::new());
        let job = run(&importer, vec![item], false, ImportScope::Franchise(FRANCHISE)).await;

        assert_eq!((job.updated, job.failed), (1, 0));
        assert_eq!(job.errors[0].fields["image_urls"], "catalog images are managed by an admin");
        let after = store.products.lock().unwrap()[&milk].clone();
        assert_eq!(
            (after.name.as_str(), after.retail_price, after.status, after.stock_quantity),
            (before.name.as_str(), before.retail_price, before.status, before.stock_quantity)
        );
        assert_eq!(after.name, "Seeded MILK-1");
        assert_eq!(store.overlays.lock().unwrap()[&(FRANCHISE, milk)], (3, false));
        let listed: Vec<_> = futures::StreamExt::collect(bucket.list(None)).await;
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_franchise_fails_global_row() {
        let store = Arc::new(catalog());
        let (importer, _) = importer(store.clone());

        let unknown = Uuid::from_u128(404);
        let mut item = row("Butter", "BUTTER-1");
        item.franchise_ids = Some(vec![FRANCHISE, unknown]);
        let job = run(&importer, vec![item], false, ImportScope::Global).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!((job.created, job.failed, job.processed), (0, 1, 1));
        assert_eq!(job.errors.len(), 1);
        assert_eq!(
            job.errors[0].fields["franchise_ids"],
            format!("{unknown}: unknown franchise")
        );
        // the catalog write and the valid overlay stay committed
        assert_eq!(store.products.lock().unwrap().len(), 1);
        assert_eq!(store.overlays.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_fails_job() {
        let store = Arc::new(MemoryCatalog {
            down: true,
            ..catalog()
        });
        let (importer, _) = importer(store);

        let job = run(&importer, vec![row("Bread", "B")], false, ImportScope::Global).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
        assert_eq!(job.errors[0].fields["store"], "catalog store unavailable: connection refused");
    }

    #[tokio::test]
    async fn test_submit_limits_and_background_run() {
        let store = Arc::new(catalog());
        let (importer, _) = importer(store.clone());

        let empty = BatchImportRequest {
            products: Vec::new(),
            delete_missing: false,
        };
        assert_eq!(
            importer.submit(empty, ImportScope::Global).await,
            Err(ImportError::Empty)
        );

        let huge = BatchImportRequest {
            products: vec![ProductImportItem::default(); MAX_BATCH_ROWS + 1],
            delete_missing: false,
        };
        assert_eq!(
            importer.submit(huge, ImportScope::Global).await,
            Err(ImportError::TooLarge(MAX_BATCH_ROWS + 1))
        );

        let job_id = importer
            .submit(
                BatchImportRequest {
                    products: vec![row("Bread", "B-1")],
                    delete_missing: false,
                },
                ImportScope::Global,
            )
            .await
            .unwrap();

        let mut job = importer.jobs().get(job_id).await.unwrap();
        for _ in 0..200 {
            if job.status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            job = importer.jobs().get(job_id).await.unwrap();
        }
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.created, 1);
    }

    #[test]
    fn test_generated_sku_shape() {
        let sku = generated_sku(Uuid::from_u128(0xabcdef12_0000_0000_0000_000000000000));
        assert_eq!(sku, "SKU-ABCDEF12");
    }
}
