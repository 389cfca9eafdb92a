//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use catalog_indexer::catalog::{CatalogServices, CatalogSnapshot};
use catalog_indexer::config::{paths, StaticConfigStore};
use catalog_indexer::indexer::{IndexerKind, IndexingDriver};
use catalog_indexer::processor::{DirectiveFilter, HookRegistry};
use catalog_indexer_repository::{
    BatchOperationResult, BatchOperationSummary, CollectionSchema, IndexConfig, SearchIndexError,
    SearchIndexProvider,
};
use catalog_indexer_shared::{
    AttributeMetadata, Category, EntityId, FrontendInput, ProductDocument, ProductEntity,
    ProductType, StockRecord, StoreId,
};

pub const STORE: StoreId = 1;
pub const BASE_URL: &str = "https://shop.test/";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// Enabled store 1 with code `default`, categories rooted at 2.
pub fn store_config() -> StaticConfigStore {
    StaticConfigStore::new()
        .with(0, paths::PRODUCTS_ENABLED, "1")
        .with(0, paths::BASE_URL, BASE_URL)
        .with(0, paths::CATEGORIES_ROOT_ID, "2")
        .with(STORE, paths::STORE_CODE, "default")
}

pub fn product(id: EntityId, type_id: ProductType) -> ProductEntity {
    let mut product = ProductEntity::new(id, format!("SKU-{}", id), type_id);
    product.name = Some(format!("Product {}", id));
    product.url_key = Some(format!("product-{}", id));
    product.price.regular_price = 10.0 * id as f64;
    product
}

pub fn in_stock(sku: &str) -> StockRecord {
    StockRecord {
        sku: sku.to_string(),
        is_salable: true,
        quantity: 100.0,
        min_qty: 0.0,
        is_in_stock: true,
        max_sale_qty: Some(10000.0),
        stock_qty: Some(100.0),
    }
}

pub fn category(id: u32, name: &str, path: &[u32]) -> Category {
    Category {
        id,
        name: Some(name.to_string()),
        path: path.to_vec(),
        include_in_menu: true,
        is_active: true,
    }
}

pub fn text_attribute(attribute_id: u32, code: &str, label: &str) -> AttributeMetadata {
    AttributeMetadata {
        attribute_id,
        code: code.to_string(),
        frontend_input: FrontendInput::Text,
        default_label: Some(label.to_string()),
        store_labels: BTreeMap::new(),
        position: 0,
        options: Vec::new(),
    }
}

/// Catalog, store configuration and hooks of one test.
pub struct Fixture {
    pub snapshot: CatalogSnapshot,
    pub config: StaticConfigStore,
    pub hooks: HookRegistry,
}

impl Fixture {
    pub fn new() -> Self {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.add_category(category(2, "Default Category", &[1, 2]));
        snapshot.add_category(category(3, "Shirts", &[1, 2, 3]));
        Self {
            snapshot,
            config: store_config(),
            hooks: HookRegistry::new(),
        }
    }

    /// Add a product with an in-stock record for its SKU.
    pub fn stocked(&mut self, product: ProductEntity) -> &mut Self {
        self.snapshot.add_stock(in_stock(&product.sku));
        self.snapshot.add_product(product);
        self
    }

    pub fn set(&mut self, scope: StoreId, path: &str, value: &str) -> &mut Self {
        self.config.set(scope, path, value);
        self
    }

    pub fn services(&self) -> CatalogServices {
        self.snapshot.clone().with_today(today()).into_services(
            Arc::new(self.config.clone()),
            Arc::new(DirectiveFilter::new(BASE_URL)),
        )
    }

    pub fn driver(&self, kind: IndexerKind) -> IndexingDriver {
        IndexingDriver::with_hooks(
            kind,
            self.services(),
            IndexConfig::new("catalog_"),
            self.hooks.clone(),
        )
    }
}

pub fn ids(documents: &[ProductDocument]) -> Vec<EntityId> {
    documents.iter().filter_map(ProductDocument::entity_id).collect()
}

/// Search provider recording what it receives.
#[derive(Default)]
pub struct MockSearchProvider {
    pub ensured: Mutex<Vec<CollectionSchema>>,
    pub upserted: Mutex<Vec<(String, ProductDocument)>>,
    pub deleted: Mutex<Vec<(String, EntityId)>>,
    pub upsert_calls: AtomicUsize,
}

impl MockSearchProvider {
    pub fn upserted_ids(&self, collection: &str) -> Vec<EntityId> {
        self.upserted
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == collection)
            .filter_map(|(_, document)| document.entity_id())
            .collect()
    }

    pub fn deleted_ids(&self, collection: &str) -> Vec<EntityId> {
        self.deleted
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == collection)
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn upsert_count(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), SearchIndexError> {
        self.ensured.lock().unwrap().push(schema.clone());
        Ok(())
    }

    async fn upsert_documents(
        &self,
        collection: &str,
        documents: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut upserted = self.upserted.lock().unwrap();
        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            upserted.push((collection.to_string(), document.clone()));
            results.push(BatchOperationResult::ok(
                document.document_id().unwrap_or_default(),
            ));
        }
        Ok(BatchOperationSummary::from_results(results))
    }

    async fn delete_documents(
        &self,
        collection: &str,
        ids: &[EntityId],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut deleted = self.deleted.lock().unwrap();
        for id in ids {
            deleted.push((collection.to_string(), *id));
        }
        Ok(BatchOperationSummary::from_results(
            ids.iter().map(|id| BatchOperationResult::ok(id.to_string())).collect(),
        ))
    }
}
