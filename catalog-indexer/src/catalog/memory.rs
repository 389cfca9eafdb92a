//! In-memory catalog loaded from a JSON export.
//!
//! `CatalogSnapshot` implements every collaborator contract so the indexer can run
//! without a live catalog database.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use catalog_indexer_shared::{
    AttributeMetadata, Category, ConfigurableOption, EntityId, MediaEntry, ProductEntity,
    ProductStatus, ProductType, StockRecord, StoreId,
};

use super::{
    CatalogError, CatalogServices, CatalogStore, CompositeType, ContentFilter, MediaSource,
    PriceProvider, PricingEngine, ProductFilter, StockStore, PRODUCT_ENTITY_TYPE,
};
use crate::config::ConfigStore;

const DEFAULT_STOCK_ID: u32 = 1;
const DEFAULT_CURRENCY: &str = "USD";

/// Reservation entry; quantities are negative for placed orders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reservation {
    pub sku: String,
    #[serde(default = "default_stock_id")]
    pub stock_id: u32,
    pub quantity: f64,
}

fn default_stock_id() -> u32 {
    DEFAULT_STOCK_ID
}

/// A full catalog export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    products: Vec<ProductEntity>,
    /// Stores a product is assigned to. Products without an entry belong to every store.
    #[serde(default)]
    product_stores: BTreeMap<EntityId, Vec<StoreId>>,
    #[serde(default)]
    attributes: Vec<AttributeMetadata>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    configurable_links: BTreeMap<EntityId, Vec<EntityId>>,
    #[serde(default)]
    configurable_options: BTreeMap<EntityId, Vec<ConfigurableOption>>,
    /// Bundle options, each a list of selected products.
    #[serde(default)]
    bundle_options: BTreeMap<EntityId, Vec<Vec<EntityId>>>,
    #[serde(default)]
    grouped_links: BTreeMap<EntityId, Vec<EntityId>>,
    #[serde(default)]
    stock: Vec<StockRecord>,
    #[serde(default)]
    reservations: Vec<Reservation>,
    /// Stock channel per store's website.
    #[serde(default)]
    store_stock_ids: BTreeMap<StoreId, u32>,
    #[serde(default)]
    media: BTreeMap<EntityId, Vec<MediaEntry>>,
    #[serde(default)]
    currencies: BTreeMap<StoreId, String>,
    #[serde(skip)]
    today: Option<NaiveDate>,
    #[serde(skip)]
    by_id: HashMap<EntityId, usize>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let mut snapshot: Self =
            serde_json::from_str(raw).map_err(|e| CatalogError::invalid_data(e.to_string()))?;
        snapshot.reindex();
        Ok(snapshot)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::unavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let snapshot = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            products = snapshot.products.len(),
            categories = snapshot.categories.len(),
            attributes = snapshot.attributes.len(),
            "Loaded catalog snapshot"
        );
        Ok(snapshot)
    }

    /// Fix the date used for special price windows.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn add_product(&mut self, product: ProductEntity) {
        match self.by_id.get(&product.entity_id) {
            Some(&position) => self.products[position] = product,
            None => {
                self.by_id.insert(product.entity_id, self.products.len());
                self.products.push(product);
            }
        }
    }

    pub fn assign_stores(&mut self, product_id: EntityId, stores: Vec<StoreId>) {
        self.product_stores.insert(product_id, stores);
    }

    pub fn add_attribute(&mut self, attribute: AttributeMetadata) {
        self.attributes.push(attribute);
    }

    pub fn add_category(&mut self, category: Category) {
        self.categories.push(category);
    }

    pub fn link_configurable(&mut self, parent_id: EntityId, children: Vec<EntityId>) {
        self.configurable_links.insert(parent_id, children);
    }

    pub fn set_configurable_options(&mut self, parent_id: EntityId, options: Vec<ConfigurableOption>) {
        self.configurable_options.insert(parent_id, options);
    }

    pub fn add_bundle_option(&mut self, parent_id: EntityId, selections: Vec<EntityId>) {
        self.bundle_options.entry(parent_id).or_default().push(selections);
    }

    pub fn link_grouped(&mut self, parent_id: EntityId, children: Vec<EntityId>) {
        self.grouped_links.insert(parent_id, children);
    }

    pub fn add_stock(&mut self, record: StockRecord) {
        self.stock.retain(|existing| existing.sku != record.sku);
        self.stock.push(record);
    }

    pub fn add_reservation(&mut self, sku: impl Into<String>, quantity: f64) {
        self.reservations.push(Reservation {
            sku: sku.into(),
            stock_id: DEFAULT_STOCK_ID,
            quantity,
        });
    }

    pub fn add_media(&mut self, product_id: EntityId, entry: MediaEntry) {
        self.media.entry(product_id).or_default().push(entry);
    }

    /// Wire this snapshot up as the collaborators of an indexing pass.
    pub fn into_services(
        self,
        config: Arc<dyn ConfigStore>,
        content: Arc<dyn ContentFilter>,
    ) -> CatalogServices {
        let snapshot = Arc::new(self);
        let composite_types: Vec<Arc<dyn CompositeType>> = ProductType::composite_types()
            .into_iter()
            .map(|kind| {
                Arc::new(SnapshotCompositeType {
                    kind,
                    snapshot: Arc::clone(&snapshot),
                }) as Arc<dyn CompositeType>
            })
            .collect();

        CatalogServices {
            catalog: snapshot.clone(),
            composite_types,
            stock: snapshot.clone(),
            pricing: Arc::new(SnapshotPricing {
                snapshot: Arc::clone(&snapshot),
            }),
            media: snapshot,
            content,
            config,
        }
    }

    fn reindex(&mut self) {
        self.by_id = self
            .products
            .iter()
            .enumerate()
            .map(|(position, product)| (product.entity_id, position))
            .collect();
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn product(&self, id: EntityId) -> Option<&ProductEntity> {
        self.by_id.get(&id).map(|&position| &self.products[position])
    }

    fn in_store(&self, id: EntityId, store_id: StoreId) -> bool {
        self.product_stores
            .get(&id)
            .map_or(true, |stores| stores.contains(&store_id))
    }

    fn stock_record(&self, sku: &str) -> Option<&StockRecord> {
        self.stock.iter().find(|record| record.sku == sku)
    }

    fn is_salable(&self, product: &ProductEntity) -> bool {
        match self.stock_record(&product.sku) {
            Some(record) => record.is_salable,
            None => product.salable,
        }
    }

    fn scoped(&self, ids: &[EntityId], store_id: StoreId) -> Vec<ProductEntity> {
        ids.iter()
            .filter(|id| self.in_store(**id, store_id))
            .filter_map(|id| self.product(*id))
            .map(|product| {
                let mut product = product.clone();
                product.store_id = store_id;
                product
            })
            .collect()
    }

    fn child_ids(&self, kind: &ProductType, parent_id: EntityId) -> Vec<EntityId> {
        match kind {
            ProductType::Configurable => self
                .configurable_links
                .get(&parent_id)
                .cloned()
                .unwrap_or_default(),
            ProductType::Bundle => {
                let mut seen = BTreeSet::new();
                self.bundle_options
                    .get(&parent_id)
                    .into_iter()
                    .flatten()
                    .flatten()
                    .copied()
                    .filter(|id| seen.insert(*id))
                    .collect()
            }
            ProductType::Grouped => self.grouped_links.get(&parent_id).cloned().unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn parents_of(&self, kind: &ProductType, child_ids: &[EntityId]) -> Vec<EntityId> {
        let references = |children: &[EntityId]| children.iter().any(|c| child_ids.contains(c));
        match kind {
            ProductType::Configurable => self
                .configurable_links
                .iter()
                .filter(|(_, children)| references(children))
                .map(|(parent, _)| *parent)
                .collect(),
            ProductType::Bundle => self
                .bundle_options
                .iter()
                .filter(|(_, options)| options.iter().any(|selections| references(selections)))
                .map(|(parent, _)| *parent)
                .collect(),
            ProductType::Grouped => self
                .grouped_links
                .iter()
                .filter(|(_, children)| references(children))
                .map(|(parent, _)| *parent)
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl CatalogStore for CatalogSnapshot {
    async fn fetch_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<ProductEntity>, CatalogError> {
        let mut products: Vec<ProductEntity> = self
            .products
            .iter()
            .filter(|product| self.in_store(product.entity_id, filter.store_id))
            .filter(|product| {
                filter
                    .entity_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&product.entity_id))
            })
            .filter(|product| {
                if !filter.only_enabled {
                    return true;
                }
                let visible = product.visibility.is_visible_in_site();
                product.status == ProductStatus::Enabled
                    && visible != filter.include_not_visible_individually
                    && (!filter.in_stock_only || self.is_salable(product))
            })
            .map(|product| {
                let mut product = product.clone();
                product.store_id = filter.store_id;
                product
            })
            .collect();
        products.sort_by_key(|product| product.entity_id);

        debug!(
            store_id = filter.store_id,
            count = products.len(),
            "Fetched products from snapshot"
        );
        Ok(products)
    }

    async fn describe_attributes(
        &self,
        entity_type: &str,
    ) -> Result<Vec<AttributeMetadata>, CatalogError> {
        if entity_type != PRODUCT_ENTITY_TYPE {
            return Ok(Vec::new());
        }
        Ok(self.attributes.clone())
    }

    async fn categories(&self, _store_id: StoreId) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories.clone())
    }

    async fn configurable_options(
        &self,
        product_id: EntityId,
        _store_id: StoreId,
    ) -> Result<Vec<ConfigurableOption>, CatalogError> {
        Ok(self
            .configurable_options
            .get(&product_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl StockStore for CatalogSnapshot {
    async fn default_stock_id(&self) -> Result<u32, CatalogError> {
        Ok(DEFAULT_STOCK_ID)
    }

    async fn stock_id_for_store(&self, store_id: StoreId) -> Result<u32, CatalogError> {
        Ok(self
            .store_stock_ids
            .get(&store_id)
            .copied()
            .unwrap_or(DEFAULT_STOCK_ID))
    }

    async fn stock_records(
        &self,
        skus: &[String],
        _stock_id: u32,
    ) -> Result<Vec<StockRecord>, CatalogError> {
        Ok(self
            .stock
            .iter()
            .filter(|record| skus.contains(&record.sku))
            .cloned()
            .collect())
    }

    async fn reservations(
        &self,
        skus: &[String],
        stock_id: u32,
    ) -> Result<HashMap<String, f64>, CatalogError> {
        let mut totals = HashMap::new();
        for reservation in &self.reservations {
            if reservation.stock_id == stock_id && skus.contains(&reservation.sku) {
                *totals.entry(reservation.sku.clone()).or_insert(0.0) += reservation.quantity;
            }
        }
        Ok(totals)
    }

    async fn are_salable(
        &self,
        skus: &[String],
        _stock_id: u32,
    ) -> Result<HashMap<String, bool>, CatalogError> {
        Ok(skus
            .iter()
            .map(|sku| {
                let salable = match self.stock_record(sku) {
                    Some(record) => record.is_salable,
                    None => self
                        .products
                        .iter()
                        .find(|product| &product.sku == sku)
                        .is_some_and(|product| product.salable),
                };
                (sku.clone(), salable)
            })
            .collect())
    }
}

#[async_trait]
impl MediaSource for CatalogSnapshot {
    async fn media_gallery(&self, product_id: EntityId) -> Result<Vec<MediaEntry>, CatalogError> {
        Ok(self.media.get(&product_id).cloned().unwrap_or_default())
    }
}

/// One composite type backed by the snapshot's link tables.
struct SnapshotCompositeType {
    kind: ProductType,
    snapshot: Arc<CatalogSnapshot>,
}

#[async_trait]
impl CompositeType for SnapshotCompositeType {
    fn type_id(&self) -> ProductType {
        self.kind.clone()
    }

    async fn children(&self, parent: &ProductEntity) -> Result<Vec<ProductEntity>, CatalogError> {
        let ids = self.snapshot.child_ids(&self.kind, parent.entity_id);
        Ok(self.snapshot.scoped(&ids, parent.store_id))
    }

    async fn parent_ids_by_child(
        &self,
        child_ids: &[EntityId],
    ) -> Result<Vec<EntityId>, CatalogError> {
        Ok(self.snapshot.parents_of(&self.kind, child_ids))
    }
}

struct SnapshotPricing {
    snapshot: Arc<CatalogSnapshot>,
}

impl PricingEngine for SnapshotPricing {
    fn provider_for(&self, type_id: &ProductType) -> Arc<dyn PriceProvider> {
        if type_id.is_composite() {
            Arc::new(CompositePriceProvider {
                snapshot: Arc::clone(&self.snapshot),
            })
        } else {
            Arc::new(SimplePriceProvider {
                today: self.snapshot.today(),
            })
        }
    }

    fn currency(&self, store_id: StoreId) -> String {
        self.snapshot
            .currencies
            .get(&store_id)
            .or_else(|| self.snapshot.currencies.get(&0))
            .cloned()
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
    }
}

/// Own price, with the special price applied inside its date window.
struct SimplePriceProvider {
    today: NaiveDate,
}

impl PriceProvider for SimplePriceProvider {
    fn minimal_regular_price(&self, product: &ProductEntity) -> f64 {
        product.price.regular_price
    }

    fn minimal_final_price(&self, product: &ProductEntity) -> f64 {
        product.price.final_price(self.today)
    }

    fn maximal_regular_price(&self, product: &ProductEntity) -> f64 {
        product.price.regular_price
    }

    fn maximal_final_price(&self, product: &ProductEntity) -> f64 {
        product.price.final_price(self.today)
    }

    fn special_price(&self, product: &ProductEntity) -> Option<f64> {
        product.price.active_special_price(self.today)
    }
}

/// Price range spanning the enabled children of a composite product.
struct CompositePriceProvider {
    snapshot: Arc<CatalogSnapshot>,
}

impl CompositePriceProvider {
    fn child_prices(&self, product: &ProductEntity, price: impl Fn(&ProductEntity) -> f64) -> Vec<f64> {
        let ids = self.snapshot.child_ids(&product.type_id, product.entity_id);
        let prices: Vec<f64> = ids
            .iter()
            .filter_map(|id| self.snapshot.product(*id))
            .filter(|child| child.status == ProductStatus::Enabled)
            .map(&price)
            .collect();
        if prices.is_empty() {
            vec![price(product)]
        } else {
            prices
        }
    }

    fn min(&self, product: &ProductEntity, price: impl Fn(&ProductEntity) -> f64) -> f64 {
        self.child_prices(product, price)
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }

    fn max(&self, product: &ProductEntity, price: impl Fn(&ProductEntity) -> f64) -> f64 {
        self.child_prices(product, price)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl PriceProvider for CompositePriceProvider {
    fn minimal_regular_price(&self, product: &ProductEntity) -> f64 {
        self.min(product, |p| p.price.regular_price)
    }

    fn minimal_final_price(&self, product: &ProductEntity) -> f64 {
        let today = self.snapshot.today();
        self.min(product, |p| p.price.final_price(today))
    }

    fn maximal_regular_price(&self, product: &ProductEntity) -> f64 {
        self.max(product, |p| p.price.regular_price)
    }

    fn maximal_final_price(&self, product: &ProductEntity) -> f64 {
        let today = self.snapshot.today();
        self.max(product, |p| p.price.final_price(today))
    }

    fn special_price(&self, _product: &ProductEntity) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_indexer_shared::{PriceSnapshot, Visibility};

    fn product(id: EntityId, type_id: ProductType, price: f64) -> ProductEntity {
        let mut product = ProductEntity::new(id, format!("SKU-{}", id), type_id);
        product.price = PriceSnapshot {
            regular_price: price,
            ..Default::default()
        };
        product
    }

    fn snapshot() -> CatalogSnapshot {
        let mut snapshot = CatalogSnapshot::new();
        snapshot.add_product(product(1, ProductType::Configurable, 0.0));
        let mut child = product(2, ProductType::Simple, 10.0);
        child.visibility = Visibility::NotVisibleIndividually;
        snapshot.add_product(child);
        let mut child = product(3, ProductType::Simple, 30.0);
        child.visibility = Visibility::NotVisibleIndividually;
        snapshot.add_product(child);
        snapshot.add_product(product(4, ProductType::Simple, 5.0));
        snapshot.link_configurable(1, vec![2, 3]);
        snapshot.add_bundle_option(9, vec![4, 2]);
        snapshot.add_bundle_option(9, vec![2]);
        snapshot
    }

    #[tokio::test]
    async fn test_fetch_products_filters_visibility() {
        let snapshot = snapshot();

        let visible = snapshot
            .fetch_products(&ProductFilter::for_store(1))
            .await
            .unwrap();
        assert_eq!(visible.iter().map(|p| p.entity_id).collect::<Vec<_>>(), vec![1, 4]);
        assert!(visible.iter().all(|p| p.store_id == 1));

        let mut filter = ProductFilter::for_store(1);
        filter.include_not_visible_individually = true;
        let hidden = snapshot.fetch_products(&filter).await.unwrap();
        assert_eq!(hidden.iter().map(|p| p.entity_id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_products_respects_store_assignment() {
        let mut snapshot = snapshot();
        snapshot.assign_stores(4, vec![2]);

        let products = snapshot
            .fetch_products(&ProductFilter::for_store(1))
            .await
            .unwrap();
        assert!(products.iter().all(|p| p.entity_id != 4));
    }

    #[test]
    fn test_bundle_children_are_deduplicated_across_options() {
        let snapshot = snapshot();
        assert_eq!(snapshot.child_ids(&ProductType::Bundle, 9), vec![4, 2]);
        assert_eq!(snapshot.parents_of(&ProductType::Bundle, &[2]), vec![9]);
        assert_eq!(snapshot.parents_of(&ProductType::Configurable, &[3]), vec![1]);
    }

    #[tokio::test]
    async fn test_reservations_are_summed_per_sku() {
        let mut snapshot = snapshot();
        snapshot.add_reservation("SKU-2", -1.0);
        snapshot.add_reservation("SKU-2", -2.0);
        snapshot.add_reservation("SKU-3", 4.0);

        let totals = snapshot
            .reservations(&["SKU-2".to_string()], DEFAULT_STOCK_ID)
            .await
            .unwrap();
        assert_eq!(totals.get("SKU-2"), Some(&-3.0));
        assert!(!totals.contains_key("SKU-3"));
    }

    #[test]
    fn test_composite_price_spans_children() {
        let services = snapshot().into_services(
            Arc::new(crate::config::StaticConfigStore::new()),
            Arc::new(crate::processor::DirectiveFilter::new("")),
        );
        let parent = product(1, ProductType::Configurable, 0.0);
        let provider = services.pricing.provider_for(&parent.type_id);
        assert_eq!(provider.minimal_regular_price(&parent), 10.0);
        assert_eq!(provider.maximal_regular_price(&parent), 30.0);
        assert_eq!(services.pricing.currency(1), "USD");
    }

    #[test]
    fn test_composite_price_without_enabled_children_uses_own_price() {
        let services = snapshot().into_services(
            Arc::new(crate::config::StaticConfigStore::new()),
            Arc::new(crate::processor::DirectiveFilter::new("")),
        );
        let lonely = product(50, ProductType::Configurable, 42.0);
        let provider = services.pricing.provider_for(&lonely.type_id);
        assert_eq!(provider.minimal_regular_price(&lonely), 42.0);
        assert_eq!(provider.maximal_regular_price(&lonely), 42.0);
    }

    #[test]
    fn test_from_json_builds_lookup() {
        let snapshot = CatalogSnapshot::from_json(
            r#"{
                "products": [
                    {"entity_id": 7, "sku": "TEE", "type_id": "simple", "status": 1, "visibility": 4}
                ],
                "stock": [{"sku": "TEE", "is_salable": true, "quantity": 3, "is_in_stock": true}]
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.product(7).map(|p| p.sku.as_str()), Some("TEE"));
        assert!(snapshot.stock_record("TEE").is_some());
    }
}
