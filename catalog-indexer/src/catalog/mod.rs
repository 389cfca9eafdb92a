//! Catalog collaborator contracts.
//!
//! The pipeline never talks to catalog storage directly. Everything it reads goes
//! through the traits below, which are injected as `Arc<dyn ..>` so that the binary
//! can run against a JSON export and tests against hand-built fixtures.

mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use catalog_indexer_shared::{
    AttributeMetadata, Category, ConfigurableOption, EntityId, MediaEntry, ProductEntity,
    ProductType, StockRecord, StoreId,
};

use crate::config::ConfigStore;

pub use memory::CatalogSnapshot;

/// Entity type code used when describing product attributes.
pub const PRODUCT_ENTITY_TYPE: &str = "catalog_product";

/// Errors returned by catalog collaborators.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    /// The backing store could not be reached or read.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// A referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored data could not be decoded.
    #[error("Invalid catalog data: {0}")]
    InvalidData(String),
}

impl CatalogError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }
}

/// Selection applied when fetching the product collection of a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub store_id: StoreId,
    /// Restrict to these ids. `None` selects every product of the store.
    pub entity_ids: Option<Vec<EntityId>>,
    /// Only enabled products, filtered on visibility.
    pub only_enabled: bool,
    /// With `only_enabled`, select products that are *not* visible individually
    /// instead of the visible ones.
    pub include_not_visible_individually: bool,
    /// Drop products whose stock is not salable.
    pub in_stock_only: bool,
}

impl ProductFilter {
    pub fn for_store(store_id: StoreId) -> Self {
        Self {
            store_id,
            entity_ids: None,
            only_enabled: true,
            include_not_visible_individually: false,
            in_stock_only: false,
        }
    }
}

/// Product entity storage.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Products of a store matching `filter`, ordered by entity id.
    ///
    /// Returned entities carry store-scoped values and have `store_id` set. Stock is
    /// not attached; the stock aggregator does that.
    async fn fetch_products(&self, filter: &ProductFilter)
        -> Result<Vec<ProductEntity>, CatalogError>;

    /// Attribute metadata for an entity type.
    async fn describe_attributes(
        &self,
        entity_type: &str,
    ) -> Result<Vec<AttributeMetadata>, CatalogError>;

    /// All categories visible in a store scope.
    async fn categories(&self, store_id: StoreId) -> Result<Vec<Category>, CatalogError>;

    /// Super attributes of a configurable product.
    async fn configurable_options(
        &self,
        product_id: EntityId,
        store_id: StoreId,
    ) -> Result<Vec<ConfigurableOption>, CatalogError>;
}

/// Parent/child relation of one composite product type.
#[async_trait]
pub trait CompositeType: Send + Sync {
    fn type_id(&self) -> ProductType;

    /// Children of `parent` in relation order, in the parent's store scope.
    async fn children(&self, parent: &ProductEntity) -> Result<Vec<ProductEntity>, CatalogError>;

    /// Ids of parents of this type that reference any of `child_ids`.
    async fn parent_ids_by_child(
        &self,
        child_ids: &[EntityId],
    ) -> Result<Vec<EntityId>, CatalogError>;
}

/// Inventory levels, reservations and salability.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// The default stock channel that quantities and reservations are read from.
    async fn default_stock_id(&self) -> Result<u32, CatalogError>;

    /// The stock channel assigned to the website of a store.
    async fn stock_id_for_store(&self, store_id: StoreId) -> Result<u32, CatalogError>;

    async fn stock_records(
        &self,
        skus: &[String],
        stock_id: u32,
    ) -> Result<Vec<StockRecord>, CatalogError>;

    /// Reservation quantity per SKU, summed. SKUs without reservations may be absent.
    async fn reservations(
        &self,
        skus: &[String],
        stock_id: u32,
    ) -> Result<HashMap<String, f64>, CatalogError>;

    /// Authoritative salability per SKU on a stock channel.
    async fn are_salable(
        &self,
        skus: &[String],
        stock_id: u32,
    ) -> Result<HashMap<String, bool>, CatalogError>;
}

/// Price calculation for one product type.
pub trait PriceProvider: Send + Sync {
    fn minimal_regular_price(&self, product: &ProductEntity) -> f64;
    fn minimal_final_price(&self, product: &ProductEntity) -> f64;
    fn maximal_regular_price(&self, product: &ProductEntity) -> f64;
    fn maximal_final_price(&self, product: &ProductEntity) -> f64;
    /// Active special price, if any.
    fn special_price(&self, product: &ProductEntity) -> Option<f64>;
}

/// Pricing engine keyed by product type.
pub trait PricingEngine: Send + Sync {
    fn provider_for(&self, type_id: &ProductType) -> Arc<dyn PriceProvider>;

    /// Currency code prices are expressed in for a store.
    fn currency(&self, store_id: StoreId) -> String;
}

/// Product media gallery storage.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn media_gallery(&self, product_id: EntityId) -> Result<Vec<MediaEntry>, CatalogError>;
}

/// Content templating applied to descriptions.
pub trait ContentFilter: Send + Sync {
    fn filter(&self, content: &str, store_id: StoreId) -> String;
}

/// Every collaborator an indexing pass needs.
#[derive(Clone)]
pub struct CatalogServices {
    pub catalog: Arc<dyn CatalogStore>,
    pub composite_types: Vec<Arc<dyn CompositeType>>,
    pub stock: Arc<dyn StockStore>,
    pub pricing: Arc<dyn PricingEngine>,
    pub media: Arc<dyn MediaSource>,
    pub content: Arc<dyn ContentFilter>,
    pub config: Arc<dyn ConfigStore>,
}
