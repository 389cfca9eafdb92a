//! Values computed once per indexing pass.

use tracing::debug;

use catalog_indexer_shared::{FieldSpec, StoreId};

use super::attributes::AttributeCatalog;
use super::category::CategoryLookup;
use super::schema::SchemaResolver;
use crate::catalog::{CatalogError, CatalogServices, PRODUCT_ENTITY_TYPE};
use crate::config::StoreSettings;

/// Store-scoped lookups shared by every document of one pass.
#[derive(Debug, Clone)]
pub struct PassContext {
    pub settings: StoreSettings,
    /// Baseline merged with the configured fields.
    pub fields: Vec<FieldSpec>,
    /// Configured fields only.
    pub configured: Vec<FieldSpec>,
    pub categories: CategoryLookup,
    pub attributes: AttributeCatalog,
    /// Stock channel quantities and reservations are read from.
    pub stock_id: u32,
    /// Stock channel of the store's website, used for salability.
    pub website_stock_id: u32,
    pub currency: String,
}

impl PassContext {
    pub async fn load(services: &CatalogServices, store_id: StoreId) -> Result<Self, CatalogError> {
        let settings = StoreSettings::load(services.config.as_ref(), store_id);
        let configured = settings
            .schema
            .as_deref()
            .map(SchemaResolver::parse_configured)
            .unwrap_or_default();
        let fields = SchemaResolver::merge(SchemaResolver::baseline(), &configured);

        let categories =
            CategoryLookup::new(services.catalog.categories(store_id).await?, &settings);
        let attributes = AttributeCatalog::new(
            services.catalog.describe_attributes(PRODUCT_ENTITY_TYPE).await?,
            store_id,
        );
        let stock_id = services.stock.default_stock_id().await?;
        let website_stock_id = services.stock.stock_id_for_store(store_id).await?;
        let currency = services.pricing.currency(store_id);

        debug!(
            store_id,
            fields = fields.len(),
            configured = configured.len(),
            categories = categories.len(),
            attributes = attributes.len(),
            "Prepared indexing pass"
        );

        Ok(Self {
            settings,
            fields,
            configured,
            categories,
            attributes,
            stock_id,
            website_stock_id,
            currency,
        })
    }

    pub fn store_id(&self) -> StoreId {
        self.settings.store_id
    }
}
