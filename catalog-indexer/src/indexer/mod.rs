//! Indexing driver.
//!
//! One run builds the documents of one store for one collection kind and works out
//! which ids have to leave the index.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, instrument, warn};

use catalog_indexer_repository::{CollectionSchema, IndexConfig};
use catalog_indexer_shared::{
    EntityId, ProductDocument, ProductEntity, ProductType, StockStatus, StoreId,
};

use crate::catalog::{CatalogServices, ProductFilter};
use crate::errors::PipelineError;
use crate::processor::{
    options, AssemblyInput, CompositeResolver, DocumentAssembler, HookRegistry, MediaResolver,
    PassContext, StockPriceAggregator,
};

/// The collections kept per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexerKind {
    /// Products visible in the catalog or search.
    Products,
    /// Products not visible individually, indexed when the store enables it.
    ProductsChildren,
}

impl IndexerKind {
    pub fn all() -> [IndexerKind; 2] {
        [IndexerKind::Products, IndexerKind::ProductsChildren]
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexerKind::Products => "products",
            IndexerKind::ProductsChildren => "products_children",
        }
    }

    /// Suffix appended to the store code in the collection name.
    pub fn suffix(self) -> &'static str {
        match self {
            IndexerKind::Products => "_products",
            IndexerKind::ProductsChildren => "_products_children",
        }
    }

    fn is_children(self) -> bool {
        self == IndexerKind::ProductsChildren
    }
}

impl fmt::Display for IndexerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one indexing run.
#[derive(Debug, Clone)]
pub struct IndexBatch {
    pub store_id: StoreId,
    pub kind: IndexerKind,
    /// Target collection. `None` when the run produced nothing to apply.
    pub collection: Option<CollectionSchema>,
    pub to_index: Vec<ProductDocument>,
    /// Ids to delete from the collection.
    pub to_remove: Vec<EntityId>,
}

impl IndexBatch {
    pub fn empty(store_id: StoreId, kind: IndexerKind) -> Self {
        Self {
            store_id,
            kind,
            collection: None,
            to_index: Vec::new(),
            to_remove: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_index.is_empty() && self.to_remove.is_empty()
    }
}

/// Builds index batches for one collection kind.
#[derive(Clone)]
pub struct IndexingDriver {
    kind: IndexerKind,
    services: CatalogServices,
    index_config: IndexConfig,
    composite: CompositeResolver,
    stock_price: StockPriceAggregator,
    media: MediaResolver,
    assembler: DocumentAssembler,
    hooks: HookRegistry,
}

impl IndexingDriver {
    pub fn new(kind: IndexerKind, services: CatalogServices, index_config: IndexConfig) -> Self {
        Self::with_hooks(kind, services, index_config, HookRegistry::new())
    }

    pub fn with_hooks(
        kind: IndexerKind,
        services: CatalogServices,
        index_config: IndexConfig,
        hooks: HookRegistry,
    ) -> Self {
        let stock_price = StockPriceAggregator::from_services(&services);
        Self {
            kind,
            composite: CompositeResolver::from_services(&services),
            media: MediaResolver::from_services(&services),
            assembler: DocumentAssembler::new(
                stock_price.clone(),
                services.content.clone(),
                hooks.clone(),
            ),
            stock_price,
            services,
            index_config,
            hooks,
        }
    }

    pub fn kind(&self) -> IndexerKind {
        self.kind
    }

    /// Build the batch of a store.
    ///
    /// With `product_ids` only those products, and the composite parents embedding
    /// them, are rebuilt; requested ids that are no longer eligible land in
    /// `to_remove`. Without ids every product of the store is rebuilt.
    #[instrument(
        skip(self, product_ids),
        fields(kind = %self.kind, requested = product_ids.map(|ids| ids.len()))
    )]
    pub async fn run(
        &self,
        store_id: StoreId,
        product_ids: Option<&[EntityId]>,
    ) -> Result<IndexBatch, PipelineError> {
        let ctx = PassContext::load(&self.services, store_id).await?;

        if !ctx.settings.enabled {
            debug!(store_id, "Product indexing disabled for store");
            return Ok(IndexBatch::empty(store_id, self.kind));
        }
        if self.kind.is_children() && !ctx.settings.index_all {
            debug!(store_id, "Children indexing not enabled for store");
            return Ok(IndexBatch::empty(store_id, self.kind));
        }

        let requested = match product_ids {
            Some(ids) => Some(self.expand_with_parents(ids).await?),
            None => None,
        };

        let mut products = self.fetch(&ctx, requested.clone()).await?;
        self.stock_price
            .attach_stock(&mut products, ctx.stock_id)
            .await?;
        let skus: Vec<String> = products.iter().map(|p| p.sku.clone()).collect();
        let salable = self
            .stock_price
            .salability(&skus, ctx.website_stock_id)
            .await?;

        let mut to_index = Vec::with_capacity(products.len());
        let mut produced = HashSet::new();
        let mut failed = HashSet::new();

        for product in &products {
            if let Err(reason) = CompositeResolver::check_eligibility(
                product,
                store_id,
                self.kind.is_children(),
                ctx.settings.show_out_of_stock,
            ) {
                debug!(product_id = product.entity_id, reason = %reason, "Product not eligible");
                continue;
            }

            match self.document(&ctx, product, &salable).await {
                Ok(document) => {
                    produced.insert(product.entity_id);
                    to_index.push(document);
                }
                Err(e) => {
                    warn!(
                        product_id = product.entity_id,
                        store_id,
                        error = %e,
                        "Failed to assemble product document, skipping"
                    );
                    failed.insert(product.entity_id);
                }
            }
        }

        let to_remove: Vec<EntityId> = requested
            .unwrap_or_default()
            .into_iter()
            .filter(|id| !produced.contains(id) && !failed.contains(id))
            .collect();

        let collection = CollectionSchema::new(
            self.index_config
                .collection_name(&ctx.settings.store_code, self.kind.suffix()),
            ctx.fields.clone(),
        );

        info!(
            store_id,
            collection = %collection.name,
            fetched = products.len(),
            to_index = to_index.len(),
            to_remove = to_remove.len(),
            failed = failed.len(),
            "Indexing run complete"
        );

        Ok(IndexBatch {
            store_id,
            kind: self.kind,
            collection: Some(collection),
            to_index,
            to_remove,
        })
    }

    /// Requested ids plus every composite parent referencing one of them.
    pub async fn expand_with_parents(
        &self,
        ids: &[EntityId],
    ) -> Result<Vec<EntityId>, PipelineError> {
        let mut expanded: BTreeSet<EntityId> = ids.iter().copied().collect();
        let parents = self.composite.parent_ids(ids).await?;
        if !parents.is_empty() {
            debug!(parents = ?parents, "Adding composite parents of requested products");
        }
        expanded.extend(parents);
        Ok(expanded.into_iter().collect())
    }

    async fn fetch(
        &self,
        ctx: &PassContext,
        entity_ids: Option<Vec<EntityId>>,
    ) -> Result<Vec<ProductEntity>, PipelineError> {
        let mut filter = ProductFilter::for_store(ctx.store_id());
        filter.entity_ids = entity_ids;
        filter.include_not_visible_individually = self.kind.is_children();
        filter.in_stock_only = !ctx.settings.show_out_of_stock;
        self.hooks.apply_collection(&mut filter, ctx.store_id());

        Ok(self.services.catalog.fetch_products(&filter).await?)
    }

    async fn document(
        &self,
        ctx: &PassContext,
        product: &ProductEntity,
        salable: &HashMap<String, bool>,
    ) -> Result<ProductDocument, PipelineError> {
        let subproducts = self.composite.subproducts(product, ctx).await?;
        let parent_ids = self.composite.parent_ids(&[product.entity_id]).await?;

        let product_options = if product.type_id == ProductType::Configurable {
            options::with_uids(
                self.services
                    .catalog
                    .configurable_options(product.entity_id, ctx.store_id())
                    .await?,
            )
        } else {
            Vec::new()
        };

        let media_gallery = self
            .media
            .gallery(product, &subproducts, &ctx.settings.base_url)
            .await;
        let stock_status =
            StockStatus::from_salable(salable.get(&product.sku).copied().unwrap_or(false));

        self.assembler.assemble(
            ctx,
            AssemblyInput {
                product,
                subproducts: &subproducts,
                parent_ids: &parent_ids,
                options: product_options,
                media_gallery,
                stock_status,
            },
        )
    }
}
