//! Composite product relations and reindex eligibility.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use catalog_indexer_shared::{EntityId, ProductEntity, ProductStatus, StockStatus, StoreId};

use super::context::PassContext;
use super::stock_price::StockPriceAggregator;
use crate::catalog::{CatalogError, CatalogServices, CompositeType};
use crate::errors::EligibilityError;

#[derive(Clone)]
pub struct CompositeResolver {
    composite_types: Vec<Arc<dyn CompositeType>>,
    stock: StockPriceAggregator,
}

impl CompositeResolver {
    pub fn new(composite_types: Vec<Arc<dyn CompositeType>>, stock: StockPriceAggregator) -> Self {
        Self {
            composite_types,
            stock,
        }
    }

    pub fn from_services(services: &CatalogServices) -> Self {
        Self::new(
            services.composite_types.clone(),
            StockPriceAggregator::from_services(services),
        )
    }

    /// Eligible children of a composite product, stock attached, in relation order.
    ///
    /// Children failing eligibility are dropped without surfacing the failure.
    /// Non-composite products have no subproducts.
    pub async fn subproducts(
        &self,
        product: &ProductEntity,
        ctx: &PassContext,
    ) -> Result<Vec<ProductEntity>, CatalogError> {
        if !product.type_id.is_composite() {
            return Ok(Vec::new());
        }
        let Some(relation) = self
            .composite_types
            .iter()
            .find(|t| t.type_id() == product.type_id)
        else {
            return Ok(Vec::new());
        };

        let mut children = relation.children(product).await?;
        self.stock.attach_stock(&mut children, ctx.stock_id).await?;

        let store_id = ctx.store_id();
        let show_out_of_stock = ctx.settings.show_out_of_stock;
        children.retain(|child| {
            match Self::check_eligibility(child, store_id, true, show_out_of_stock) {
                Ok(()) => true,
                Err(reason) => {
                    debug!(
                        parent_id = product.entity_id,
                        child_id = child.entity_id,
                        reason = %reason,
                        "Dropping ineligible subproduct"
                    );
                    false
                }
            }
        });
        Ok(children)
    }

    /// Whether a product may appear in the index of a store.
    ///
    /// Rules run in order and the first failure is returned. Children skip the
    /// visibility rule.
    pub fn check_eligibility(
        product: &ProductEntity,
        store_id: StoreId,
        is_child: bool,
        show_out_of_stock: bool,
    ) -> Result<(), EligibilityError> {
        let product_id = product.entity_id;

        if product.deleted {
            return Err(EligibilityError::Deleted { product_id, store_id });
        }
        if product.status == ProductStatus::Disabled {
            return Err(EligibilityError::Disabled { product_id, store_id });
        }
        if !is_child && !product.visibility.is_visible_in_site() {
            return Err(EligibilityError::NotVisible { product_id, store_id });
        }
        if !show_out_of_stock {
            let in_stock = product
                .stock
                .as_ref()
                .is_some_and(|s| s.is_in_stock && s.stock_status == StockStatus::InStock);
            if !product.salable || !in_stock {
                return Err(EligibilityError::OutOfStock { product_id, store_id });
            }
        }
        Ok(())
    }

    /// Parents of every composite type that reference any of `child_ids`.
    pub async fn parent_ids(&self, child_ids: &[EntityId]) -> Result<Vec<EntityId>, CatalogError> {
        if child_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut parents = BTreeSet::new();
        for relation in &self.composite_types {
            parents.extend(relation.parent_ids_by_child(child_ids).await?);
        }
        Ok(parents.into_iter().collect())
    }
}
