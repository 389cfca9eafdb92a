//! Product document assembly.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::trace;

use catalog_indexer_shared::{
    ConfigurableOption, EntityId, ProductDocument, ProductEntity, StockStatus,
};

use super::attributes::AttributeMaterializer;
use super::category::CategoryResolver;
use super::content::strip_markup;
use super::context::PassContext;
use super::hooks::HookRegistry;
use super::options;
use super::stock_price::StockPriceAggregator;
use super::encode_uid;
use crate::catalog::ContentFilter;
use crate::errors::PipelineError;

const CATEGORIES_LABEL: &str = "Category";

/// Everything gathered for one product before its document is built.
#[derive(Debug)]
pub struct AssemblyInput<'a> {
    pub product: &'a ProductEntity,
    /// Eligible children, stock attached.
    pub subproducts: &'a [ProductEntity],
    pub parent_ids: &'a [EntityId],
    /// Super attributes, configurable products only.
    pub options: Vec<ConfigurableOption>,
    pub media_gallery: Value,
    pub stock_status: StockStatus,
}

/// Builds the flat document of one product.
#[derive(Clone)]
pub struct DocumentAssembler {
    stock_price: StockPriceAggregator,
    content: Arc<dyn ContentFilter>,
    hooks: HookRegistry,
}

impl DocumentAssembler {
    pub fn new(
        stock_price: StockPriceAggregator,
        content: Arc<dyn ContentFilter>,
        hooks: HookRegistry,
    ) -> Self {
        Self {
            stock_price,
            content,
            hooks,
        }
    }

    pub fn assemble(
        &self,
        ctx: &PassContext,
        input: AssemblyInput<'_>,
    ) -> Result<ProductDocument, PipelineError> {
        let product = input.product;
        let mut document = self.initial_document(ctx, &input)?;

        AttributeMaterializer::new(&ctx.attributes, ctx.store_id()).materialize(
            &mut document,
            &ctx.configured,
            product,
            input.subproducts,
        );

        self.add_content(&mut document, product, ctx);

        let document = self.hooks.apply_document(document, product);
        trace!(product_id = product.entity_id, fields = document.len(), "Assembled document");
        Ok(document)
    }

    fn initial_document(
        &self,
        ctx: &PassContext,
        input: &AssemblyInput<'_>,
    ) -> Result<ProductDocument, PipelineError> {
        let product = input.product;
        let id = product.entity_id;
        let categories = CategoryResolver::resolve(&product.category_ids, &ctx.categories);
        let provider = self.stock_price.price_provider(product);

        let mut doc = ProductDocument::new();
        doc.insert("id", id.to_string());
        doc.insert("uid", encode_uid(id));
        doc.insert("sku", product.sku.as_str());
        doc.insert("entity_id", id);
        doc.insert("store_id", ctx.store_id());
        doc.insert("status", product.status.code());
        doc.insert("visibility", product.visibility.code());
        doc.insert("visibility_label", product.visibility.label());
        doc.insert("name", product.name.clone().unwrap_or_default());
        doc.insert("url", product_url(product, ctx));
        doc.insert("url_key", product.url_key.clone().unwrap_or_default());
        doc.insert("type_id", product.type_id.as_str());
        doc.insert("subproducts", id_strings(input.subproducts.iter().map(|p| p.entity_id)));
        doc.insert("parent_ids", id_strings(input.parent_ids.iter().copied()));
        doc.insert("meta_title", product.meta_title.clone());
        doc.insert("meta_description", product.meta_description.clone());
        doc.insert("meta_keywords", product.meta_keywords.clone());

        doc.insert("categories", to_value(id, &categories.categories)?);
        doc.insert("categories_label", CATEGORIES_LABEL);
        doc.insert("category_ids", id_strings(categories.category_ids.iter().copied()));
        doc.insert("category_uid", categories.category_uids());

        doc.insert(
            "price_range",
            to_value(id, &self.stock_price.price_range(product, &ctx.currency))?,
        );
        doc.insert("media_gallery", input.media_gallery.clone());
        doc.insert("stock_status", input.stock_status.as_str());
        doc.insert("stock", to_value(id, &product.stock)?);

        doc.insert("related_products_ids", id_strings(product.related_product_ids.iter().copied()));
        doc.insert("upsell_products_ids", id_strings(product.upsell_product_ids.iter().copied()));
        doc.insert(
            "crossell_products_ids",
            id_strings(product.crosssell_product_ids.iter().copied()),
        );

        doc.insert("configurable_options", to_value(id, &input.options)?);
        doc.insert(
            "variants",
            to_value(id, &options::variants(&input.options, input.subproducts))?,
        );

        doc.insert("price", product.price.regular_price);
        doc.insert("final_price", provider.minimal_final_price(product));
        doc.insert("special_price", provider.special_price(product));

        Ok(doc)
    }

    /// Rendered descriptions and their plain-text variants, when not empty.
    fn add_content(&self, document: &mut ProductDocument, product: &ProductEntity, ctx: &PassContext) {
        let sources = [
            ("description", &product.description),
            ("short_description", &product.short_description),
        ];
        for (field, content) in sources {
            let Some(content) = content.as_deref().filter(|c| !c.trim().is_empty()) else {
                continue;
            };
            let rendered = self.content.filter(content, ctx.store_id());
            document.insert(format!("{}_stripped", field), strip_markup(&rendered));
            document.insert(field, rendered);
        }
    }
}

fn product_url(product: &ProductEntity, ctx: &PassContext) -> String {
    if let Some(url) = product.url.as_deref().filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    match product.url_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => format!(
            "{}{}{}",
            ctx.settings.base_url, key, ctx.settings.product_url_suffix
        ),
        None => String::new(),
    }
}

fn id_strings(ids: impl Iterator<Item = EntityId>) -> Value {
    Value::Array(ids.map(|id| json!(id.to_string())).collect())
}

fn to_value<T: Serialize>(product_id: EntityId, value: &T) -> Result<Value, PipelineError> {
    serde_json::to_value(value).map_err(|e| PipelineError::assembly(product_id, e.to_string()))
}
