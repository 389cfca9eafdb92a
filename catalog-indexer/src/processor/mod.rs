//! Processor module for the catalog indexer.
//!
//! Turns catalog products into flat, schema-driven search documents.

mod assembler;
mod attributes;
mod category;
mod composite;
mod content;
mod context;
mod hooks;
mod media;
pub mod options;
mod schema;
mod stock_price;

use std::fmt::Display;

use base64::{engine::general_purpose, Engine as _};

pub use assembler::{AssemblyInput, DocumentAssembler};
pub use attributes::{has_value, AttributeCatalog, AttributeMaterializer, AttributeSource};
pub use category::{CategoryLookup, CategoryResolver, ResolvedCategories};
pub use composite::CompositeResolver;
pub use content::{strip_markup, DirectiveFilter};
pub use context::PassContext;
pub use hooks::{CollectionHook, DocumentHook, HookRegistry};
pub use media::{media_url, MediaResolver};
pub use schema::SchemaResolver;
pub use stock_price::StockPriceAggregator;

/// Opaque, reversible identifier used for `uid` style fields.
pub fn encode_uid(value: impl Display) -> String {
    general_purpose::STANDARD.encode(value.to_string())
}
