//! # Catalog Indexer Shared
//!
//! This crate defines shared data structures and types used across the catalog indexer crates.
//! It includes the catalog-side product model consumed by the pipeline, the field schema
//! descriptors, and the flattened document handed to the search index.

pub mod types;

pub use types::attribute::{AttributeMetadata, AttributeOption, FrontendInput};
pub use types::category::Category;
pub use types::configurable::{
    ConfigurableOption, ConfigurableOptionValue, SwatchData, Variant, VariantAttribute,
};
pub use types::field_spec::{FieldKind, FieldSpec, FieldType};
pub use types::media::MediaEntry;
pub use types::price::{Discount, Money, PriceBand, PriceRange};
pub use types::product::{
    CategoryId, EntityId, PriceSnapshot, ProductEntity, ProductStatus, ProductType, StoreId,
    Visibility,
};
pub use types::product_document::ProductDocument;
pub use types::stock::{StockRecord, StockSnapshot, StockStatus};
