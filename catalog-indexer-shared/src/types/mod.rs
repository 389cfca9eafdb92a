//! This module defines the core data structures and types used across the catalog indexer.

pub mod attribute;
pub mod category;
pub mod configurable;
pub mod field_spec;
pub mod media;
pub mod price;
pub mod product;
pub mod product_document;
pub mod stock;
